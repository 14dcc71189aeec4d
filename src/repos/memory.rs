//! In-memory `DrinkRepo` for handler tests.
use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;

use crate::repos::{DrinkRepo, DrinkRow, Ingredient, RepoError};

#[derive(Debug, Default)]
pub struct MemoryDrinkRepo {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    rows: BTreeMap<i64, DrinkRow>,
}

impl MemoryDrinkRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn get(&self, id: i64) -> Option<DrinkRow> {
        self.lock().rows.get(&id).cloned()
    }
}

#[async_trait]
impl DrinkRepo for MemoryDrinkRepo {
    async fn list(&self) -> Result<Vec<DrinkRow>, RepoError> {
        Ok(self.lock().rows.values().cloned().collect())
    }

    async fn create(&self, title: &str, recipe: &[Ingredient]) -> Result<DrinkRow, RepoError> {
        let mut inner = self.lock();
        if inner.rows.values().any(|r| r.title == title) {
            return Err(RepoError::Conflict);
        }

        inner.next_id += 1;
        let now = Utc::now();
        let row = DrinkRow {
            id: inner.next_id,
            title: title.to_string(),
            recipe: Json(recipe.to_vec()),
            created_at: now,
            updated_at: now,
        };
        inner.rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        id: i64,
        title: Option<&str>,
        recipe: Option<&[Ingredient]>,
    ) -> Result<Option<DrinkRow>, RepoError> {
        let mut inner = self.lock();
        if let Some(title) = title
            && inner.rows.values().any(|r| r.id != id && r.title == title)
        {
            return Err(RepoError::Conflict);
        }

        let Some(row) = inner.rows.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = title {
            row.title = title.to_string();
        }
        if let Some(recipe) = recipe {
            row.recipe = Json(recipe.to_vec());
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool, RepoError> {
        Ok(self.lock().rows.remove(&id).is_some())
    }
}
