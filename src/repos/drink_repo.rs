/*
 * Responsibility
 * - drinks テーブル向け SQLx 操作 (CRUD)
 * - handler からは DrinkRepo trait 越しに使う (テストでは in-memory 実装に差し替え)
 * - unique 制約違反 (title) は RepoError::Conflict に変換
 */
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, types::Json};

use crate::repos::RepoError;

/// One line of a recipe, stored as an element of the `recipe` JSONB array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub color: String,
    pub parts: u32,
}

#[derive(Debug, Clone, FromRow)]
pub struct DrinkRow {
    pub id: i64,
    pub title: String,
    pub recipe: Json<Vec<Ingredient>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait DrinkRepo: Send + Sync + 'static {
    async fn list(&self) -> Result<Vec<DrinkRow>, RepoError>;

    async fn create(&self, title: &str, recipe: &[Ingredient]) -> Result<DrinkRow, RepoError>;

    // None fields are left untouched.
    async fn update(
        &self,
        id: i64,
        title: Option<&str>,
        recipe: Option<&[Ingredient]>,
    ) -> Result<Option<DrinkRow>, RepoError>;

    async fn delete(&self, id: i64) -> Result<bool, RepoError>;
}

#[derive(Clone, Debug)]
pub struct PgDrinkRepo {
    pool: PgPool,
}

impl PgDrinkRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DrinkRepo for PgDrinkRepo {
    async fn list(&self) -> Result<Vec<DrinkRow>, RepoError> {
        let rows = sqlx::query_as::<_, DrinkRow>(
            r#"
            SELECT id, title, recipe, created_at, updated_at
            FROM drinks
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn create(&self, title: &str, recipe: &[Ingredient]) -> Result<DrinkRow, RepoError> {
        let row = sqlx::query_as::<_, DrinkRow>(
            r#"
            INSERT INTO drinks (title, recipe)
            VALUES ($1, $2)
            RETURNING id, title, recipe, created_at, updated_at
            "#,
        )
        .bind(title)
        .bind(Json(recipe))
        .fetch_one(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)?;

        Ok(row)
    }

    async fn update(
        &self,
        id: i64,
        title: Option<&str>,
        recipe: Option<&[Ingredient]>,
    ) -> Result<Option<DrinkRow>, RepoError> {
        let row = sqlx::query_as::<_, DrinkRow>(
            r#"
            UPDATE drinks
            SET
                title = COALESCE($2, title),
                recipe = COALESCE($3, recipe),
                updated_at = now()
            WHERE id = $1
            RETURNING id, title, recipe, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(recipe.map(Json))
        .fetch_optional(&self.pool)
        .await
        .map_err(RepoError::from_sqlx)?;

        Ok(row)
    }

    async fn delete(&self, id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query(
            r#"
            DELETE FROM drinks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
