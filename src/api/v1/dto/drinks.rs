/*
 * Responsibility
 * - Drinks の request/response DTO
 * - 2 種類の表現:
 *   - short: 公開用 (recipe は color / parts のみ)
 *   - long:  スタッフ用 (recipe の name も含む)
 */
use serde::{Deserialize, Serialize};

use crate::repos::{DrinkRow, Ingredient};

const TITLE_MAX_CHARS: usize = 80;

fn validate_recipe(recipe: &[Ingredient]) -> Result<(), &'static str> {
    if recipe.is_empty() {
        return Err("recipe must have at least one ingredient");
    }
    for ingredient in recipe {
        if ingredient.name.trim().is_empty() {
            return Err("ingredient name is required");
        }
        if ingredient.color.trim().is_empty() {
            return Err("ingredient color is required");
        }
        if ingredient.parts == 0 {
            return Err("ingredient parts must be >= 1");
        }
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<(), &'static str> {
    let title = title.trim();
    if title.is_empty() {
        return Err("title is required");
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err("title must be <= 80 chars");
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct CreateDrinkRequest {
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

impl CreateDrinkRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        validate_title(&self.title)?;
        validate_recipe(&self.recipe)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateDrinkRequest {
    pub title: Option<String>,
    pub recipe: Option<Vec<Ingredient>>,
}

impl UpdateDrinkRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.title.is_none() && self.recipe.is_none() {
            return Err("nothing to update");
        }
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(recipe) = &self.recipe {
            validate_recipe(recipe)?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ShortIngredient {
    pub color: String,
    pub parts: u32,
}

#[derive(Debug, Serialize)]
pub struct DrinkShort {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<ShortIngredient>,
}

impl From<DrinkRow> for DrinkShort {
    fn from(row: DrinkRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            recipe: row
                .recipe
                .0
                .into_iter()
                .map(|i| ShortIngredient {
                    color: i.color,
                    parts: i.parts,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DrinkLong {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

impl From<DrinkRow> for DrinkLong {
    fn from(row: DrinkRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            recipe: row.recipe.0,
        }
    }
}

/// `{"success": true, "drinks": [...]}`, also used for single-drink results.
#[derive(Debug, Serialize)]
pub struct DrinksResponse<T> {
    pub success: bool,
    pub drinks: Vec<T>,
}

impl<T> DrinksResponse<T> {
    pub fn new(drinks: Vec<T>) -> Self {
        Self {
            success: true,
            drinks,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteDrinkResponse {
    pub success: bool,
    pub delete: i64,
}
