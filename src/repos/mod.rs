pub mod drink_repo;
mod error;
#[cfg(test)]
pub mod memory;

pub use drink_repo::{DrinkRepo, DrinkRow, Ingredient, PgDrinkRepo};
pub use error::RepoError;
