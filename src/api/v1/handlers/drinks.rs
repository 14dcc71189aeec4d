/*
 * Responsibility
 * - /drinks 系 handler (list / detail / create / update / delete)
 * - 認可は route 側 (middleware::auth::permission) で済んでいる前提
 *   protected な handler は Extension<Claims> を受け取れる
 * - repo の結果を short / long 表現に変換して返す
 */
use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};

use crate::{
    api::v1::dto::drinks::{
        CreateDrinkRequest, DeleteDrinkResponse, DrinkLong, DrinkShort, DrinksResponse,
        UpdateDrinkRequest,
    },
    error::AppError,
    services::auth::Claims,
    state::AppState,
};

/// GET /drinks (public)
pub async fn list_drinks(
    State(state): State<AppState>,
) -> Result<Json<DrinksResponse<DrinkShort>>, AppError> {
    let rows = state.drinks.list().await?;
    let drinks = rows.into_iter().map(DrinkShort::from).collect();

    Ok(Json(DrinksResponse::new(drinks)))
}

/// GET /drinks-detail (`get:drinks-detail`)
pub async fn list_drink_details(
    State(state): State<AppState>,
) -> Result<Json<DrinksResponse<DrinkLong>>, AppError> {
    let rows = state.drinks.list().await?;
    let drinks = rows.into_iter().map(DrinkLong::from).collect();

    Ok(Json(DrinksResponse::new(drinks)))
}

/// POST /drinks (`post:drinks`)
pub async fn create_drink(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<CreateDrinkRequest>, JsonRejection>,
) -> Result<Json<DrinksResponse<DrinkLong>>, AppError> {
    let Json(req) = payload?;
    req.validate().map_err(|reason| {
        tracing::debug!(reason, "invalid create drink request");
        AppError::Unprocessable
    })?;

    let row = state.drinks.create(req.title.trim(), &req.recipe).await?;
    tracing::info!(
        drink_id = row.id,
        sub = %claims.sub,
        created_at = %row.created_at,
        "drink created"
    );

    Ok(Json(DrinksResponse::new(vec![DrinkLong::from(row)])))
}

/// PATCH /drinks/{drink_id} (`patch:drinks`)
pub async fn update_drink(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    drink_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateDrinkRequest>, JsonRejection>,
) -> Result<Json<DrinksResponse<DrinkLong>>, AppError> {
    let Path(drink_id) = drink_id?;
    let Json(req) = payload?;
    req.validate().map_err(|reason| {
        tracing::debug!(reason, "invalid update drink request");
        AppError::Unprocessable
    })?;

    let row = state
        .drinks
        .update(
            drink_id,
            req.title.as_deref().map(str::trim),
            req.recipe.as_deref(),
        )
        .await?
        .ok_or(AppError::NotFound)?;
    tracing::info!(
        drink_id,
        sub = %claims.sub,
        updated_at = %row.updated_at,
        "drink updated"
    );

    Ok(Json(DrinksResponse::new(vec![DrinkLong::from(row)])))
}

/// DELETE /drinks/{drink_id} (`delete:drinks`)
pub async fn delete_drink(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    drink_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<DeleteDrinkResponse>, AppError> {
    let Path(drink_id) = drink_id?;

    if !state.drinks.delete(drink_id).await? {
        return Err(AppError::NotFound);
    }
    tracing::info!(drink_id, sub = %claims.sub, "drink deleted");

    Ok(Json(DeleteDrinkResponse {
        success: true,
        delete: drink_id,
    }))
}
