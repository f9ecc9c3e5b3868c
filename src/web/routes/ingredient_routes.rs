use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, put},
};
use sea_orm::SqlErr;
use serde::Deserialize;
use std::sync::Arc;

use crate::db::models::IngredientDto;
use crate::db::services::ingredient_service;
use crate::web::models::AuthenticatedUser;
use crate::web::{AppState, error::AppError, error::FieldErrors};

#[derive(Deserialize)]
pub struct UpdateIngredientRequest {
    name: String,
}

fn validate_name(name: &str) -> Result<(), AppError> {
    let mut errors = FieldErrors::new();
    if name.trim().is_empty() {
        errors.insert(
            "name".to_string(),
            "This field may not be blank.".to_string(),
        );
    } else if name.chars().count() > 255 {
        errors.insert(
            "name".to_string(),
            "Ensure this field has no more than 255 characters.".to_string(),
        );
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

async fn list_ingredients_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<IngredientDto>>, AppError> {
    let ingredients =
        ingredient_service::list_ingredients(&app_state.db_pool, auth_user.id).await?;
    Ok(Json(
        ingredients.into_iter().map(IngredientDto::from).collect(),
    ))
}

async fn update_ingredient_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(ingredient_id): Path<i32>,
    Json(payload): Json<UpdateIngredientRequest>,
) -> Result<Json<IngredientDto>, AppError> {
    validate_name(&payload.name)?;

    let updated = ingredient_service::update_ingredient(
        &app_state.db_pool,
        auth_user.id,
        ingredient_id,
        &payload.name,
    )
    .await
    .map_err(|db_err| match db_err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("An ingredient with this name already exists.".to_string())
        }
        _ => AppError::from(db_err),
    })?
    .ok_or_else(|| AppError::NotFound("Ingredient not found".to_string()))?;

    Ok(Json(IngredientDto::from(updated)))
}

async fn delete_ingredient_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(ingredient_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let rows_affected =
        ingredient_service::delete_ingredient(&app_state.db_pool, auth_user.id, ingredient_id)
            .await?;

    if rows_affected > 0 {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Ingredient not found".to_string()))
    }
}

pub fn create_ingredients_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_ingredients_handler))
        .route(
            "/{ingredient_id}",
            put(update_ingredient_handler)
                .patch(update_ingredient_handler)
                .delete(delete_ingredient_handler),
        )
}
