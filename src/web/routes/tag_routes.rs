use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, put},
};
use sea_orm::SqlErr;
use serde::Deserialize;
use std::sync::Arc;

use crate::db::models::TagDto;
use crate::db::services::tag_service;
use crate::web::models::AuthenticatedUser;
use crate::web::{AppState, error::AppError, error::FieldErrors};

// --- Request/Response Structs ---

#[derive(Deserialize)]
pub struct UpdateTagRequest {
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

// --- Route Handlers ---

async fn list_tags_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<TagDto>>, AppError> {
    let tags = tag_service::list_tags(&app_state.db_pool, auth_user.id).await?;
    Ok(Json(tags.into_iter().map(TagDto::from).collect()))
}

async fn update_tag_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(tag_id): Path<i32>,
    Json(payload): Json<UpdateTagRequest>,
) -> Result<Json<TagDto>, AppError> {
    validate_name(&payload.name)?;

    let updated = tag_service::update_tag(&app_state.db_pool, auth_user.id, tag_id, &payload.name)
        .await
        .map_err(|db_err| match db_err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Conflict("A tag with this name already exists.".to_string())
            }
            _ => AppError::from(db_err),
        })?
        .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))?;

    Ok(Json(TagDto::from(updated)))
}

async fn delete_tag_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(tag_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let rows_affected = tag_service::delete_tag(&app_state.db_pool, auth_user.id, tag_id).await?;

    if rows_affected > 0 {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Tag not found".to_string()))
    }
}

// --- Router ---

pub fn create_tags_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_tags_handler))
        .route(
            "/{tag_id}",
            put(update_tag_handler)
                .patch(update_tag_handler)
                .delete(delete_tag_handler),
        )
}
