use axum::{
    Json, Router,
    extract::{Extension, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::db::models::{RecipeDetail, RecipePayload, RecipeSummary};
use crate::db::services::recipe_service::{self, RecipeListFilter, UpdateMode};
use crate::services::image_storage::ImageKind;
use crate::web::models::AuthenticatedUser;
use crate::web::{AppState, error::AppError, error::FieldErrors};

// --- Request/Response Structs ---

#[derive(Debug, Default, Deserialize)]
pub struct RecipeListQuery {
    /// Comma-separated tag ids; any match qualifies.
    pub tags: Option<String>,
    /// Comma-separated ingredient ids; any match qualifies.
    pub ingredients: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecipeImageResponse {
    pub id: i32,
    pub image: String,
}

fn parse_id_list(raw: &str) -> Result<Vec<i32>, AppError> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<i32>()
                .map_err(|_| AppError::InvalidInput(format!("Invalid id in filter list: '{part}'")))
        })
        .collect()
}

// --- Route Handlers ---

async fn list_recipes_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<RecipeListQuery>,
) -> Result<Json<Vec<RecipeSummary>>, AppError> {
    let filter = RecipeListFilter {
        tag_ids: query.tags.as_deref().map(parse_id_list).transpose()?,
        ingredient_ids: query.ingredients.as_deref().map(parse_id_list).transpose()?,
    };

    let recipes = recipe_service::list_recipes(&app_state.db_pool, auth_user.id, &filter).await?;
    Ok(Json(recipes))
}

async fn get_recipe_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(recipe_id): Path<i32>,
) -> Result<Json<RecipeDetail>, AppError> {
    recipe_service::get_recipe(&app_state.db_pool, auth_user.id, recipe_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Recipe not found".to_string()))
}

async fn create_recipe_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<RecipePayload>,
) -> Result<(StatusCode, Json<RecipeDetail>), AppError> {
    recipe_service::validate_payload(&payload, true).map_err(AppError::Validation)?;

    let recipe = recipe_service::create_recipe(&app_state.db_pool, auth_user.id, &payload).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn full_update_recipe_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(recipe_id): Path<i32>,
    Json(payload): Json<RecipePayload>,
) -> Result<Json<RecipeDetail>, AppError> {
    update_recipe(app_state, auth_user.id, recipe_id, payload, UpdateMode::Replace).await
}

async fn partial_update_recipe_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(recipe_id): Path<i32>,
    Json(payload): Json<RecipePayload>,
) -> Result<Json<RecipeDetail>, AppError> {
    update_recipe(app_state, auth_user.id, recipe_id, payload, UpdateMode::Merge).await
}

async fn update_recipe(
    app_state: Arc<AppState>,
    user_id: i32,
    recipe_id: i32,
    payload: RecipePayload,
    mode: UpdateMode,
) -> Result<Json<RecipeDetail>, AppError> {
    recipe_service::validate_payload(&payload, mode == UpdateMode::Replace)
        .map_err(AppError::Validation)?;

    recipe_service::update_recipe(&app_state.db_pool, user_id, recipe_id, &payload, mode)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Recipe not found".to_string()))
}

async fn delete_recipe_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(recipe_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let rows_affected =
        recipe_service::delete_recipe(&app_state.db_pool, auth_user.id, recipe_id).await?;

    if rows_affected > 0 {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Recipe not found".to_string()))
    }
}

async fn upload_image_handler(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Path(recipe_id): Path<i32>,
    mut multipart: Multipart,
) -> Result<Json<RecipeImageResponse>, AppError> {
    let mut image_bytes = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(e.to_string()))?
    {
        if field.name() == Some("image") {
            image_bytes = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidInput(e.to_string()))?,
            );
            break;
        }
    }

    let Some(bytes) = image_bytes else {
        let mut errors = FieldErrors::new();
        errors.insert("image".to_string(), "No image was submitted.".to_string());
        return Err(AppError::Validation(errors));
    };

    let kind = ImageKind::detect(&bytes)
        .ok_or_else(|| AppError::UnsupportedMedia("Upload a valid image.".to_string()))?;

    let reference = app_state
        .image_store
        .store(&bytes, kind)
        .map_err(|e| AppError::InternalServerError(format!("Failed to store image: {e}")))?;

    match recipe_service::attach_image(&app_state.db_pool, auth_user.id, recipe_id, &reference)
        .await?
    {
        Some((recipe, previous)) => {
            if let Some(previous) = previous {
                if let Err(e) = app_state.image_store.delete(&previous) {
                    warn!(reference = %previous, error = %e, "Failed to delete replaced recipe image.");
                }
            }
            Ok(Json(RecipeImageResponse {
                id: recipe.id,
                image: app_state.config.media_url_for(&reference),
            }))
        }
        None => {
            // The recipe turned out to be absent or foreign; drop the file
            // written a moment ago.
            let _ = app_state.image_store.delete(&reference);
            Err(AppError::NotFound("Recipe not found".to_string()))
        }
    }
}

// --- Router ---

pub fn create_recipes_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_recipes_handler).post(create_recipe_handler))
        .route(
            "/{recipe_id}",
            get(get_recipe_handler)
                .put(full_update_recipe_handler)
                .patch(partial_update_recipe_handler)
                .delete(delete_recipe_handler),
        )
        .route("/{recipe_id}/image", post(upload_image_handler))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_list_parsing() {
        assert_eq!(parse_id_list("1,2,3").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_id_list("7").unwrap(), vec![7]);
        assert_eq!(parse_id_list(" 4 , 5 ").unwrap(), vec![4, 5]);
        assert!(parse_id_list("").is_err());
        assert!(parse_id_list("1,x").is_err());
    }
}
