use axum::{Extension, Json, extract::State};
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter,
};
use std::sync::Arc;

use crate::db::entities::user;
use crate::web::error::AppError;
use crate::web::models::{
    AuthenticatedUser, Claims, LoginRequest, LoginResponse, RegisterRequest, UpdateMeRequest,
    UserResponse,
};
use crate::web::AppState;

pub async fn register_user(
    db: &DatabaseConnection,
    req: RegisterRequest,
) -> Result<UserResponse, AppError> {
    if req.email.trim().is_empty() || !req.email.contains('@') {
        return Err(AppError::InvalidInput(
            "A valid email address is required.".to_string(),
        ));
    }
    if req.password.len() < 8 {
        return Err(AppError::InvalidInput(
            "Password must be at least 8 characters long.".to_string(),
        ));
    }

    let existing: Option<user::Model> = user::Entity::find()
        .filter(user::Column::Email.eq(&req.email))
        .one(db)
        .await
        .map_err(|e: DbErr| AppError::DatabaseError(e.to_string()))?;

    if existing.is_some() {
        return Err(AppError::UserAlreadyExists(
            "A user with this email already exists.".to_string(),
        ));
    }

    let password_hash = hash(&req.password, DEFAULT_COST)
        .map_err(|e| AppError::PasswordHashingError(e.to_string()))?;

    let new_user = user::ActiveModel {
        email: Set(req.email.clone()),
        name: Set(req.name.clone()),
        password_hash: Set(password_hash),
        is_active: Set(true),
        is_staff: Set(false),
        is_superuser: Set(false),
        ..Default::default()
    };

    let model = new_user.insert(db).await?;
    Ok(UserResponse {
        id: model.id,
        email: model.email,
        name: model.name,
    })
}

pub async fn login_user(
    db: &DatabaseConnection,
    req: LoginRequest,
    jwt_secret: &str,
) -> Result<LoginResponse, AppError> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidInput(
            "Email and password must not be empty.".to_string(),
        ));
    }

    let user = user::Entity::find()
        .filter(user::Column::Email.eq(&req.email))
        .one(db)
        .await
        .map_err(|e: DbErr| AppError::DatabaseError(e.to_string()))?
        .ok_or(AppError::UserNotFound)?;

    if !user.is_active {
        return Err(AppError::InvalidCredentials);
    }

    let valid_password = verify(&req.password, &user.password_hash)
        .map_err(|e| AppError::InternalServerError(format!("Password verification failed: {e}")))?;

    if !valid_password {
        return Err(AppError::InvalidCredentials);
    }

    create_jwt_for_user(&user, jwt_secret)
}

pub fn create_jwt_for_user(user: &user::Model, jwt_secret: &str) -> Result<LoginResponse, AppError> {
    let now = Utc::now();
    // Token valid for 24 hours.
    let expiration = (now + Duration::hours(24)).timestamp() as usize;

    let claims = Claims {
        sub: user.email.clone(),
        user_id: user.id,
        exp: expiration,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::TokenCreationError(e.to_string()))?;

    Ok(LoginResponse {
        token,
        user_id: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
    })
}

pub async fn me(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<UserResponse>, AppError> {
    let user = user::Entity::find_by_id(auth_user.id)
        .one(&app_state.db_pool)
        .await?
        .ok_or(AppError::UserNotFound)?;

    Ok(Json(UserResponse {
        id: user.id,
        email: user.email,
        name: user.name,
    }))
}

pub async fn update_me(
    Extension(auth_user): Extension<AuthenticatedUser>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<UpdateMeRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = user::Entity::find_by_id(auth_user.id)
        .one(&app_state.db_pool)
        .await?
        .ok_or(AppError::UserNotFound)?;

    let mut model = user.into_active_model();
    if let Some(name) = payload.name {
        model.name = Set(name);
    }
    if let Some(password) = payload.password {
        if password.len() < 8 {
            return Err(AppError::InvalidInput(
                "Password must be at least 8 characters long.".to_string(),
            ));
        }
        let password_hash =
            hash(&password, DEFAULT_COST).map_err(|e| AppError::PasswordHashingError(e.to_string()))?;
        model.password_hash = Set(password_hash);
    }

    let updated = model.update(&app_state.db_pool).await?;
    Ok(Json(UserResponse {
        id: updated.id,
        email: updated.email,
        name: updated.name,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation, decode};

    #[test]
    fn issued_token_round_trips() {
        let user = user::Model {
            id: 11,
            email: "user@example.com".to_string(),
            name: "Test User".to_string(),
            password_hash: "irrelevant".to_string(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
        };

        let response = create_jwt_for_user(&user, "test-secret").unwrap();
        let data = decode::<Claims>(
            &response.token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap();

        assert_eq!(data.claims.user_id, 11);
        assert_eq!(data.claims.sub, "user@example.com");
    }
}
