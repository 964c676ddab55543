// src/handlers/auth.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    config::{Config, LoginScheme},
    error::AppError,
    models::user::{LoginRequest, RegisterRequest, User, UserProfile},
    services::account,
    store::RecordStore,
    utils::jwt::{Claims, RevokedTokens, sign_jwt},
};

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user profile (excluding password).
pub async fn register(
    State(store): State<Arc<dyn RecordStore>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = account::register_user(store.as_ref(), payload).await?;

    Ok((StatusCode::CREATED, Json(UserProfile::from(&user))))
}

/// Authenticates a user and returns a JWT token.
///
/// The credential pair depends on the configured login scheme:
/// email + password, or email + user id.
pub async fn login(
    State(store): State<Arc<dyn RecordStore>>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = match config.login_scheme {
        LoginScheme::Password => {
            let password = payload
                .password
                .as_deref()
                .ok_or_else(|| AppError::BadRequest("Password is required".to_string()))?;
            account::validate_user_credentials(store.as_ref(), &payload.email, password).await?
        }
        LoginScheme::UserId => {
            let user_id = payload
                .user_id
                .as_deref()
                .ok_or_else(|| AppError::BadRequest("User id is required".to_string()))?;
            account::get_user_by_email_and_id(store.as_ref(), &payload.email, user_id).await?
        }
    };

    let user = user.ok_or_else(|| {
        tracing::info!("Failed login attempt for {}", payload.email);
        AppError::AuthError("Invalid credentials".to_string())
    })?;

    let token = sign_jwt(&user, &config.jwt_secret, config.jwt_expiration)?;
    tracing::info!("User {} logged in", user.id);

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "user": UserProfile::from(&user),
    })))
}

/// Revokes the presented token.
pub async fn logout(
    State(revoked): State<RevokedTokens>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    revoked.revoke(&claims).await;
    tracing::info!("User {} logged out", claims.sub);

    Ok(Json(json!({ "message": "Logged out successfully" })))
}

/// Returns the authenticated user's profile.
pub async fn check(Extension(user): Extension<User>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(UserProfile::from(&user)))
}
