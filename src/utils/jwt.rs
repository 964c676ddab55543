// src/utils/jwt.rs

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{error::AppError, models::user::User, state::AppState};

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - the user id.
    pub sub: String,
    pub email: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
    /// Token id, used to revoke the token on logout.
    pub jti: String,
}

fn now_secs() -> Result<usize, AppError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Signs a new JWT for the user, valid for `expiration_seconds`.
pub fn sign_jwt(user: &User, secret: &str, expiration_seconds: u64) -> Result<String, AppError> {
    let claims = Claims {
        sub: user.id.clone(),
        email: user.email.clone(),
        exp: now_secs()? + expiration_seconds as usize,
        jti: uuid::Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Token ids revoked by logout, kept until the token would have expired
/// anyway.
#[derive(Debug, Clone, Default)]
pub struct RevokedTokens {
    inner: Arc<RwLock<HashMap<String, usize>>>,
}

impl RevokedTokens {
    pub async fn revoke(&self, claims: &Claims) {
        let now = now_secs().unwrap_or(0);
        let mut revoked = self.inner.write().await;
        revoked.retain(|_, exp| *exp > now);
        revoked.insert(claims.jti.clone(), claims.exp);
    }

    pub async fn is_revoked(&self, jti: &str) -> bool {
        self.inner.read().await.contains_key(jti)
    }
}

/// Axum Middleware: Authentication.
///
/// Validates the `Authorization: Bearer <token>` header and loads the user
/// it names. On success both the `Claims` and the `User` are inserted into
/// the request extensions. Anything else is a 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::AuthError("Authentication required".to_string()))?;

    let claims = verify_jwt(token, &state.config.jwt_secret)?;

    if state.revoked.is_revoked(&claims.jti).await {
        return Err(AppError::AuthError("Token has been revoked".to_string()));
    }

    let user = state
        .store
        .get_user(&claims.sub)
        .await?
        .ok_or_else(|| AppError::AuthError("Not authenticated".to_string()))?;

    req.extensions_mut().insert(claims);
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
