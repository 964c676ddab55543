// src/handlers/user.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, response::IntoResponse};

use crate::{error::AppError, models::user::User, services::certificates, store::RecordStore};

/// Dashboard numbers for the current user.
pub async fn stats(
    State(store): State<Arc<dyn RecordStore>>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, AppError> {
    let stats = certificates::user_stats(store.as_ref(), &user.id).await?;

    Ok(Json(stats))
}
