// src/handlers/certificates.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::{certificate::CertificateSearchParams, user::User},
    services::certificates,
    store::RecordStore,
};

/// Certificates held by the current user.
pub async fn list_mine(
    State(store): State<Arc<dyn RecordStore>>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, AppError> {
    let certs = certificates::certificates_for_user(store.as_ref(), &user.id).await?;

    Ok(Json(certs))
}

/// Searches all certificates by holder name and/or user id.
pub async fn search(
    State(store): State<Arc<dyn RecordStore>>,
    Query(params): Query<CertificateSearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let certs = certificates::search_certificates(store.as_ref(), &params).await?;

    Ok(Json(certs))
}

pub async fn get_certificate(
    State(store): State<Arc<dyn RecordStore>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let cert = certificates::certificate_by_id(store.as_ref(), &id).await?;

    Ok(Json(cert))
}
