// src/handlers/exams.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::{
        exam::{ExamSummary, PublicExam},
        exam_response::SubmitExamRequest,
        user::User,
    },
    services::exams,
    store::RecordStore,
};

/// Lists the exams the current user may take (without questions).
pub async fn list_available(
    State(store): State<Arc<dyn RecordStore>>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, AppError> {
    let available = exams::available_exams_for_user(store.as_ref(), &user).await?;
    let summaries: Vec<ExamSummary> = available.iter().map(ExamSummary::from).collect();

    Ok(Json(summaries))
}

/// Returns the first available exam with its active questions.
pub async fn current(
    State(store): State<Arc<dyn RecordStore>>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, AppError> {
    let exam = exams::current_exam_for_user(store.as_ref(), &user).await?;

    Ok(Json(exam))
}

/// Returns a single available exam by id.
pub async fn get_exam(
    State(store): State<Arc<dyn RecordStore>>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let exam = exams::exam_for_user(store.as_ref(), &user, &id).await?;

    Ok(Json(PublicExam::from(&exam)))
}

/// Grades the submitted answers. A pass issues the certificate.
pub async fn submit(
    State(store): State<Arc<dyn RecordStore>>,
    Extension(user): Extension<User>,
    Json(req): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = exams::submit_exam(store.as_ref(), &user, req).await?;

    Ok(Json(result))
}
