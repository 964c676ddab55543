// src/models/exam_response.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::certificate::Certificate;

/// DTO for submitting an exam attempt.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitExamRequest {
    pub exam_id: String,

    /// User's answers map.
    /// Key: Question ID
    /// Value: index of the selected option
    pub answers: HashMap<i64, usize>,
}

/// Result of a graded attempt. Returned to the caller, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserExamResponse {
    pub exam_id: String,
    pub user_id: String,
    pub answers: HashMap<i64, usize>,
    pub correct_count: usize,
    pub total_questions: usize,
    pub score: u32,
    pub passed_exam: bool,
    pub completed_at: DateTime<Utc>,

    /// Certificate issued (or already held) when the attempt passed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<Certificate>,
}
