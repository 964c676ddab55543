// src/models/question.rs

use serde::{Deserialize, Serialize};

/// A single multiple-choice question inside an exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,

    /// The question text.
    pub text: String,

    /// Ordered answer options.
    pub options: Vec<String>,

    /// Index into `options` of the correct answer.
    pub correct_answer: usize,

    pub category: String,
}

/// DTO for sending a question to the client (excludes the correct answer).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: i64,
    pub text: String,
    pub options: Vec<String>,
    pub category: String,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            text: q.text.clone(),
            options: q.options.clone(),
            category: q.category.clone(),
        }
    }
}
