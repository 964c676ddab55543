// src/models/certificate.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An issued certificate. At most one exists per (user_id, exam_id).
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub exam_id: String,
    pub exam_title: String,
    pub certificate_number: String,
    pub issue_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<DateTime<Utc>>,
    #[sqlx(try_from = "i64")]
    pub score: u32,
}

/// Query parameters for `GET /api/certificates/search`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateSearchParams {
    pub name: Option<String>,
    pub user_id: Option<String>,
}
