// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A portal account, as persisted in `users.json` / the `users` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,

    pub email: String,

    /// Display name, printed on certificates.
    pub name: String,

    /// Certification topic the user signed up for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_field: Option<String>,

    /// Argon2 PHC string. Never leaves the store; see [`UserProfile`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Direct exam assignment, overrides `preferred_field`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_exam_id: Option<String>,
}

/// Public view of a user (excludes the password hash).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_exam_id: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            preferred_field: user.preferred_field.clone(),
            assigned_exam_id: user.assigned_exam_id.clone(),
        }
    }
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name length must be between 1 and 100 characters."
    ))]
    pub name: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
    #[validate(length(max = 50))]
    pub preferred_field: Option<String>,
}

/// DTO for user login.
///
/// Which of `password` / `user_id` is required depends on the configured
/// [`LoginScheme`](crate::config::LoginScheme).
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub user_id: Option<String>,
}

/// Aggregated numbers for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub exams_completed: usize,
    pub certificates_earned: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_score: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_never_carries_password() {
        let user = User {
            id: "u1".to_string(),
            email: "a@b.io".to_string(),
            name: "A".to_string(),
            preferred_field: None,
            password: Some("$argon2id$secret".to_string()),
            assigned_exam_id: None,
        };
        let json = serde_json::to_value(UserProfile::from(&user)).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["email"], "a@b.io");
    }

    #[test]
    fn stored_user_reads_legacy_records() {
        // Seeded records predate passwords and assignments.
        let user: User =
            serde_json::from_str(r#"{"id":"1","email":"t@e.com","name":"T"}"#).unwrap();
        assert!(user.password.is_none());
        assert!(user.preferred_field.is_none());
    }
}
