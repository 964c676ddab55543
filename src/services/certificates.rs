// src/services/certificates.rs

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Months, Utc};
use regex::Regex;

use crate::{
    error::AppError,
    models::{
        certificate::{Certificate, CertificateSearchParams},
        exam::Exam,
        user::{User, UserStats},
    },
    store::RecordStore,
};

/// Certificates stay valid for two years after issue.
const VALIDITY_MONTHS: u32 = 24;

/// `PC-{prefix}-{MMYY}-{sequence}`
static CERTIFICATE_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^PC-([A-Z0-9]{3})-(\d{4})-(\d+)$").expect("certificate number pattern")
});

/// First three ASCII alphanumerics of the title, uppercased, padded with `X`.
pub fn title_prefix(title: &str) -> String {
    let mut prefix: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(3)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    while prefix.len() < 3 {
        prefix.push('X');
    }
    prefix
}

/// Next free number for `title` in the month of `issued_at`, given the
/// numbers already handed out. Older formats that do not parse are skipped.
pub fn next_certificate_number<'a>(
    title: &str,
    issued_at: DateTime<Utc>,
    existing: impl IntoIterator<Item = &'a str>,
) -> String {
    let prefix = title_prefix(title);
    let period = format!("{:02}{:02}", issued_at.month(), issued_at.year() % 100);

    let last = existing
        .into_iter()
        .filter_map(|number| CERTIFICATE_NUMBER.captures(number))
        .filter(|caps| caps[1] == *prefix && caps[2] == *period)
        .filter_map(|caps| caps[3].parse::<u64>().ok())
        .max()
        .unwrap_or(0);

    format!("PC-{}-{}-{:03}", prefix, period, last + 1)
}

/// Builds a fresh certificate record for (user, exam).
pub fn new_certificate(
    user: &User,
    exam: &Exam,
    score: u32,
    issued_at: DateTime<Utc>,
    certificate_number: String,
) -> Certificate {
    Certificate {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        user_name: user.name.clone(),
        exam_id: exam.id.clone(),
        exam_title: exam.title.clone(),
        certificate_number,
        issue_date: issued_at,
        expiry_date: issued_at.checked_add_months(Months::new(VALIDITY_MONTHS)),
        score,
    }
}

/// Returns the certificate for (user, exam), creating it on first call.
///
/// A certificate stored with score 0 takes the score of a later pass.
/// Nothing else on an existing certificate ever changes.
pub async fn generate_certificate(
    store: &dyn RecordStore,
    user: &User,
    exam: &Exam,
    score: u32,
) -> Result<Certificate, AppError> {
    let existing = match store.find_certificate(&user.id, &exam.id).await? {
        Some(cert) => cert,
        None => {
            let issued_at = Utc::now();
            let draft = new_certificate(user, exam, score, issued_at, String::new());
            let number_for = |numbers: &[String]| {
                next_certificate_number(
                    &exam.title,
                    issued_at,
                    numbers.iter().map(String::as_str),
                )
            };

            let (stored, inserted) = store.issue_certificate(draft, &number_for).await?;
            if inserted {
                tracing::info!(
                    "Issued certificate {} to user {} for {}",
                    stored.certificate_number,
                    user.id,
                    exam.id
                );
                return Ok(stored);
            }
            stored
        }
    };

    backfill_score(store, existing, score).await
}

async fn backfill_score(
    store: &dyn RecordStore,
    mut cert: Certificate,
    score: u32,
) -> Result<Certificate, AppError> {
    if cert.score == 0 && score > 0 && store.update_certificate_score(&cert.id, score).await? {
        tracing::info!("Backfilled score {} on certificate {}", score, cert.id);
        cert.score = score;
    }
    Ok(cert)
}

pub async fn certificates_for_user(
    store: &dyn RecordStore,
    user_id: &str,
) -> Result<Vec<Certificate>, AppError> {
    let certs = store.list_certificates().await?;
    Ok(certs.into_iter().filter(|c| c.user_id == user_id).collect())
}

pub async fn certificate_by_id(
    store: &dyn RecordStore,
    id: &str,
) -> Result<Certificate, AppError> {
    store
        .get_certificate(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Certificate not found".to_string()))
}

/// Case-insensitive substring on the holder's name, exact on user id.
/// Blank filters match everything.
pub fn matches_search(cert: &Certificate, params: &CertificateSearchParams) -> bool {
    let name_match = match params.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => cert
            .user_name
            .to_lowercase()
            .contains(&name.to_lowercase()),
        _ => true,
    };
    let id_match = match params.user_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => cert.user_id == id,
        _ => true,
    };
    name_match && id_match
}

pub async fn search_certificates(
    store: &dyn RecordStore,
    params: &CertificateSearchParams,
) -> Result<Vec<Certificate>, AppError> {
    let certs = store.list_certificates().await?;
    Ok(certs
        .into_iter()
        .filter(|c| matches_search(c, params))
        .collect())
}

pub async fn user_stats(store: &dyn RecordStore, user_id: &str) -> Result<UserStats, AppError> {
    let certs = certificates_for_user(store, user_id).await?;
    let latest_score = certs.iter().max_by_key(|c| c.issue_date).map(|c| c.score);

    Ok(UserStats {
        exams_completed: certs.len(),
        certificates_earned: certs.len(),
        latest_score,
    })
}
