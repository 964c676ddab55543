//! Record store for users, exams and certificates.
//!
//! [`JsonFileStore`] keeps one pretty-printed JSON array per entity under a
//! data directory. [`SqliteStore`] keeps the same records in SQLite. Both
//! implement [`RecordStore`], which is all the rest of the crate sees.

mod json;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::models::{certificate::Certificate, exam::Exam, user::User};

pub use json::JsonFileStore;
pub use sqlite::SqliteStore;

/// Errors raised by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed record file {file}: {source}")]
    Json {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Conflict(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// CRUD primitives shared by every backend.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All users in insertion order.
    async fn list_users(&self) -> Result<Vec<User>>;

    async fn get_user(&self, id: &str) -> Result<Option<User>>;

    /// Exact (case-sensitive) email match.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Fails with [`StoreError::Conflict`] if the id or email is taken.
    async fn insert_user(&self, user: &User) -> Result<()>;

    async fn list_exams(&self) -> Result<Vec<Exam>>;

    async fn get_exam(&self, id: &str) -> Result<Option<Exam>>;

    /// Fails with [`StoreError::Conflict`] if the id is taken.
    async fn insert_exam(&self, exam: &Exam) -> Result<()>;

    async fn list_certificates(&self) -> Result<Vec<Certificate>>;

    async fn get_certificate(&self, id: &str) -> Result<Option<Certificate>>;

    async fn find_certificate(&self, user_id: &str, exam_id: &str)
    -> Result<Option<Certificate>>;

    /// Inserts `cert` unless a certificate for the same (user, exam) pair
    /// exists. Returns the stored record and whether it was inserted.
    /// A certificate number already in use is a [`StoreError::Conflict`].
    async fn insert_certificate_if_absent(&self, cert: &Certificate)
    -> Result<(Certificate, bool)>;

    /// Like [`RecordStore::insert_certificate_if_absent`], but the number is
    /// picked by `number_for` from every number already stored, in the same
    /// critical section as the insert. Concurrent callers never receive the
    /// same number. The draft's own `certificate_number` is ignored.
    async fn issue_certificate(
        &self,
        draft: Certificate,
        number_for: &(dyn for<'n> Fn(&'n [String]) -> String + Send + Sync),
    ) -> Result<(Certificate, bool)>;

    /// Returns `false` if no certificate has that id.
    async fn update_certificate_score(&self, id: &str, score: u32) -> Result<bool>;
}

/// Opens the backend selected by the configuration: SQLite when
/// `DATABASE_URL` is set, JSON files under `DATA_DIR` otherwise.
pub async fn open_store(config: &Config) -> Result<Arc<dyn RecordStore>> {
    match &config.database_url {
        Some(url) => {
            tracing::info!("Using SQLite record store at {}", url);
            Ok(Arc::new(SqliteStore::connect(url).await?))
        }
        None => {
            tracing::info!("Using JSON record store in {}", config.data_dir.display());
            Ok(Arc::new(JsonFileStore::open(&config.data_dir).await?))
        }
    }
}
