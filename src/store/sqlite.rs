//! SQLite backend. Same records as the JSON files, one table per entity
//! plus a `questions` table keyed by (exam_id, id).

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::types::Json;
use sqlx::FromRow;
use tokio::sync::Mutex;

use super::{RecordStore, Result, StoreError};
use crate::models::{certificate::Certificate, exam::Exam, question::Question, user::User};

const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    preferred_field TEXT,
    password TEXT,
    assigned_exam_id TEXT
);

CREATE TABLE IF NOT EXISTS exams (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    duration INTEGER NOT NULL,
    total_questions INTEGER NOT NULL,
    passing_score INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS questions (
    exam_id TEXT NOT NULL,
    id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    text TEXT NOT NULL,
    options TEXT NOT NULL,
    correct_answer INTEGER NOT NULL,
    category TEXT NOT NULL,
    PRIMARY KEY (exam_id, id),
    FOREIGN KEY (exam_id) REFERENCES exams(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS certificates (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    user_name TEXT NOT NULL,
    exam_id TEXT NOT NULL,
    exam_title TEXT NOT NULL,
    certificate_number TEXT NOT NULL,
    issue_date TEXT NOT NULL,
    expiry_date TEXT,
    score INTEGER NOT NULL,
    UNIQUE (user_id, exam_id)
);
CREATE INDEX IF NOT EXISTS idx_certificates_user_id ON certificates(user_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_certificates_number ON certificates(certificate_number);
"#;

/// How often issuing retries after another writer took the chosen number.
const ISSUE_ATTEMPTS: usize = 5;

const USER_COLUMNS: &str = "id, email, name, preferred_field, password, assigned_exam_id";
const EXAM_COLUMNS: &str = "id, title, description, duration, total_questions, passing_score";
const CERTIFICATE_COLUMNS: &str = "id, user_id, user_name, exam_id, exam_title, \
     certificate_number, issue_date, expiry_date, score";

#[derive(FromRow)]
struct ExamRow {
    id: String,
    title: String,
    description: String,
    #[sqlx(try_from = "i64")]
    duration: u32,
    #[sqlx(try_from = "i64")]
    total_questions: u32,
    #[sqlx(try_from = "i64")]
    passing_score: u32,
}

impl ExamRow {
    fn into_exam(self, questions: Vec<Question>) -> Exam {
        Exam {
            id: self.id,
            title: self.title,
            description: self.description,
            duration: self.duration,
            total_questions: self.total_questions,
            passing_score: self.passing_score,
            questions,
        }
    }
}

#[derive(FromRow)]
struct QuestionRow {
    exam_id: String,
    id: i64,
    text: String,
    options: Json<Vec<String>>,
    #[sqlx(try_from = "i64")]
    correct_answer: usize,
    category: String,
}

impl From<QuestionRow> for Question {
    fn from(row: QuestionRow) -> Self {
        Question {
            id: row.id,
            text: row.text,
            options: row.options.0,
            correct_answer: row.correct_answer,
            category: row.category,
        }
    }
}

/// Unique-constraint violations become [`StoreError::Conflict`].
fn map_insert_error(err: sqlx::Error, what: String) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(what),
        _ => StoreError::Database(err),
    }
}

/// SQLite-backed record store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    /// Serializes certificate issuing in this process. Writers in other
    /// processes are caught by the unique index on the number.
    issue_lock: Arc<Mutex<()>>,
}

impl SqliteStore {
    /// Connects to `url` (e.g. `sqlite://portal.db` or `sqlite::memory:`),
    /// creating the database file and schema if needed.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // An in-memory database lives and dies with its connection.
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self {
            pool,
            issue_lock: Arc::new(Mutex::new(())),
        };
        store.migrate().await?;
        Ok(store)
    }

    /// Creates the tables if they do not exist.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(CREATE_TABLES).execute(&self.pool).await?;
        Ok(())
    }

    async fn questions_for(&self, exam_id: &str) -> Result<Vec<Question>> {
        let rows: Vec<QuestionRow> = sqlx::query_as(
            "SELECT exam_id, id, text, options, correct_answer, category
             FROM questions WHERE exam_id = ? ORDER BY position",
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Question::from).collect())
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users ORDER BY rowid",
            USER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = ?",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, email, name, preferred_field, password, assigned_exam_id)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.preferred_field)
        .bind(&user.password)
        .bind(&user.assigned_exam_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_insert_error(e, format!("Email '{}' is already registered", user.email))
        })?;
        Ok(())
    }

    async fn list_exams(&self) -> Result<Vec<Exam>> {
        let exams: Vec<ExamRow> =
            sqlx::query_as(&format!("SELECT {} FROM exams ORDER BY rowid", EXAM_COLUMNS))
                .fetch_all(&self.pool)
                .await?;

        let rows: Vec<QuestionRow> = sqlx::query_as(
            "SELECT exam_id, id, text, options, correct_answer, category
             FROM questions ORDER BY exam_id, position",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_exam: HashMap<String, Vec<Question>> = HashMap::new();
        for row in rows {
            by_exam.entry(row.exam_id.clone()).or_default().push(row.into());
        }

        Ok(exams
            .into_iter()
            .map(|row| {
                let questions = by_exam.remove(&row.id).unwrap_or_default();
                row.into_exam(questions)
            })
            .collect())
    }

    async fn get_exam(&self, id: &str) -> Result<Option<Exam>> {
        let row: Option<ExamRow> =
            sqlx::query_as(&format!("SELECT {} FROM exams WHERE id = ?", EXAM_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(row) => {
                let questions = self.questions_for(&row.id).await?;
                Ok(Some(row.into_exam(questions)))
            }
            None => Ok(None),
        }
    }

    async fn insert_exam(&self, exam: &Exam) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO exams (id, title, description, duration, total_questions, passing_score)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&exam.id)
        .bind(&exam.title)
        .bind(&exam.description)
        .bind(i64::from(exam.duration))
        .bind(i64::from(exam.total_questions))
        .bind(i64::from(exam.passing_score))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_insert_error(e, format!("Exam '{}' already exists", exam.id)))?;

        for (position, q) in exam.questions.iter().enumerate() {
            sqlx::query(
                "INSERT INTO questions
                    (exam_id, id, position, text, options, correct_answer, category)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&exam.id)
            .bind(q.id)
            .bind(position as i64)
            .bind(&q.text)
            .bind(Json(&q.options))
            .bind(q.correct_answer as i64)
            .bind(&q.category)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                map_insert_error(e, format!("Duplicate question {} in exam '{}'", q.id, exam.id))
            })?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_certificates(&self) -> Result<Vec<Certificate>> {
        let certs = sqlx::query_as::<_, Certificate>(&format!(
            "SELECT {} FROM certificates ORDER BY rowid",
            CERTIFICATE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(certs)
    }

    async fn get_certificate(&self, id: &str) -> Result<Option<Certificate>> {
        let cert = sqlx::query_as::<_, Certificate>(&format!(
            "SELECT {} FROM certificates WHERE id = ?",
            CERTIFICATE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(cert)
    }

    async fn find_certificate(
        &self,
        user_id: &str,
        exam_id: &str,
    ) -> Result<Option<Certificate>> {
        let cert = sqlx::query_as::<_, Certificate>(&format!(
            "SELECT {} FROM certificates WHERE user_id = ? AND exam_id = ?",
            CERTIFICATE_COLUMNS
        ))
        .bind(user_id)
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(cert)
    }

    async fn insert_certificate_if_absent(
        &self,
        cert: &Certificate,
    ) -> Result<(Certificate, bool)> {
        let result = sqlx::query(
            "INSERT INTO certificates
                (id, user_id, user_name, exam_id, exam_title, certificate_number,
                 issue_date, expiry_date, score)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (user_id, exam_id) DO NOTHING",
        )
        .bind(&cert.id)
        .bind(&cert.user_id)
        .bind(&cert.user_name)
        .bind(&cert.exam_id)
        .bind(&cert.exam_title)
        .bind(&cert.certificate_number)
        .bind(cert.issue_date)
        .bind(cert.expiry_date)
        .bind(i64::from(cert.score))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_insert_error(
                e,
                format!(
                    "Certificate '{}' or number '{}' already exists",
                    cert.id, cert.certificate_number
                ),
            )
        })?;

        let stored = self
            .find_certificate(&cert.user_id, &cert.exam_id)
            .await?
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        Ok((stored, result.rows_affected() == 1))
    }

    async fn issue_certificate(
        &self,
        mut draft: Certificate,
        number_for: &(dyn for<'n> Fn(&'n [String]) -> String + Send + Sync),
    ) -> Result<(Certificate, bool)> {
        let _guard = self.issue_lock.lock().await;

        let mut attempt = 0;
        loop {
            attempt += 1;
            if let Some(existing) = self
                .find_certificate(&draft.user_id, &draft.exam_id)
                .await?
            {
                return Ok((existing, false));
            }

            let numbers: Vec<String> =
                sqlx::query_scalar("SELECT certificate_number FROM certificates")
                    .fetch_all(&self.pool)
                    .await?;
            draft.certificate_number = number_for(&numbers);

            match self.insert_certificate_if_absent(&draft).await {
                Err(StoreError::Conflict(_)) if attempt < ISSUE_ATTEMPTS => {
                    tracing::debug!(
                        "Certificate number {} taken by another writer, retrying",
                        draft.certificate_number
                    );
                }
                other => return other,
            }
        }
    }

    async fn update_certificate_score(&self, id: &str, score: u32) -> Result<bool> {
        let result = sqlx::query("UPDATE certificates SET score = ? WHERE id = ?")
            .bind(i64::from(score))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
