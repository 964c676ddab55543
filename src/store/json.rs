//! Flat-file backend: one JSON array per entity.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::Mutex;

use super::{RecordStore, Result, StoreError};
use crate::models::{certificate::Certificate, exam::Exam, user::User};

const USERS_FILE: &str = "users.json";
const EXAMS_FILE: &str = "exams.json";
const CERTIFICATES_FILE: &str = "certificates.json";

/// JSON-file record store.
///
/// Every operation rewrites whole files, so all of them run under a single
/// async mutex. Two requests can never interleave a read-modify-write.
pub struct JsonFileStore {
    data_dir: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Opens (and creates if needed) the data directory. Missing record
    /// files are created as empty arrays.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let store = Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        };
        tokio::fs::create_dir_all(&store.data_dir).await?;

        let _guard = store.lock.lock().await;
        store.read_records::<User>(USERS_FILE).await?;
        store.read_records::<Exam>(EXAMS_FILE).await?;
        store.read_records::<Certificate>(CERTIFICATES_FILE).await?;
        drop(_guard);

        Ok(store)
    }

    /// Reads a record file. A missing file self-heals into `[]`.
    async fn read_records<T: DeserializeOwned + Serialize>(&self, file: &str) -> Result<Vec<T>> {
        let path = self.data_dir.join(file);
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) if raw.trim().is_empty() => Ok(Vec::new()),
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Json {
                file: file.to_string(),
                source,
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("{} missing, creating empty record file", path.display());
                self.write_records::<T>(file, &[]).await?;
                Ok(Vec::new())
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Replaces a record file. Writes a sibling temp file first and renames
    /// it over the target so readers never see a half-written array.
    async fn write_records<T: Serialize>(&self, file: &str, records: &[T]) -> Result<()> {
        let path = self.data_dir.join(file);
        let body = serde_json::to_string_pretty(records).map_err(|source| StoreError::Json {
            file: file.to_string(),
            source,
        })?;

        let tmp = self.data_dir.join(format!("{}.tmp", file));
        if let Err(e) = replace_file(&self.data_dir, &tmp, &path, body).await {
            tracing::error!("Failed to write {}: {:?}", path.display(), e);
            return Err(StoreError::Io(e));
        }
        Ok(())
    }
}

async fn replace_file(dir: &Path, tmp: &Path, target: &Path, body: String) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(tmp, body).await?;
    tokio::fs::rename(tmp, target).await
}

fn find_pair<'a>(
    certs: &'a [Certificate],
    user_id: &str,
    exam_id: &str,
) -> Option<&'a Certificate> {
    certs
        .iter()
        .find(|c| c.user_id == user_id && c.exam_id == exam_id)
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        let _guard = self.lock.lock().await;
        self.read_records(USERS_FILE).await
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let _guard = self.lock.lock().await;
        let users: Vec<User> = self.read_records(USERS_FILE).await?;
        Ok(users.into_iter().find(|u| u.id == id))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let _guard = self.lock.lock().await;
        let users: Vec<User> = self.read_records(USERS_FILE).await?;
        Ok(users.into_iter().find(|u| u.email == email))
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut users: Vec<User> = self.read_records(USERS_FILE).await?;
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!(
                "Email '{}' is already registered",
                user.email
            )));
        }
        if users.iter().any(|u| u.id == user.id) {
            return Err(StoreError::Conflict(format!("User id '{}' already exists", user.id)));
        }
        users.push(user.clone());
        self.write_records(USERS_FILE, &users).await
    }

    async fn list_exams(&self) -> Result<Vec<Exam>> {
        let _guard = self.lock.lock().await;
        self.read_records(EXAMS_FILE).await
    }

    async fn get_exam(&self, id: &str) -> Result<Option<Exam>> {
        let _guard = self.lock.lock().await;
        let exams: Vec<Exam> = self.read_records(EXAMS_FILE).await?;
        Ok(exams.into_iter().find(|e| e.id == id))
    }

    async fn insert_exam(&self, exam: &Exam) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut exams: Vec<Exam> = self.read_records(EXAMS_FILE).await?;
        if exams.iter().any(|e| e.id == exam.id) {
            return Err(StoreError::Conflict(format!("Exam '{}' already exists", exam.id)));
        }
        exams.push(exam.clone());
        self.write_records(EXAMS_FILE, &exams).await
    }

    async fn list_certificates(&self) -> Result<Vec<Certificate>> {
        let _guard = self.lock.lock().await;
        self.read_records(CERTIFICATES_FILE).await
    }

    async fn get_certificate(&self, id: &str) -> Result<Option<Certificate>> {
        let _guard = self.lock.lock().await;
        let certs: Vec<Certificate> = self.read_records(CERTIFICATES_FILE).await?;
        Ok(certs.into_iter().find(|c| c.id == id))
    }

    async fn find_certificate(
        &self,
        user_id: &str,
        exam_id: &str,
    ) -> Result<Option<Certificate>> {
        let _guard = self.lock.lock().await;
        let certs: Vec<Certificate> = self.read_records(CERTIFICATES_FILE).await?;
        Ok(find_pair(&certs, user_id, exam_id).cloned())
    }

    async fn insert_certificate_if_absent(
        &self,
        cert: &Certificate,
    ) -> Result<(Certificate, bool)> {
        let _guard = self.lock.lock().await;
        let mut certs: Vec<Certificate> = self.read_records(CERTIFICATES_FILE).await?;
        if let Some(existing) = find_pair(&certs, &cert.user_id, &cert.exam_id) {
            return Ok((existing.clone(), false));
        }
        if certs
            .iter()
            .any(|c| c.certificate_number == cert.certificate_number)
        {
            return Err(StoreError::Conflict(format!(
                "Certificate number '{}' is already taken",
                cert.certificate_number
            )));
        }
        certs.push(cert.clone());
        self.write_records(CERTIFICATES_FILE, &certs).await?;
        Ok((cert.clone(), true))
    }

    async fn issue_certificate(
        &self,
        mut draft: Certificate,
        number_for: &(dyn for<'n> Fn(&'n [String]) -> String + Send + Sync),
    ) -> Result<(Certificate, bool)> {
        let _guard = self.lock.lock().await;
        let mut certs: Vec<Certificate> = self.read_records(CERTIFICATES_FILE).await?;
        if let Some(existing) = find_pair(&certs, &draft.user_id, &draft.exam_id) {
            return Ok((existing.clone(), false));
        }

        let numbers: Vec<String> = certs
            .iter()
            .map(|c| c.certificate_number.clone())
            .collect();
        draft.certificate_number = number_for(&numbers);

        certs.push(draft.clone());
        self.write_records(CERTIFICATES_FILE, &certs).await?;
        Ok((draft, true))
    }

    async fn update_certificate_score(&self, id: &str, score: u32) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut certs: Vec<Certificate> = self.read_records(CERTIFICATES_FILE).await?;
        let Some(cert) = certs.iter_mut().find(|c| c.id == id) else {
            return Ok(false);
        };
        cert.score = score;
        self.write_records(CERTIFICATES_FILE, &certs).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: &str, email: &str) -> User {
        User {
            id: id.to_string(),
            email: email.to_string(),
            name: "Test User".to_string(),
            preferred_field: None,
            password: None,
            assigned_exam_id: None,
        }
    }

    fn cert(id: &str, user_id: &str, exam_id: &str) -> Certificate {
        Certificate {
            id: id.to_string(),
            user_id: user_id.to_string(),
            user_name: "Test User".to_string(),
            exam_id: exam_id.to_string(),
            exam_title: "ORACLE APEX".to_string(),
            certificate_number: format!("PC-ORA-0525-{}", id),
            issue_date: Utc::now(),
            expiry_date: None,
            score: 0,
        }
    }

    #[tokio::test]
    async fn open_creates_empty_record_files() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("nested").join("data");
        let store = JsonFileStore::open(&data).await.unwrap();

        for file in [USERS_FILE, EXAMS_FILE, CERTIFICATES_FILE] {
            let raw = std::fs::read_to_string(data.join(file)).unwrap();
            assert_eq!(raw.trim(), "[]");
        }
        assert!(store.list_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleted_file_self_heals_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        std::fs::remove_file(dir.path().join(CERTIFICATES_FILE)).unwrap();

        assert!(store.list_certificates().await.unwrap().is_empty());
        assert!(dir.path().join(CERTIFICATES_FILE).exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        std::fs::write(dir.path().join(USERS_FILE), "{not json").unwrap();

        let err = store.list_users().await.unwrap_err();
        assert!(matches!(err, StoreError::Json { .. }));
    }

    #[tokio::test]
    async fn users_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        store.insert_user(&user("1", "a@example.com")).await.unwrap();

        let reopened = JsonFileStore::open(dir.path()).await.unwrap();
        let found = reopened.find_user_by_email("a@example.com").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some("1".to_string()));
        assert!(reopened.find_user_by_email("A@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        store.insert_user(&user("1", "a@example.com")).await.unwrap();

        let err = store.insert_user(&user("2", "a@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn certificate_insert_is_idempotent_per_pair() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();

        let (first, inserted) = store
            .insert_certificate_if_absent(&cert("c1", "u1", "exam-001"))
            .await
            .unwrap();
        assert!(inserted);

        let (second, inserted) = store
            .insert_certificate_if_absent(&cert("c2", "u1", "exam-001"))
            .await
            .unwrap();
        assert!(!inserted);
        assert_eq!(second.id, first.id);
        assert_eq!(store.list_certificates().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn certificate_numbers_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        store
            .insert_certificate_if_absent(&cert("c1", "u1", "exam-001"))
            .await
            .unwrap();

        let clash = Certificate {
            certificate_number: "PC-ORA-0525-c1".to_string(),
            ..cert("c2", "u2", "exam-001")
        };
        let err = store.insert_certificate_if_absent(&clash).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn issue_numbers_from_stored_certificates() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        let count_up = |numbers: &[String]| format!("N-{}", numbers.len() + 1);

        let (first, inserted) = store
            .issue_certificate(cert("c1", "u1", "exam-001"), &count_up)
            .await
            .unwrap();
        assert!(inserted);
        assert_eq!(first.certificate_number, "N-1");

        let (second, _) = store
            .issue_certificate(cert("c2", "u2", "exam-001"), &count_up)
            .await
            .unwrap();
        assert_eq!(second.certificate_number, "N-2");

        // Same pair again: the stored record wins and no number is used up.
        let (again, inserted) = store
            .issue_certificate(cert("c3", "u1", "exam-001"), &count_up)
            .await
            .unwrap();
        assert!(!inserted);
        assert_eq!(again.id, "c1");
        assert_eq!(again.certificate_number, "N-1");
        assert_eq!(store.list_certificates().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn concurrent_inserts_do_not_lose_updates() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(JsonFileStore::open(dir.path()).await.unwrap());

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .insert_user(&user(&i.to_string(), &format!("u{}@example.com", i)))
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(store.list_users().await.unwrap().len(), 16);
    }

    #[tokio::test]
    async fn score_update_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        store
            .insert_certificate_if_absent(&cert("c1", "u1", "exam-001"))
            .await
            .unwrap();

        assert!(store.update_certificate_score("c1", 90).await.unwrap());
        assert!(!store.update_certificate_score("missing", 90).await.unwrap());
        let stored = store.get_certificate("c1").await.unwrap().unwrap();
        assert_eq!(stored.score, 90);
    }
}
