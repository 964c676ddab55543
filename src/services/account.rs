// src/services/account.rs

use crate::{
    error::AppError,
    models::user::{RegisterRequest, User},
    store::RecordStore,
    utils::hash::{hash_password, verify_password},
};

/// Finds the user whose email *and* id both match exactly.
pub async fn get_user_by_email_and_id(
    store: &dyn RecordStore,
    email: &str,
    user_id: &str,
) -> Result<Option<User>, AppError> {
    let users = store.list_users().await?;
    Ok(users
        .into_iter()
        .find(|u| u.email == email && u.id == user_id))
}

/// Checks an email/password pair. Users without a stored password never match.
pub async fn validate_user_credentials(
    store: &dyn RecordStore,
    email: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    let Some(user) = store.find_user_by_email(email).await? else {
        return Ok(None);
    };

    let Some(hash) = user.password.as_deref() else {
        tracing::debug!("User {} has no password set", user.id);
        return Ok(None);
    };

    if verify_password(password, hash)? {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

/// Creates a new account with a fresh UUID and an Argon2-hashed password.
pub async fn register_user(
    store: &dyn RecordStore,
    payload: RegisterRequest,
) -> Result<User, AppError> {
    let email = payload.email.trim().to_string();
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name must not be blank".to_string()));
    }

    let preferred_field = payload
        .preferred_field
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty());

    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email,
        name,
        preferred_field,
        password: Some(hash_password(&payload.password)?),
        assigned_exam_id: None,
    };

    store.insert_user(&user).await?;
    tracing::info!("Registered user {} <{}>", user.id, user.email);

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::JsonFileStore;

    async fn store_with_users() -> (tempfile::TempDir, JsonFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        store
            .insert_user(&User {
                id: "2277131963".into(),
                email: "yusuf@example.com".into(),
                name: "Yusuf Mohamed".into(),
                preferred_field: None,
                password: None,
                assigned_exam_id: None,
            })
            .await
            .unwrap();
        store
            .insert_user(&User {
                id: "1234567890".into(),
                email: "test@example.com".into(),
                name: "Test User".into(),
                preferred_field: Some("apex".into()),
                password: Some(hash_password("password123").unwrap()),
                assigned_exam_id: None,
            })
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn email_and_id_must_both_match() {
        let (_dir, store) = store_with_users().await;

        let found = get_user_by_email_and_id(&store, "yusuf@example.com", "2277131963")
            .await
            .unwrap();
        assert_eq!(found.map(|u| u.name), Some("Yusuf Mohamed".to_string()));

        // Mixed pair: valid email, another user's id.
        assert!(
            get_user_by_email_and_id(&store, "yusuf@example.com", "1234567890")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            get_user_by_email_and_id(&store, "YUSUF@example.com", "2277131963")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn credentials_check_password_hash() {
        let (_dir, store) = store_with_users().await;

        let ok = validate_user_credentials(&store, "test@example.com", "password123")
            .await
            .unwrap();
        assert_eq!(ok.map(|u| u.id), Some("1234567890".to_string()));

        assert!(
            validate_user_credentials(&store, "test@example.com", "password124")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            validate_user_credentials(&store, "nobody@example.com", "password123")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn passwordless_user_cannot_log_in_by_password() {
        let (_dir, store) = store_with_users().await;
        assert!(
            validate_user_credentials(&store, "yusuf@example.com", "")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn register_hashes_password_and_rejects_duplicates() {
        let (_dir, store) = store_with_users().await;

        let user = register_user(
            &store,
            RegisterRequest {
                email: " new@example.com ".into(),
                name: "New Person".into(),
                password: "s3cret!".into(),
                preferred_field: Some("  ".into()),
            },
        )
        .await
        .unwrap();

        assert_eq!(user.email, "new@example.com");
        assert!(user.preferred_field.is_none());
        assert_ne!(user.password.as_deref(), Some("s3cret!"));
        assert!(
            validate_user_credentials(&store, "new@example.com", "s3cret!")
                .await
                .unwrap()
                .is_some()
        );

        let err = register_user(
            &store,
            RegisterRequest {
                email: "new@example.com".into(),
                name: "Again".into(),
                password: "whatever".into(),
                preferred_field: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
