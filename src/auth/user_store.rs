//! User Storage
//! Mission: Store and look up user accounts, hashing passwords with bcrypt

use crate::auth::models::{User, UserRole};
use crate::db::{is_unique_violation, Database};
use crate::error::{ApiError, ApiResult};
use anyhow::Context;
use bcrypt::{hash, verify};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use tracing::{info, warn};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, name, email, tel, password_hash, role, created_at";

/// User storage backed by the shared SQLite database
#[derive(Clone)]
pub struct UserStore {
    db: Database,
    bcrypt_cost: u32,
}

impl UserStore {
    pub fn new(db: Database, bcrypt_cost: u32) -> Self {
        Self { db, bcrypt_cost }
    }

    /// Create a new user. Emails are unique (case-insensitive).
    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        tel: Option<&str>,
        password: &str,
        role: UserRole,
    ) -> ApiResult<User> {
        let password_hash = hash(password, self.bcrypt_cost).context("Failed to hash password")?;

        let user = User {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            email: normalize_email(email),
            tel: tel.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
            password_hash,
            role,
            created_at: Utc::now().to_rfc3339(),
        };

        let conn = self.db.conn().lock().await;
        let inserted = conn.execute(
            "INSERT INTO users (id, name, email, tel, password_hash, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user.id.to_string(),
                user.name,
                user.email,
                user.tel,
                user.password_hash,
                user.role.as_str(),
                user.created_at,
            ],
        );

        match inserted {
            Ok(_) => {
                info!("Created user: {} ({})", user.email, user.role.as_str());
                Ok(user)
            }
            Err(e) if is_unique_violation(&e) => Err(ApiError::DuplicateEmail),
            Err(e) => Err(e.into()),
        }
    }

    /// Get user by email
    pub async fn get_user_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let conn = self.db.conn().lock().await;
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![normalize_email(email)],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Get user by id
    pub async fn get_user(&self, id: &Uuid) -> ApiResult<Option<User>> {
        let conn = self.db.conn().lock().await;
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.to_string()],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Verify email and password, returning the matching user.
    /// Unknown email and wrong password fail the same way.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> ApiResult<User> {
        let Some(user) = self.get_user_by_email(email).await? else {
            warn!("Failed login attempt for unknown email: {}", email);
            return Err(ApiError::InvalidCredentials);
        };

        let valid = verify(password, &user.password_hash).context("Failed to verify password")?;
        if !valid {
            warn!("Failed login attempt: {}", user.email);
            return Err(ApiError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Create the configured admin account if no user holds that email yet.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> ApiResult<()> {
        if self.get_user_by_email(email).await?.is_some() {
            return Ok(());
        }

        self.create_user("Administrator", email, None, password, UserRole::Admin)
            .await?;
        info!("Bootstrap admin account created: {}", normalize_email(email));
        Ok(())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let id: String = row.get(0)?;
    let role: String = row.get(5)?;
    Ok(User {
        id: Uuid::parse_str(&id).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?,
        name: row.get(1)?,
        email: row.get(2)?,
        tel: row.get(3)?,
        password_hash: row.get(4)?,
        role: UserRole::from_str(&role).unwrap_or(UserRole::User),
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> UserStore {
        UserStore::new(Database::in_memory().unwrap(), 4)
    }

    #[tokio::test]
    async fn test_create_and_retrieve_user() {
        let store = create_test_store();

        let user = store
            .create_user("Alice", "Alice@Example.com", Some("0812345678"), "pw123", UserRole::User)
            .await
            .unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.role, UserRole::User);
        assert_ne!(user.password_hash, "pw123");

        let by_email = store
            .get_user_by_email("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, user.id);
        assert_eq!(by_email.tel.as_deref(), Some("0812345678"));

        let by_id = store.get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, user.email);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = create_test_store();

        store
            .create_user("Alice", "alice@example.com", None, "pw123", UserRole::User)
            .await
            .unwrap();
        let dup = store
            .create_user("Other", "ALICE@example.com", None, "pw456", UserRole::User)
            .await;
        assert!(matches!(dup, Err(ApiError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn test_password_verification() {
        let store = create_test_store();
        store
            .create_user("Bob", "bob@example.com", None, "hunter2", UserRole::User)
            .await
            .unwrap();

        let user = store
            .verify_credentials("bob@example.com", "hunter2")
            .await
            .unwrap();
        assert_eq!(user.email, "bob@example.com");

        let wrong = store.verify_credentials("bob@example.com", "wrong").await;
        assert!(matches!(wrong, Err(ApiError::InvalidCredentials)));

        let missing = store.verify_credentials("nobody@example.com", "pw").await;
        assert!(matches!(missing, Err(ApiError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let store = create_test_store();

        store.ensure_admin("root@example.com", "rootpw").await.unwrap();
        store.ensure_admin("root@example.com", "rootpw").await.unwrap();

        let admin = store
            .get_user_by_email("root@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, UserRole::Admin);
    }
}
