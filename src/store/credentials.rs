/// Credential Store
///
/// Principal records keyed by email. The Postgres adapter is the production
/// implementation; see `store::memory` for the in-process one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StorageError;

/// An account that can authenticate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    /// bcrypt hash, never the plaintext
    pub password_hash: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

impl Principal {
    pub fn new(email: &str, password_hash: String, display_name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash,
            display_name: display_name.to_string(),
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find a principal by email; `None` if no such account
    async fn lookup(&self, email: &str) -> Result<Option<Principal>, StorageError>;

    async fn exists(&self, email: &str) -> Result<bool, StorageError>;

    /// Persist a new principal
    ///
    /// # Errors
    /// `UniqueViolation` if the email is already taken
    async fn create(&self, principal: &Principal) -> Result<(), StorageError>;
}

/// `users` table in Postgres
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn lookup(&self, email: &str) -> Result<Option<Principal>, StorageError> {
        let row = sqlx::query_as::<_, (Uuid, String, String, String, DateTime<Utc>)>(
            r#"
            SELECT id, email, password_hash, name, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, email, password_hash, display_name, created_at)| Principal {
            id,
            email,
            password_hash,
            display_name,
            created_at,
        }))
    }

    async fn exists(&self, email: &str) -> Result<bool, StorageError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn create(&self, principal: &Principal) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            "#,
        )
        .bind(principal.id)
        .bind(&principal.email)
        .bind(&principal.display_name)
        .bind(&principal.password_hash)
        .bind(principal.created_at)
        .execute(&self.pool)
        .await?;

        tracing::debug!(principal_id = %principal.id, "Principal persisted");
        Ok(())
    }
}
