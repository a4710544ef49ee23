//! Passkey credential repository (`passkey_credentials` table).

use crate::error::{RepositoryError, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Row mapping for the `passkey_credentials` table.
///
/// `signature_count` must never regress; [`PgPasskeyRepository::update_signature_count`]
/// enforces this with a `WHERE signature_count < $new` clause rather than
/// trusting the caller.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PasskeyRow {
    pub credential_id: String,
    pub user_id: Uuid,
    pub user_handle: String,
    pub public_key_ciphertext: Vec<u8>,
    pub signature_count: i64,
    pub transports: Vec<String>,
    pub uv_initialized: bool,
    pub backup_eligible: bool,
    pub backup_state: bool,
    pub friendly_name: Option<String>,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Repository port over passkey credentials.
pub trait PasskeyRepository: Send + Sync {
    /// Find a credential by its base64url credential id.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] or a database error.
    async fn find_by_credential_id(&self, credential_id: &str) -> Result<PasskeyRow>;

    /// List every credential registered to a user.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<PasskeyRow>>;

    /// Register a new credential.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Conflict`] if `credential_id` is already
    /// registered to any user, or a database error.
    async fn create(&self, credential: &PasskeyRow) -> Result<PasskeyRow>;

    /// Atomically bump `signature_count` and `last_used_at` after a
    /// successful assertion.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::VersionConflict`] if `new_count` does not
    /// exceed the stored count (a cloned-authenticator signal), or a
    /// database error.
    async fn update_signature_count(
        &self,
        credential_id: &str,
        new_count: i64,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Remove a credential.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] or a database error.
    async fn delete(&self, credential_id: &str) -> Result<()>;
}

/// `sqlx`-backed [`PasskeyRepository`].
#[derive(Clone)]
pub struct PgPasskeyRepository {
    pool: PgPool,
}

impl PgPasskeyRepository {
    /// Build a repository over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl PasskeyRepository for PgPasskeyRepository {
    async fn find_by_credential_id(&self, credential_id: &str) -> Result<PasskeyRow> {
        sqlx::query_as::<_, PasskeyRow>(
            "SELECT * FROM passkey_credentials WHERE credential_id = $1",
        )
        .bind(credential_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?
        .ok_or(RepositoryError::NotFound)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<PasskeyRow>> {
        sqlx::query_as::<_, PasskeyRow>(
            "SELECT * FROM passkey_credentials WHERE user_id = $1 ORDER BY last_used_at DESC NULLS LAST",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)
    }

    async fn create(&self, credential: &PasskeyRow) -> Result<PasskeyRow> {
        sqlx::query_as::<_, PasskeyRow>(
            r"
            INSERT INTO passkey_credentials (
                credential_id, user_id, user_handle, public_key_ciphertext,
                signature_count, transports, uv_initialized, backup_eligible,
                backup_state, friendly_name
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            ",
        )
        .bind(&credential.credential_id)
        .bind(credential.user_id)
        .bind(&credential.user_handle)
        .bind(&credential.public_key_ciphertext)
        .bind(credential.signature_count)
        .bind(&credential.transports)
        .bind(credential.uv_initialized)
        .bind(credential.backup_eligible)
        .bind(credential.backup_state)
        .bind(&credential.friendly_name)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)
    }

    async fn update_signature_count(
        &self,
        credential_id: &str,
        new_count: i64,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            r"
            UPDATE passkey_credentials
            SET signature_count = $1, last_used_at = $2
            WHERE credential_id = $3 AND signature_count < $1
            ",
        )
        .bind(new_count)
        .bind(at)
        .bind(credential_id)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::VersionConflict);
        }
        Ok(())
    }

    async fn delete(&self, credential_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM passkey_credentials WHERE credential_id = $1")
            .bind(credential_id)
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
