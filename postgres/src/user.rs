//! User repository (`users` table).

use crate::error::{RepositoryError, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Row mapping for the `users` table.
///
/// Email and recovery email are stored as ciphertext beside a blind-index
/// column (`email_blind_index`/`recovery_email_blind_index`) so equality
/// lookups never need to decrypt every row; `aegis-auth` owns the blind-index
/// computation and the encrypt/decrypt of the ciphertext columns, this row
/// just carries the bytes.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub external_id: String,
    pub auth_server_subject_id: Option<String>,
    pub given_name: Option<String>,
    pub middle_name: Option<String>,
    pub surname: Option<String>,
    pub nickname: Option<String>,
    pub email_ciphertext: Option<Vec<u8>>,
    pub email_blind_index: Option<String>,
    pub recovery_email_ciphertext: Option<Vec<u8>>,
    pub recovery_email_blind_index: Option<String>,
    pub phone: Option<String>,
    pub hashed_password: Option<String>,
    pub email_verified: bool,
    pub profile_picture_url: Option<String>,
    pub enabled: bool,
    pub account_non_expired: bool,
    pub credentials_non_expired: bool,
    pub account_non_locked: bool,
    pub failed_login_attempts: i32,
    pub lockout_expiration_time: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_password_change_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub last_modified_by: Option<String>,
    pub version: i64,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Repository port over the `users` aggregate.
///
/// Lookups never return soft-deleted rows; callers that need a deleted user
/// (audit trails, cascade sweeps) go through [`UserRepository::find_by_id_including_deleted`].
pub trait UserRepository: Send + Sync {
    /// Find an active user by internal id.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if no active user has this id,
    /// or a database error.
    async fn find_by_id(&self, id: Uuid) -> Result<UserRow>;

    /// Find a user by internal id regardless of soft-delete state.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] or a database error.
    async fn find_by_id_including_deleted(&self, id: Uuid) -> Result<UserRow>;

    /// Find an active user by blind index over the primary email.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] or a database error. Callers on
    /// public surfaces must map `NotFound` to the same generic error as a
    /// wrong password, never distinguishing the two.
    async fn find_active_by_email_blind_index(&self, blind_index: &str) -> Result<UserRow>;

    /// Find an active user by federated-login subject id.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] or a database error.
    async fn find_by_auth_server_subject_id(&self, subject_id: &str) -> Result<UserRow>;

    /// Whether any active user's recovery email hashes to `blind_index`.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    async fn exists_by_recovery_email_blind_index(&self, blind_index: &str) -> Result<bool>;

    /// Insert a new user row.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Conflict`] if the email or recovery-email
    /// blind index already exists, or a database error.
    async fn create(&self, user: &UserRow) -> Result<UserRow>;

    /// Update a user row, enforcing optimistic concurrency on `version`.
    ///
    /// `user.version` must equal the version the caller originally read;
    /// the stored version is incremented by one on success.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::VersionConflict`] if the row's version has
    /// moved since it was read, or a database error.
    async fn update(&self, user: &UserRow) -> Result<UserRow>;

    /// Soft-delete a user (sets `deleted_at`), tombstoning related rows is
    /// the caller's responsibility (it spans multiple repositories).
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] or a database error.
    async fn soft_delete(&self, id: Uuid, deleted_by: &str) -> Result<()>;

    /// Atomically increment `failed_login_attempts` and, if `lock_until` is
    /// `Some`, set `account_non_locked = false` and `lockout_expiration_time`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] or a database error.
    async fn record_failed_login(
        &self,
        id: Uuid,
        lock_until: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Reset `failed_login_attempts` to zero, clear lockout, and stamp
    /// `last_login_at`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] or a database error.
    async fn record_successful_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;
}

/// `sqlx`-backed [`UserRepository`].
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Build a repository over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<UserRow> {
        sqlx::query_as::<_, UserRow>(
            "SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?
        .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_id_including_deleted(&self, id: Uuid) -> Result<UserRow> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from_sqlx)?
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_active_by_email_blind_index(&self, blind_index: &str) -> Result<UserRow> {
        sqlx::query_as::<_, UserRow>(
            "SELECT * FROM users WHERE email_blind_index = $1 AND deleted_at IS NULL",
        )
        .bind(blind_index)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?
        .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_auth_server_subject_id(&self, subject_id: &str) -> Result<UserRow> {
        sqlx::query_as::<_, UserRow>(
            "SELECT * FROM users WHERE auth_server_subject_id = $1 AND deleted_at IS NULL",
        )
        .bind(subject_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?
        .ok_or(RepositoryError::NotFound)
    }

    async fn exists_by_recovery_email_blind_index(&self, blind_index: &str) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM users WHERE recovery_email_blind_index = $1 AND deleted_at IS NULL)",
        )
        .bind(blind_index)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?;
        Ok(exists)
    }

    async fn create(&self, user: &UserRow) -> Result<UserRow> {
        sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO users (
                id, external_id, auth_server_subject_id, given_name, middle_name,
                surname, nickname, email_ciphertext, email_blind_index,
                recovery_email_ciphertext, recovery_email_blind_index, phone,
                hashed_password, email_verified, profile_picture_url, enabled,
                account_non_expired, credentials_non_expired, account_non_locked,
                failed_login_attempts, lockout_expiration_time, last_login_at,
                last_password_change_at, created_by, last_modified_by, version
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, 0
            )
            RETURNING *
            ",
        )
        .bind(user.id)
        .bind(&user.external_id)
        .bind(&user.auth_server_subject_id)
        .bind(&user.given_name)
        .bind(&user.middle_name)
        .bind(&user.surname)
        .bind(&user.nickname)
        .bind(&user.email_ciphertext)
        .bind(&user.email_blind_index)
        .bind(&user.recovery_email_ciphertext)
        .bind(&user.recovery_email_blind_index)
        .bind(&user.phone)
        .bind(&user.hashed_password)
        .bind(user.email_verified)
        .bind(&user.profile_picture_url)
        .bind(user.enabled)
        .bind(user.account_non_expired)
        .bind(user.credentials_non_expired)
        .bind(user.account_non_locked)
        .bind(user.failed_login_attempts)
        .bind(user.lockout_expiration_time)
        .bind(user.last_login_at)
        .bind(user.last_password_change_at)
        .bind(&user.created_by)
        .bind(&user.last_modified_by)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)
    }

    async fn update(&self, user: &UserRow) -> Result<UserRow> {
        sqlx::query_as::<_, UserRow>(
            r"
            UPDATE users SET
                given_name = $1, middle_name = $2, surname = $3, nickname = $4,
                email_ciphertext = $5, email_blind_index = $6,
                recovery_email_ciphertext = $7, recovery_email_blind_index = $8,
                phone = $9, hashed_password = $10, email_verified = $11,
                profile_picture_url = $12, enabled = $13, account_non_expired = $14,
                credentials_non_expired = $15, account_non_locked = $16,
                failed_login_attempts = $17, lockout_expiration_time = $18,
                last_login_at = $19, last_password_change_at = $20,
                last_modified_by = $21, updated_at = now(), version = version + 1
            WHERE id = $22 AND version = $23 AND deleted_at IS NULL
            RETURNING *
            ",
        )
        .bind(&user.given_name)
        .bind(&user.middle_name)
        .bind(&user.surname)
        .bind(&user.nickname)
        .bind(&user.email_ciphertext)
        .bind(&user.email_blind_index)
        .bind(&user.recovery_email_ciphertext)
        .bind(&user.recovery_email_blind_index)
        .bind(&user.phone)
        .bind(&user.hashed_password)
        .bind(user.email_verified)
        .bind(&user.profile_picture_url)
        .bind(user.enabled)
        .bind(user.account_non_expired)
        .bind(user.credentials_non_expired)
        .bind(user.account_non_locked)
        .bind(user.failed_login_attempts)
        .bind(user.lockout_expiration_time)
        .bind(user.last_login_at)
        .bind(user.last_password_change_at)
        .bind(&user.last_modified_by)
        .bind(user.id)
        .bind(user.version)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?
        .ok_or(RepositoryError::VersionConflict)
    }

    async fn soft_delete(&self, id: Uuid, deleted_by: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = now(), last_modified_by = $1, version = version + 1 WHERE id = $2 AND deleted_at IS NULL",
        )
        .bind(deleted_by)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn record_failed_login(
        &self,
        id: Uuid,
        lock_until: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let result = sqlx::query(
            r"
            UPDATE users SET
                failed_login_attempts = failed_login_attempts + 1,
                account_non_locked = CASE WHEN $1::timestamptz IS NOT NULL THEN false ELSE account_non_locked END,
                lockout_expiration_time = COALESCE($1, lockout_expiration_time),
                updated_at = now(),
                version = version + 1
            WHERE id = $2 AND deleted_at IS NULL
            ",
        )
        .bind(lock_until)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn record_successful_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query(
            r"
            UPDATE users SET
                failed_login_attempts = 0,
                account_non_locked = true,
                lockout_expiration_time = NULL,
                last_login_at = $1,
                updated_at = now(),
                version = version + 1
            WHERE id = $2 AND deleted_at IS NULL
            ",
        )
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
