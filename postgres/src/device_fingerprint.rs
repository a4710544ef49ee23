//! Device fingerprint repository (`user_device_fingerprint` table).

use crate::error::{RepositoryError, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Row mapping for `user_device_fingerprint`.
///
/// At most one active row per `(user_id, fingerprint_hash)`; deactivation is
/// soft (`active = false`), never a delete, so the risk engine can still see
/// a device's history when scoring a later attempt from it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DeviceFingerprintRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub fingerprint_hash: String,
    pub first_seen: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub active: bool,
    pub trusted: bool,
    pub failed_attempts: i32,
    pub device_name: Option<String>,
    pub last_known_ip: Option<String>,
    pub last_known_country: Option<String>,
    pub browser_info: Option<String>,
    pub source: String,
}

/// Repository port over device fingerprints.
pub trait DeviceFingerprintRepository: Send + Sync {
    /// Find the active fingerprint row for `(user_id, fingerprint_hash)`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] or a database error.
    async fn find_active(
        &self,
        user_id: Uuid,
        fingerprint_hash: &str,
    ) -> Result<DeviceFingerprintRow>;

    /// List every active fingerprint for a user.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    async fn list_active_for_user(&self, user_id: Uuid) -> Result<Vec<DeviceFingerprintRow>>;

    /// Insert a new fingerprint, or touch `last_used_at`/`last_known_ip` if
    /// an active row for the same `(user_id, fingerprint_hash)` exists.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    async fn upsert(&self, fingerprint: &DeviceFingerprintRow) -> Result<DeviceFingerprintRow>;

    /// Mark a device no longer trusted for future logins.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] or a database error.
    async fn deactivate(&self, id: Uuid) -> Result<()>;
}

/// `sqlx`-backed [`DeviceFingerprintRepository`].
#[derive(Clone)]
pub struct PgDeviceFingerprintRepository {
    pool: PgPool,
}

impl PgDeviceFingerprintRepository {
    /// Build a repository over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DeviceFingerprintRepository for PgDeviceFingerprintRepository {
    async fn find_active(
        &self,
        user_id: Uuid,
        fingerprint_hash: &str,
    ) -> Result<DeviceFingerprintRow> {
        sqlx::query_as::<_, DeviceFingerprintRow>(
            "SELECT * FROM user_device_fingerprint WHERE user_id = $1 AND fingerprint_hash = $2 AND active = true",
        )
        .bind(user_id)
        .bind(fingerprint_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?
        .ok_or(RepositoryError::NotFound)
    }

    async fn list_active_for_user(&self, user_id: Uuid) -> Result<Vec<DeviceFingerprintRow>> {
        sqlx::query_as::<_, DeviceFingerprintRow>(
            "SELECT * FROM user_device_fingerprint WHERE user_id = $1 AND active = true ORDER BY last_used_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)
    }

    async fn upsert(&self, fingerprint: &DeviceFingerprintRow) -> Result<DeviceFingerprintRow> {
        sqlx::query_as::<_, DeviceFingerprintRow>(
            r"
            INSERT INTO user_device_fingerprint (
                id, user_id, fingerprint_hash, first_seen, last_used_at, active,
                trusted, failed_attempts, device_name, last_known_ip,
                last_known_country, browser_info, source
            )
            VALUES ($1, $2, $3, $4, $5, true, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (user_id, fingerprint_hash) WHERE active
            DO UPDATE SET
                last_used_at = EXCLUDED.last_used_at,
                last_known_ip = EXCLUDED.last_known_ip,
                last_known_country = EXCLUDED.last_known_country,
                browser_info = EXCLUDED.browser_info
            RETURNING *
            ",
        )
        .bind(fingerprint.id)
        .bind(fingerprint.user_id)
        .bind(&fingerprint.fingerprint_hash)
        .bind(fingerprint.first_seen)
        .bind(fingerprint.last_used_at)
        .bind(fingerprint.trusted)
        .bind(fingerprint.failed_attempts)
        .bind(&fingerprint.device_name)
        .bind(&fingerprint.last_known_ip)
        .bind(&fingerprint.last_known_country)
        .bind(&fingerprint.browser_info)
        .bind(&fingerprint.source)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)
    }

    async fn deactivate(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("UPDATE user_device_fingerprint SET active = false WHERE id = $1")
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
