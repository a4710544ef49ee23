//! Revoked token repository (`revoked_tokens` table).

use crate::error::{RepositoryError, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// Repository port over the revocation deny-list.
///
/// Entries are keyed by token hash, not value, for the same reason as
/// [`crate::oauth_authorization::OAuth2AuthorizationRow`]'s token columns —
/// the table only needs to answer "has this token been revoked", never to
/// reconstruct the token itself. Rows are pruned once `expires_at` passes,
/// since a token that has already naturally expired needs no deny-list entry.
pub trait RevokedTokenRepository: Send + Sync {
    /// Whether `token_hash` has been explicitly revoked.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    async fn is_revoked(&self, token_hash: &str) -> Result<bool>;

    /// Add `token_hash` to the deny-list until `expires_at`.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    async fn revoke(&self, token_hash: &str, expires_at: DateTime<Utc>) -> Result<()>;

    /// Delete deny-list entries whose `expires_at` has passed.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    async fn prune_expired(&self) -> Result<u64>;
}

/// `sqlx`-backed [`RevokedTokenRepository`].
#[derive(Clone)]
pub struct PgRevokedTokenRepository {
    pool: PgPool,
}

impl PgRevokedTokenRepository {
    /// Build a repository over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl RevokedTokenRepository for PgRevokedTokenRepository {
    async fn is_revoked(&self, token_hash: &str) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM revoked_tokens WHERE token_hash = $1 AND expires_at > now())",
        )
        .bind(token_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?;
        Ok(exists)
    }

    async fn revoke(&self, token_hash: &str, expires_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "INSERT INTO revoked_tokens (token_hash, expires_at) VALUES ($1, $2) ON CONFLICT (token_hash) DO NOTHING",
        )
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?;
        Ok(())
    }

    async fn prune_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= now()")
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from_sqlx)?;
        Ok(result.rows_affected())
    }
}
