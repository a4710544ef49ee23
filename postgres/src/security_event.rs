//! Security event repository (`security_events` table).

use crate::error::{RepositoryError, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Row mapping for `security_events`.
///
/// Write-only from the risk engine's and account manager's perspective —
/// reads are for admin audit surfaces only, so this repository exposes no
/// update or delete operation.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SecurityEventRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub event_type: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub details: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

/// Repository port over the security/audit event log.
pub trait SecurityEventRepository: Send + Sync {
    /// Append a new event.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    async fn record(&self, event: &SecurityEventRow) -> Result<()>;

    /// The most recent events for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    async fn recent_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<SecurityEventRow>>;
}

/// `sqlx`-backed [`SecurityEventRepository`].
#[derive(Clone)]
pub struct PgSecurityEventRepository {
    pool: PgPool,
}

impl PgSecurityEventRepository {
    /// Build a repository over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl SecurityEventRepository for PgSecurityEventRepository {
    async fn record(&self, event: &SecurityEventRow) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO security_events (id, user_id, event_type, ip, user_agent, details, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(event.id)
        .bind(event.user_id)
        .bind(&event.event_type)
        .bind(&event.ip)
        .bind(&event.user_agent)
        .bind(&event.details)
        .bind(event.occurred_at)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?;
        Ok(())
    }

    async fn recent_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<SecurityEventRow>> {
        sqlx::query_as::<_, SecurityEventRow>(
            "SELECT * FROM security_events WHERE user_id = $1 ORDER BY occurred_at DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)
    }
}
