//! OAuth2 consent repository (`oauth2_authorization_consent` table).

use crate::error::{RepositoryError, Result};
use sqlx::PgPool;
use uuid::Uuid;

/// Row mapping for `oauth2_authorization_consent`.
///
/// Primary key is `(registered_client_id, principal_name)`; `authorities`
/// is a space-delimited scope list, matching the teacher's OAuth2 scope
/// representation rather than a normalized join table, since consent is
/// always read and written as a whole per (client, user) pair.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConsentRow {
    pub registered_client_id: Uuid,
    pub principal_name: String,
    pub authorities: String,
}

/// Repository port over standing user consent.
pub trait ConsentRepository: Send + Sync {
    /// Find standing consent for a (client, user) pair.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] or a database error.
    async fn find(&self, client_id: Uuid, principal_name: &str) -> Result<ConsentRow>;

    /// Insert or replace consent for a (client, user) pair.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    async fn upsert(&self, consent: &ConsentRow) -> Result<()>;

    /// Withdraw consent for a (client, user) pair.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    async fn delete(&self, client_id: Uuid, principal_name: &str) -> Result<()>;
}

/// `sqlx`-backed [`ConsentRepository`].
#[derive(Clone)]
pub struct PgConsentRepository {
    pool: PgPool,
}

impl PgConsentRepository {
    /// Build a repository over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ConsentRepository for PgConsentRepository {
    async fn find(&self, client_id: Uuid, principal_name: &str) -> Result<ConsentRow> {
        sqlx::query_as::<_, ConsentRow>(
            "SELECT * FROM oauth2_authorization_consent WHERE registered_client_id = $1 AND principal_name = $2",
        )
        .bind(client_id)
        .bind(principal_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?
        .ok_or(RepositoryError::NotFound)
    }

    async fn upsert(&self, consent: &ConsentRow) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO oauth2_authorization_consent (registered_client_id, principal_name, authorities)
            VALUES ($1, $2, $3)
            ON CONFLICT (registered_client_id, principal_name)
            DO UPDATE SET authorities = EXCLUDED.authorities
            ",
        )
        .bind(consent.registered_client_id)
        .bind(&consent.principal_name)
        .bind(&consent.authorities)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?;
        Ok(())
    }

    async fn delete(&self, client_id: Uuid, principal_name: &str) -> Result<()> {
        sqlx::query(
            "DELETE FROM oauth2_authorization_consent WHERE registered_client_id = $1 AND principal_name = $2",
        )
        .bind(client_id)
        .bind(principal_name)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?;
        Ok(())
    }
}
