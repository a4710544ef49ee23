//! OAuth2 authorization repository (`oauth2_authorization` table).

use crate::error::{RepositoryError, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Row mapping for `oauth2_authorization`.
///
/// One row per authorization; holds the full token family (authorization
/// code, access, refresh, id, user, device tokens) as nullable columns —
/// most grants only populate a subset at any given time, and access/refresh
/// tokens are looked up by the SHA-256 hash of their value, never the raw
/// value, so a leaked row dump can't be replayed directly.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OAuth2AuthorizationRow {
    pub id: Uuid,
    pub registered_client_id: Uuid,
    pub principal_name: String,
    pub grant_type: String,
    pub authorization_code_hash: Option<String>,
    pub authorization_code_expires_at: Option<DateTime<Utc>>,
    pub access_token_hash: Option<String>,
    pub access_token_issued_at: Option<DateTime<Utc>>,
    pub access_token_expires_at: Option<DateTime<Utc>>,
    pub access_token_scopes: Vec<String>,
    pub refresh_token_hash: Option<String>,
    pub refresh_token_issued_at: Option<DateTime<Utc>>,
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    /// Links every refresh token minted from the same original grant, so a
    /// reuse of a rotated-out token revokes the whole family.
    pub refresh_token_family_id: Option<Uuid>,
    pub id_token_hash: Option<String>,
    pub device_code_hash: Option<String>,
    pub user_code: Option<String>,
    pub attributes: serde_json::Value,
}

/// Repository port over OAuth2 authorization rows.
pub trait OAuth2AuthorizationRepository: Send + Sync {
    /// Find by id.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] or a database error.
    async fn find_by_id(&self, id: Uuid) -> Result<OAuth2AuthorizationRow>;

    /// Find by the hash of an authorization code.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] or a database error.
    async fn find_by_authorization_code_hash(
        &self,
        hash: &str,
    ) -> Result<OAuth2AuthorizationRow>;

    /// Find by the hash of an access token.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] or a database error.
    async fn find_by_access_token_hash(&self, hash: &str) -> Result<OAuth2AuthorizationRow>;

    /// Find by the hash of a refresh token.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] or a database error.
    async fn find_by_refresh_token_hash(&self, hash: &str) -> Result<OAuth2AuthorizationRow>;

    /// Find a pending device-authorization grant by its user-facing code.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] or a database error.
    async fn find_by_user_code(&self, user_code: &str) -> Result<OAuth2AuthorizationRow>;

    /// Every still-live authorization sharing `family_id`, used to revoke a
    /// whole refresh-token family on reuse detection.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    async fn find_by_refresh_token_family(
        &self,
        family_id: Uuid,
    ) -> Result<Vec<OAuth2AuthorizationRow>>;

    /// Insert a new authorization row.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    async fn create(&self, authorization: &OAuth2AuthorizationRow) -> Result<OAuth2AuthorizationRow>;

    /// Replace the token family in place (used on refresh rotation).
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] or a database error.
    async fn update(&self, authorization: &OAuth2AuthorizationRow) -> Result<OAuth2AuthorizationRow>;

    /// Delete on revoke or expiry sweep.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Delete every row sharing `family_id` (reuse-detected family revocation).
    ///
    /// # Errors
    ///
    /// Returns a database error.
    async fn delete_family(&self, family_id: Uuid) -> Result<()>;
}

/// `sqlx`-backed [`OAuth2AuthorizationRepository`].
#[derive(Clone)]
pub struct PgOAuth2AuthorizationRepository {
    pool: PgPool,
}

impl PgOAuth2AuthorizationRepository {
    /// Build a repository over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl OAuth2AuthorizationRepository for PgOAuth2AuthorizationRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<OAuth2AuthorizationRow> {
        sqlx::query_as::<_, OAuth2AuthorizationRow>(
            "SELECT * FROM oauth2_authorization WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?
        .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_authorization_code_hash(
        &self,
        hash: &str,
    ) -> Result<OAuth2AuthorizationRow> {
        sqlx::query_as::<_, OAuth2AuthorizationRow>(
            "SELECT * FROM oauth2_authorization WHERE authorization_code_hash = $1",
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?
        .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_access_token_hash(&self, hash: &str) -> Result<OAuth2AuthorizationRow> {
        sqlx::query_as::<_, OAuth2AuthorizationRow>(
            "SELECT * FROM oauth2_authorization WHERE access_token_hash = $1",
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?
        .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_refresh_token_hash(&self, hash: &str) -> Result<OAuth2AuthorizationRow> {
        sqlx::query_as::<_, OAuth2AuthorizationRow>(
            "SELECT * FROM oauth2_authorization WHERE refresh_token_hash = $1",
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?
        .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_refresh_token_family(
        &self,
        family_id: Uuid,
    ) -> Result<Vec<OAuth2AuthorizationRow>> {
        sqlx::query_as::<_, OAuth2AuthorizationRow>(
            "SELECT * FROM oauth2_authorization WHERE refresh_token_family_id = $1",
        )
        .bind(family_id)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)
    }

    async fn find_by_user_code(&self, user_code: &str) -> Result<OAuth2AuthorizationRow> {
        sqlx::query_as::<_, OAuth2AuthorizationRow>(
            "SELECT * FROM oauth2_authorization WHERE user_code = $1",
        )
        .bind(user_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?
        .ok_or(RepositoryError::NotFound)
    }

    async fn create(&self, authorization: &OAuth2AuthorizationRow) -> Result<OAuth2AuthorizationRow> {
        sqlx::query_as::<_, OAuth2AuthorizationRow>(
            r"
            INSERT INTO oauth2_authorization (
                id, registered_client_id, principal_name, grant_type,
                authorization_code_hash, authorization_code_expires_at,
                access_token_hash, access_token_issued_at, access_token_expires_at,
                access_token_scopes, refresh_token_hash, refresh_token_issued_at,
                refresh_token_expires_at, refresh_token_family_id, id_token_hash,
                device_code_hash, user_code, attributes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING *
            ",
        )
        .bind(authorization.id)
        .bind(authorization.registered_client_id)
        .bind(&authorization.principal_name)
        .bind(&authorization.grant_type)
        .bind(&authorization.authorization_code_hash)
        .bind(authorization.authorization_code_expires_at)
        .bind(&authorization.access_token_hash)
        .bind(authorization.access_token_issued_at)
        .bind(authorization.access_token_expires_at)
        .bind(&authorization.access_token_scopes)
        .bind(&authorization.refresh_token_hash)
        .bind(authorization.refresh_token_issued_at)
        .bind(authorization.refresh_token_expires_at)
        .bind(authorization.refresh_token_family_id)
        .bind(&authorization.id_token_hash)
        .bind(&authorization.device_code_hash)
        .bind(&authorization.user_code)
        .bind(&authorization.attributes)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)
    }

    async fn update(&self, authorization: &OAuth2AuthorizationRow) -> Result<OAuth2AuthorizationRow> {
        sqlx::query_as::<_, OAuth2AuthorizationRow>(
            r"
            UPDATE oauth2_authorization SET
                authorization_code_hash = $1, authorization_code_expires_at = $2,
                access_token_hash = $3, access_token_issued_at = $4,
                access_token_expires_at = $5, access_token_scopes = $6,
                refresh_token_hash = $7, refresh_token_issued_at = $8,
                refresh_token_expires_at = $9, refresh_token_family_id = $10,
                id_token_hash = $11, attributes = $12
            WHERE id = $13
            RETURNING *
            ",
        )
        .bind(&authorization.authorization_code_hash)
        .bind(authorization.authorization_code_expires_at)
        .bind(&authorization.access_token_hash)
        .bind(authorization.access_token_issued_at)
        .bind(authorization.access_token_expires_at)
        .bind(&authorization.access_token_scopes)
        .bind(&authorization.refresh_token_hash)
        .bind(authorization.refresh_token_issued_at)
        .bind(authorization.refresh_token_expires_at)
        .bind(authorization.refresh_token_family_id)
        .bind(&authorization.id_token_hash)
        .bind(&authorization.attributes)
        .bind(authorization.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?
        .ok_or(RepositoryError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM oauth2_authorization WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from_sqlx)?;
        Ok(())
    }

    async fn delete_family(&self, family_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM oauth2_authorization WHERE refresh_token_family_id = $1")
            .bind(family_id)
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from_sqlx)?;
        Ok(())
    }
}
