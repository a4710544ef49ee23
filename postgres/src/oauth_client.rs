//! OAuth2 registered client repository (`oauth2_registered_client` table).

use crate::error::{RepositoryError, Result};
use sqlx::PgPool;
use uuid::Uuid;

/// Row mapping for `oauth2_registered_client` and its element-collections
/// (`oauth2_client_authentication_methods`, `oauth2_authorization_grant_types`,
/// `oauth2_redirect_uris`, `oauth2_post_logout_redirect_uris`,
/// `oauth2_client_scopes`), flattened: the collections are stored as Postgres
/// arrays rather than join tables, since they are small, client-owned, and
/// never queried independent of their client.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OAuth2ClientRow {
    pub id: Uuid,
    pub client_id: String,
    pub client_secret_hash: Option<String>,
    pub client_secret_expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub client_name: String,
    pub authentication_methods: Vec<String>,
    pub grant_types: Vec<String>,
    pub redirect_uris: Vec<String>,
    pub post_logout_redirect_uris: Vec<String>,
    pub scopes: Vec<String>,
    pub client_settings: serde_json::Value,
    pub token_settings: serde_json::Value,
    pub version: i64,
}

/// Repository port over registered OAuth2 clients.
pub trait OAuth2ClientRepository: Send + Sync {
    /// Find a client by its public `client_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] or a database error.
    async fn find_by_client_id(&self, client_id: &str) -> Result<OAuth2ClientRow>;

    /// Register a new client.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Conflict`] if `client_id` is already
    /// registered, or a database error.
    async fn create(&self, client: &OAuth2ClientRow) -> Result<OAuth2ClientRow>;

    /// Update a client's settings, enforcing optimistic concurrency.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::VersionConflict`] or a database error.
    async fn update(&self, client: &OAuth2ClientRow) -> Result<OAuth2ClientRow>;
}

/// `sqlx`-backed [`OAuth2ClientRepository`].
#[derive(Clone)]
pub struct PgOAuth2ClientRepository {
    pool: PgPool,
}

impl PgOAuth2ClientRepository {
    /// Build a repository over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl OAuth2ClientRepository for PgOAuth2ClientRepository {
    async fn find_by_client_id(&self, client_id: &str) -> Result<OAuth2ClientRow> {
        sqlx::query_as::<_, OAuth2ClientRow>(
            "SELECT * FROM oauth2_registered_client WHERE client_id = $1",
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?
        .ok_or(RepositoryError::NotFound)
    }

    async fn create(&self, client: &OAuth2ClientRow) -> Result<OAuth2ClientRow> {
        sqlx::query_as::<_, OAuth2ClientRow>(
            r"
            INSERT INTO oauth2_registered_client (
                id, client_id, client_secret_hash, client_secret_expires_at,
                client_name, authentication_methods, grant_types, redirect_uris,
                post_logout_redirect_uris, scopes, client_settings, token_settings,
                version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 0)
            RETURNING *
            ",
        )
        .bind(client.id)
        .bind(&client.client_id)
        .bind(&client.client_secret_hash)
        .bind(client.client_secret_expires_at)
        .bind(&client.client_name)
        .bind(&client.authentication_methods)
        .bind(&client.grant_types)
        .bind(&client.redirect_uris)
        .bind(&client.post_logout_redirect_uris)
        .bind(&client.scopes)
        .bind(&client.client_settings)
        .bind(&client.token_settings)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)
    }

    async fn update(&self, client: &OAuth2ClientRow) -> Result<OAuth2ClientRow> {
        sqlx::query_as::<_, OAuth2ClientRow>(
            r"
            UPDATE oauth2_registered_client SET
                client_name = $1, authentication_methods = $2, grant_types = $3,
                redirect_uris = $4, post_logout_redirect_uris = $5, scopes = $6,
                client_settings = $7, token_settings = $8, version = version + 1
            WHERE id = $9 AND version = $10
            RETURNING *
            ",
        )
        .bind(&client.client_name)
        .bind(&client.authentication_methods)
        .bind(&client.grant_types)
        .bind(&client.redirect_uris)
        .bind(&client.post_logout_redirect_uris)
        .bind(&client.scopes)
        .bind(&client.client_settings)
        .bind(&client.token_settings)
        .bind(client.id)
        .bind(client.version)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?
        .ok_or(RepositoryError::VersionConflict)
    }
}
