//! PostgreSQL repository implementations for the Aegis identity server.
//!
//! This crate is the C2 component: one trait per aggregate plus a
//! `sqlx`-backed implementation, following the repository-port pattern —
//! callers (the account manager, authentication coordinator, and token
//! authority in `aegis-auth`) depend on the traits, not on `sqlx` directly.
//!
//! Every mutable row carries `created_at`/`updated_at`/`created_by`/
//! `last_modified_by`/`version`; writers must pass the version they read and
//! retry on [`RepositoryError::VersionConflict`] (see `aegis-runtime`'s
//! `RetryPolicy`, which the account manager uses for exactly this).
//!
//! # Example
//!
//! ```ignore
//! use aegis_postgres::connect;
//!
//! async fn example() -> Result<(), sqlx::Error> {
//!     let pool = connect("postgres://localhost/aegis", 10).await?;
//!     let _ = pool;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod consent;
pub mod device_fingerprint;
pub mod error;
pub mod ip_intel;
pub mod oauth_authorization;
pub mod oauth_client;
pub mod passkey;
pub mod revoked_token;
pub mod role;
pub mod security_event;
pub mod user;

pub use consent::{ConsentRepository, ConsentRow, PgConsentRepository};
pub use device_fingerprint::{
    DeviceFingerprintRepository, DeviceFingerprintRow, PgDeviceFingerprintRepository,
};
pub use error::{RepositoryError, Result};
pub use ip_intel::{AsnEntryRow, IpIntelRepository, PgIpIntelRepository};
pub use oauth_authorization::{
    OAuth2AuthorizationRepository, OAuth2AuthorizationRow, PgOAuth2AuthorizationRepository,
};
pub use oauth_client::{OAuth2ClientRepository, OAuth2ClientRow, PgOAuth2ClientRepository};
pub use passkey::{PasskeyRepository, PasskeyRow, PgPasskeyRepository};
pub use revoked_token::{PgRevokedTokenRepository, RevokedTokenRepository};
pub use role::{PgRoleRepository, RoleRepository, RoleRow};
pub use security_event::{PgSecurityEventRepository, SecurityEventRepository, SecurityEventRow};
pub use user::{PgUserRepository, UserRepository, UserRow};

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Open a connection pool with the given maximum size.
///
/// # Errors
///
/// Returns an error if the pool cannot be established (bad DSN, database
/// unreachable).
pub async fn connect(database_url: &str, max_connections: u32) -> std::result::Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}
