//! IP/ASN reputation repository (`ip_blocklist`, `ip_whitelist`,
//! `ip_metadata`, `asn_entries` tables).

use crate::error::{RepositoryError, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::net::IpAddr;

/// Row mapping for `asn_entries`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AsnEntryRow {
    pub asn: i64,
    pub organization: Option<String>,
    pub is_vpn: bool,
    pub is_hosting: bool,
    pub reputation_score: i32,
}

/// Row mapping for `ip_metadata`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IpMetadataRow {
    pub ip: String,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub asn: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

/// Repository port over IP/ASN reputation and geo-history.
pub trait IpIntelRepository: Send + Sync {
    /// Whether `ip` is on the blocklist.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    async fn is_blocklisted(&self, ip: IpAddr) -> Result<bool>;

    /// Whether `ip` is on the allow-list (bypasses risk scoring entirely).
    ///
    /// # Errors
    ///
    /// Returns a database error.
    async fn is_whitelisted(&self, ip: IpAddr) -> Result<bool>;

    /// Look up ASN reputation.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] or a database error.
    async fn find_asn_entry(&self, asn: i64) -> Result<AsnEntryRow>;

    /// Cached geo-IP metadata for `ip`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] or a database error.
    async fn find_ip_metadata(&self, ip: IpAddr) -> Result<IpMetadataRow>;

    /// Upsert geo-IP metadata after an external lookup.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    async fn upsert_ip_metadata(&self, metadata: &IpMetadataRow) -> Result<()>;

    /// Record a login's coordinates in the user's geo-history, used for
    /// impossible-travel scoring.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    async fn record_login_location(
        &self,
        user_id: uuid::Uuid,
        latitude: f64,
        longitude: f64,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// The user's most recent login location before `before`, if any.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    async fn last_login_location(
        &self,
        user_id: uuid::Uuid,
        before: DateTime<Utc>,
    ) -> Result<Option<(f64, f64, DateTime<Utc>)>>;
}

/// `sqlx`-backed [`IpIntelRepository`].
#[derive(Clone)]
pub struct PgIpIntelRepository {
    pool: PgPool,
}

impl PgIpIntelRepository {
    /// Build a repository over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl IpIntelRepository for PgIpIntelRepository {
    async fn is_blocklisted(&self, ip: IpAddr) -> Result<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM ip_blocklist WHERE ip = $1::inet)")
                .bind(ip.to_string())
                .fetch_one(&self.pool)
                .await
                .map_err(RepositoryError::from_sqlx)?;
        Ok(exists)
    }

    async fn is_whitelisted(&self, ip: IpAddr) -> Result<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM ip_whitelist WHERE ip = $1::inet)")
                .bind(ip.to_string())
                .fetch_one(&self.pool)
                .await
                .map_err(RepositoryError::from_sqlx)?;
        Ok(exists)
    }

    async fn find_asn_entry(&self, asn: i64) -> Result<AsnEntryRow> {
        sqlx::query_as::<_, AsnEntryRow>("SELECT * FROM asn_entries WHERE asn = $1")
            .bind(asn)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from_sqlx)?
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_ip_metadata(&self, ip: IpAddr) -> Result<IpMetadataRow> {
        sqlx::query_as::<_, IpMetadataRow>("SELECT * FROM ip_metadata WHERE ip = $1::inet")
            .bind(ip.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from_sqlx)?
            .ok_or(RepositoryError::NotFound)
    }

    async fn upsert_ip_metadata(&self, metadata: &IpMetadataRow) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO ip_metadata (ip, country, latitude, longitude, asn, updated_at)
            VALUES ($1::inet, $2, $3, $4, $5, now())
            ON CONFLICT (ip) DO UPDATE SET
                country = EXCLUDED.country, latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude, asn = EXCLUDED.asn, updated_at = now()
            ",
        )
        .bind(&metadata.ip)
        .bind(&metadata.country)
        .bind(metadata.latitude)
        .bind(metadata.longitude)
        .bind(metadata.asn)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?;
        Ok(())
    }

    async fn record_login_location(
        &self,
        user_id: uuid::Uuid,
        latitude: f64,
        longitude: f64,
        at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO ip_metadata_history (user_id, latitude, longitude, logged_in_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(latitude)
        .bind(longitude)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)?;
        Ok(())
    }

    async fn last_login_location(
        &self,
        user_id: uuid::Uuid,
        before: DateTime<Utc>,
    ) -> Result<Option<(f64, f64, DateTime<Utc>)>> {
        sqlx::query_as(
            r"
            SELECT latitude, longitude, logged_in_at FROM ip_metadata_history
            WHERE user_id = $1 AND logged_in_at < $2
            ORDER BY logged_in_at DESC
            LIMIT 1
            ",
        )
        .bind(user_id)
        .bind(before)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from_sqlx)
    }
}
