//! Per-region cache configuration.

use std::time::Duration;

/// A cache region name.
///
/// Each region gets its own TTL and its own circuit breaker, so a
/// distributed-cache outage affecting one region (say, `geo-location`)
/// cannot mask failures in another (say, `tokens`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheRegion {
    /// User aggregates (C2 hot-read front).
    Users,
    /// Role hierarchy and permission sets.
    Roles,
    /// ASN reputation entries.
    Asn,
    /// Token introspection results.
    Tokens,
    /// IP blocklist/whitelist membership.
    IpBlock,
    /// Single-point geo-IP lookups.
    GeoLocation,
    /// Per-user login-location history used for impossible-travel checks.
    GeoHistory,
}

impl CacheRegion {
    /// The region's namespace prefix for distributed-cache keys.
    #[must_use]
    pub const fn key_prefix(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Roles => "roles",
            Self::Asn => "asn",
            Self::Tokens => "tokens",
            Self::IpBlock => "ip-block",
            Self::GeoLocation => "geo-location",
            Self::GeoHistory => "geo-history",
        }
    }

    /// Default TTL for this region.
    ///
    /// ASN and geo-location data changes rarely, so it gets a long TTL.
    /// Tokens and IP blocklist entries must be revoked promptly, so they
    /// get a short one.
    #[must_use]
    pub const fn default_ttl(self) -> Duration {
        match self {
            Self::Users | Self::Roles => Duration::from_secs(300),
            Self::Asn | Self::GeoLocation => Duration::from_secs(3600 * 24),
            Self::Tokens | Self::IpBlock => Duration::from_secs(30),
            Self::GeoHistory => Duration::from_secs(3600),
        }
    }
}

/// Configuration for a [`crate::ResilientCache`] instance.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Region this cache instance serves.
    pub region: CacheRegion,
    /// TTL applied to both tiers. Defaults to `region.default_ttl()`.
    pub ttl: Duration,
    /// Maximum number of entries held in the in-process tier. The
    /// in-process tier is a warm backup, not a primary store, so a small
    /// bound (relative to process heap) is appropriate.
    pub local_max_entries: usize,
    /// Consecutive distributed-cache failures before the breaker opens.
    pub failure_threshold: u32,
    /// How long the breaker stays open before probing again.
    pub breaker_cooldown: Duration,
    /// Timeout applied to each distributed-cache round trip (spec default: 2s).
    pub operation_timeout: Duration,
}

impl CacheConfig {
    /// Build a config for `region` using its documented TTL default.
    #[must_use]
    pub fn for_region(region: CacheRegion) -> Self {
        Self {
            region,
            ttl: region.default_ttl(),
            local_max_entries: 10_000,
            failure_threshold: 5,
            breaker_cooldown: Duration::from_secs(30),
            operation_timeout: Duration::from_secs(2),
        }
    }

    /// Override the TTL.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Override the in-process entry bound.
    #[must_use]
    pub const fn with_local_max_entries(mut self, max_entries: usize) -> Self {
        self.local_max_entries = max_entries;
        self
    }
}
