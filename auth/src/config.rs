//! Authentication configuration.
//!
//! This module provides configuration structures for all authentication reducers.
//! Configuration values should be provided by the application, not hardcoded.

use chrono::Duration;

/// Risk engine configuration (C4).
#[derive(Debug, Clone)]
pub struct RiskConfig {
    /// Failed-login attempts (per identifier, and independently per IP)
    /// before the account is locked.
    ///
    /// Default: 5
    pub lockout_threshold: u32,

    /// How long a lockout lasts before auto-release.
    ///
    /// Default: 30 minutes
    pub lockout_duration: Duration,

    /// Implied travel speed, in km/h, above which consecutive logins for
    /// the same user are flagged as impossible travel.
    ///
    /// Default: 1000.0
    pub impossible_travel_speed_kmh: f64,

    /// ASN reputation score (0-100, lower is worse) below which an IP is
    /// treated as suspicious even absent an explicit VPN/hosting flag.
    ///
    /// Default: 20
    pub asn_reputation_threshold: i32,

    /// ISO 3166-1 alpha-2 country codes that raise risk to at least
    /// `Medium` on their own.
    pub high_risk_countries: Vec<String>,

    /// Successful, fingerprint-verified logins from a new device before it
    /// is auto-trusted.
    ///
    /// Default: 3
    pub device_trust_uv_logins: u32,
}

impl RiskConfig {
    /// Set the lockout threshold.
    #[must_use]
    pub const fn with_lockout_threshold(mut self, threshold: u32) -> Self {
        self.lockout_threshold = threshold;
        self
    }

    /// Set the lockout duration.
    #[must_use]
    pub const fn with_lockout_duration(mut self, duration: Duration) -> Self {
        self.lockout_duration = duration;
        self
    }

    /// Set the impossible-travel speed threshold.
    #[must_use]
    pub const fn with_impossible_travel_speed_kmh(mut self, speed: f64) -> Self {
        self.impossible_travel_speed_kmh = speed;
        self
    }

    /// Set the high-risk country list.
    #[must_use]
    pub fn with_high_risk_countries(mut self, countries: Vec<String>) -> Self {
        self.high_risk_countries = countries;
        self
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            lockout_threshold: 5,
            lockout_duration: Duration::minutes(30),
            impossible_travel_speed_kmh: 1000.0,
            asn_reputation_threshold: 20,
            high_risk_countries: Vec::new(),
            device_trust_uv_logins: 3,
        }
    }
}

/// `OAuth2`/`OIDC` authentication configuration.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// Base URL for `OAuth` redirect URI (e.g., "<https://app.example.com>").
    ///
    /// Redirect URI will be: `{base_url}/auth/oauth/callback`
    pub base_url: String,

    /// `CSRF` state time-to-live in minutes.
    ///
    /// Default: 5 minutes
    pub state_ttl_minutes: i64,

    /// Session duration after successful authentication.
    ///
    /// Default: 24 hours
    pub session_duration: Duration,

    /// Idle timeout - max time between activity before session expires.
    ///
    /// Default: 30 minutes
    ///
    /// # Security
    ///
    /// Sessions idle longer than this will be rejected even if not expired.
    /// This prevents session hijacking attacks where an attacker steals
    /// a session token but doesn't use it immediately.
    pub idle_timeout: Duration,

    /// Maximum concurrent sessions per user.
    ///
    /// Default: 5
    ///
    /// # Security
    ///
    /// Limits the number of active sessions per user. When exceeded, the
    /// oldest session is automatically revoked.
    pub max_concurrent_sessions: usize,

    /// Enable sliding window session refresh.
    ///
    /// Default: false
    ///
    /// # Behavior
    ///
    /// When `true`, the absolute session expiration (`expires_at`) is extended
    /// on each access, creating a sliding window. When `false`, sessions expire
    /// at a fixed time regardless of activity.
    ///
    /// # Security Considerations
    ///
    /// - ✅ **Pro**: Better UX - active users stay logged in
    /// - ⚠️  **Con**: Sessions could theoretically last forever if continuously used
    /// - ⚠️  **Con**: May conflict with compliance requirements for absolute session limits
    ///
    /// **Recommendation**: Use `false` (fixed expiration) for high-security applications,
    /// `true` for better user experience in lower-risk contexts.
    ///
    /// **Note**: The idle timeout still applies regardless of this setting.
    pub enable_sliding_session_refresh: bool,
}

impl OAuthConfig {
    /// Create new `OAuth` configuration.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL for your application (e.g., "<https://app.example.com>")
    #[must_use]
    pub const fn new(base_url: String) -> Self {
        Self {
            base_url,
            state_ttl_minutes: 5,
            session_duration: Duration::hours(24),
            idle_timeout: Duration::minutes(30),
            max_concurrent_sessions: 5,
            enable_sliding_session_refresh: false,
        }
    }

    /// Set `CSRF` state time-to-live.
    #[must_use]
    pub const fn with_state_ttl(mut self, minutes: i64) -> Self {
        self.state_ttl_minutes = minutes;
        self
    }

    /// Set session duration.
    #[must_use]
    pub const fn with_session_duration(mut self, duration: Duration) -> Self {
        self.session_duration = duration;
        self
    }

    /// Set idle timeout.
    #[must_use]
    pub const fn with_idle_timeout(mut self, duration: Duration) -> Self {
        self.idle_timeout = duration;
        self
    }

    /// Set maximum concurrent sessions.
    #[must_use]
    pub const fn with_max_concurrent_sessions(mut self, max: usize) -> Self {
        self.max_concurrent_sessions = max;
        self
    }

    /// Enable sliding window session refresh.
    ///
    /// When enabled, the absolute session expiration extends on each access.
    #[must_use]
    pub const fn with_sliding_session_refresh(mut self, enable: bool) -> Self {
        self.enable_sliding_session_refresh = enable;
        self
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            state_ttl_minutes: 5,
            session_duration: Duration::hours(24),
            idle_timeout: Duration::minutes(30),
            max_concurrent_sessions: 5,
            enable_sliding_session_refresh: false,
        }
    }
}

/// `WebAuthn`/Passkey authentication configuration.
#[derive(Debug, Clone)]
pub struct PasskeyConfig {
    /// Expected origin for `WebAuthn` (e.g., "<https://app.example.com>").
    ///
    /// Must match the origin in the client-side `WebAuthn` call.
    pub origin: String,

    /// Relying Party ID (e.g., "app.example.com").
    ///
    /// Must be a valid domain. Usually the domain portion of the origin.
    pub rp_id: String,

    /// Challenge time-to-live in minutes.
    ///
    /// Default: 5 minutes
    pub challenge_ttl_minutes: i64,

    /// Session duration after successful authentication.
    ///
    /// Default: 24 hours
    pub session_duration: Duration,

    /// Idle timeout - max time between activity before session expires.
    ///
    /// Default: 30 minutes
    ///
    /// # Security
    ///
    /// Sessions idle longer than this will be rejected even if not expired.
    /// This prevents session hijacking attacks where an attacker steals
    /// a session token but doesn't use it immediately.
    pub idle_timeout: Duration,

    /// Maximum concurrent sessions per user.
    ///
    /// Default: 5
    ///
    /// # Security
    ///
    /// Limits the number of active sessions per user. When exceeded, the
    /// oldest session is automatically revoked.
    pub max_concurrent_sessions: usize,

    /// Enable sliding window session refresh.
    ///
    /// Default: false
    ///
    /// # Behavior
    ///
    /// When `true`, the absolute session expiration (`expires_at`) is extended
    /// on each access, creating a sliding window. When `false`, sessions expire
    /// at a fixed time regardless of activity.
    ///
    /// # Security Considerations
    ///
    /// - ✅ **Pro**: Better UX - active users stay logged in
    /// - ⚠️  **Con**: Sessions could theoretically last forever if continuously used
    /// - ⚠️  **Con**: May conflict with compliance requirements for absolute session limits
    ///
    /// **Recommendation**: Use `false` (fixed expiration) for high-security applications,
    /// `true` for better user experience in lower-risk contexts.
    ///
    /// **Note**: The idle timeout still applies regardless of this setting.
    pub enable_sliding_session_refresh: bool,

    /// Rate-limit window for passkey assertion attempts, keyed by credential ID.
    ///
    /// Default: 15 minutes
    pub rate_limit_window: std::time::Duration,

    /// Maximum assertion attempts allowed within `rate_limit_window`.
    ///
    /// Default: 10
    pub rate_limit_max_attempts: u32,
}

impl PasskeyConfig {
    /// Create new Passkey configuration.
    ///
    /// # Arguments
    ///
    /// * `origin` - Expected origin (e.g., `<https://app.example.com>`)
    /// * `rp_id` - Relying Party ID (e.g., "app.example.com")
    #[must_use]
    pub const fn new(origin: String, rp_id: String) -> Self {
        Self {
            origin,
            rp_id,
            challenge_ttl_minutes: 5,
            session_duration: Duration::hours(24),
            idle_timeout: Duration::minutes(30),
            max_concurrent_sessions: 5,
            enable_sliding_session_refresh: false,
            rate_limit_window: std::time::Duration::from_secs(15 * 60),
            rate_limit_max_attempts: 10,
        }
    }

    /// Set challenge time-to-live.
    #[must_use]
    pub const fn with_challenge_ttl(mut self, minutes: i64) -> Self {
        self.challenge_ttl_minutes = minutes;
        self
    }

    /// Set session duration.
    #[must_use]
    pub const fn with_session_duration(mut self, duration: Duration) -> Self {
        self.session_duration = duration;
        self
    }

    /// Set idle timeout.
    #[must_use]
    pub const fn with_idle_timeout(mut self, duration: Duration) -> Self {
        self.idle_timeout = duration;
        self
    }

    /// Set maximum concurrent sessions.
    #[must_use]
    pub const fn with_max_concurrent_sessions(mut self, max: usize) -> Self {
        self.max_concurrent_sessions = max;
        self
    }

    /// Enable sliding window session refresh.
    ///
    /// When enabled, the absolute session expiration extends on each access.
    #[must_use]
    pub const fn with_sliding_session_refresh(mut self, enable: bool) -> Self {
        self.enable_sliding_session_refresh = enable;
        self
    }

    /// Set the rate-limit window and attempt cap.
    #[must_use]
    pub const fn with_rate_limit(mut self, window: std::time::Duration, max_attempts: u32) -> Self {
        self.rate_limit_window = window;
        self.rate_limit_max_attempts = max_attempts;
        self
    }
}

impl Default for PasskeyConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost:3000".to_string(),
            rp_id: "localhost".to_string(),
            challenge_ttl_minutes: 5,
            session_duration: Duration::hours(24),
            idle_timeout: Duration::minutes(30),
            max_concurrent_sessions: 5,
            enable_sliding_session_refresh: false,
            rate_limit_window: std::time::Duration::from_secs(15 * 60),
            rate_limit_max_attempts: 10,
        }
    }
}

/// Local email/password login configuration.
#[derive(Debug, Clone)]
pub struct LoginConfig {
    /// Session duration after successful authentication.
    ///
    /// Default: 24 hours
    pub session_duration: Duration,

    /// Idle timeout - max time between activity before session expires.
    ///
    /// Default: 30 minutes
    pub idle_timeout: Duration,

    /// Maximum concurrent sessions per user.
    ///
    /// Default: 5
    pub max_concurrent_sessions: usize,

    /// Enable sliding window session refresh.
    ///
    /// Default: false
    pub enable_sliding_session_refresh: bool,

    /// Rate-limit window for login attempts, keyed by identifier.
    ///
    /// Default: 15 minutes
    pub rate_limit_window: std::time::Duration,

    /// Maximum login attempts allowed within `rate_limit_window`.
    ///
    /// Default: 10
    pub rate_limit_max_attempts: u32,
}

impl LoginConfig {
    /// Set session duration.
    #[must_use]
    pub const fn with_session_duration(mut self, duration: Duration) -> Self {
        self.session_duration = duration;
        self
    }

    /// Set idle timeout.
    #[must_use]
    pub const fn with_idle_timeout(mut self, duration: Duration) -> Self {
        self.idle_timeout = duration;
        self
    }

    /// Set maximum concurrent sessions.
    #[must_use]
    pub const fn with_max_concurrent_sessions(mut self, max: usize) -> Self {
        self.max_concurrent_sessions = max;
        self
    }

    /// Enable sliding window session refresh.
    #[must_use]
    pub const fn with_sliding_session_refresh(mut self, enable: bool) -> Self {
        self.enable_sliding_session_refresh = enable;
        self
    }

    /// Set the rate-limit window and attempt cap.
    #[must_use]
    pub const fn with_rate_limit(mut self, window: std::time::Duration, max_attempts: u32) -> Self {
        self.rate_limit_window = window;
        self.rate_limit_max_attempts = max_attempts;
        self
    }
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            session_duration: Duration::hours(24),
            idle_timeout: Duration::minutes(30),
            max_concurrent_sessions: 5,
            enable_sliding_session_refresh: false,
            rate_limit_window: std::time::Duration::from_secs(15 * 60),
            rate_limit_max_attempts: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_config_builder() {
        let config = RiskConfig::default()
            .with_lockout_threshold(3)
            .with_impossible_travel_speed_kmh(800.0)
            .with_high_risk_countries(vec!["KP".to_string()]);

        assert_eq!(config.lockout_threshold, 3);
        assert_eq!(config.impossible_travel_speed_kmh, 800.0);
        assert_eq!(config.lockout_duration, Duration::minutes(30));
        assert_eq!(config.high_risk_countries, vec!["KP".to_string()]);
    }

    #[test]
    fn test_oauth_config_builder() {
        let config = OAuthConfig::new("https://example.com".to_string())
            .with_state_ttl(10)
            .with_session_duration(Duration::hours(12));

        assert_eq!(config.base_url, "https://example.com");
        assert_eq!(config.state_ttl_minutes, 10);
        assert_eq!(config.session_duration, Duration::hours(12));
    }

    #[test]
    fn test_passkey_config_builder() {
        let config = PasskeyConfig::new(
            "https://example.com".to_string(),
            "example.com".to_string(),
        )
        .with_challenge_ttl(3)
        .with_session_duration(Duration::hours(6));

        assert_eq!(config.origin, "https://example.com");
        assert_eq!(config.rp_id, "example.com");
        assert_eq!(config.challenge_ttl_minutes, 3);
        assert_eq!(config.session_duration, Duration::hours(6));
    }

    #[test]
    fn test_default_configs() {
        let risk = RiskConfig::default();
        assert_eq!(risk.lockout_threshold, 5);
        assert_eq!(risk.device_trust_uv_logins, 3);

        let oauth = OAuthConfig::default();
        assert_eq!(oauth.base_url, "http://localhost:3000");
        assert_eq!(oauth.state_ttl_minutes, 5);

        let passkey = PasskeyConfig::default();
        assert_eq!(passkey.origin, "http://localhost:3000");
        assert_eq!(passkey.rp_id, "localhost");
        assert_eq!(passkey.challenge_ttl_minutes, 5);

        let login = LoginConfig::default();
        assert_eq!(login.rate_limit_max_attempts, 10);
        assert_eq!(login.session_duration, Duration::hours(24));
    }

    #[test]
    fn test_login_config_builder() {
        let config = LoginConfig::default()
            .with_session_duration(Duration::hours(8))
            .with_rate_limit(std::time::Duration::from_secs(60), 5);

        assert_eq!(config.session_duration, Duration::hours(8));
        assert_eq!(config.rate_limit_max_attempts, 5);
    }
}
