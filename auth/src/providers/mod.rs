//! Authentication providers.
//!
//! This module defines traits for all external dependencies used by the
//! auth system. These traits enable dependency injection and make the
//! auth logic testable.
//!
//! # Architecture
//!
//! Providers are **interfaces**, not implementations. Reducers and the
//! account manager (C5) depend on these traits; `aegis-postgres` and
//! `aegis-cache` supply the concrete implementations, so the types in this
//! module model requests/responses at the provider boundary, not persisted
//! aggregates — those live as `aegis-postgres` row types.
//!
//! This enables:
//! - **Testing**: Use mocks (in-memory, deterministic)
//! - **Production**: Use real services (PostgreSQL, Redis, geo-IP, CAPTCHA)
//! - **Development**: Use instrumented versions (logging, tracing)

use crate::actions::AuthLevel;
use crate::state::{DeviceId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

pub mod oauth;
pub mod oauth_token_store;
pub mod email;
pub mod webauthn;
pub mod session;
pub mod risk;
pub mod token_store;
pub mod challenge_store;
pub mod rate_limiter;
pub mod google;

// Re-export provider traits
pub use oauth::{OAuth2Provider, OAuthTokenResponse};
pub use google::GoogleOAuthProvider;
pub use oauth_token_store::{OAuthTokenStore, OAuthTokenData};
pub use email::EmailProvider;
pub use webauthn::WebAuthnProvider;
pub use session::SessionStore;
pub use risk::RiskCalculator;
pub use token_store::{TokenStore, TokenData, TokenType};
pub use challenge_store::{ChallengeStore, ChallengeData};
pub use rate_limiter::RateLimiter;

/// Passkey credential, stripped of key material, for listing to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasskeyCredentialSummary {
    /// Credential ID (base64url).
    pub credential_id: String,

    /// Human-friendly label, if the user set one.
    pub friendly_name: Option<String>,

    /// Last successful assertion, if any.
    pub last_used_at: Option<DateTime<Utc>>,
}

/// A registered passkey credential, as needed to verify an assertion.
///
/// Device binding is not persisted — `WebAuthnProvider::verify_authentication`
/// mints a fresh [`DeviceId`] per login, the same way [`OAuth2Provider`] does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasskeyCredential {
    /// Credential ID (base64url), as returned by the authenticator.
    pub credential_id: String,

    /// Owning user.
    pub user_id: UserId,

    /// COSE public key bytes.
    pub public_key: Vec<u8>,

    /// Signature counter, to detect cloned authenticators.
    pub counter: u32,
}

/// Device fingerprint for enhanced device recognition.
///
/// This struct stores browser/device fingerprinting data collected on the client
/// side (e.g., via FingerprintJS, ClientJS, or custom fingerprinting logic).
///
/// # Purpose
///
/// - **Device Recognition**: Identify returning devices even without cookies
/// - **Risk Assessment**: Detect suspicious device changes or anomalies
/// - **Security**: Flag potential account takeover attempts
///
/// # Privacy Considerations
///
/// Fingerprinting can be privacy-invasive. Best practices:
/// - Only collect fingerprints for authenticated users (post-login)
/// - Store hashed fingerprints, not raw values
/// - Allow users to view/delete their device fingerprints
/// - Comply with GDPR/privacy regulations
///
/// # Client-Side Collection
///
/// This is a backend library - fingerprints must be collected client-side.
/// Example libraries:
/// - FingerprintJS (commercial, high accuracy)
/// - ClientJS (open source, basic)
/// - Custom canvas/WebGL/audio fingerprinting
///
/// # Fields
///
/// All fields are optional to support partial fingerprints and evolving techniques.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DeviceFingerprint {
    /// Canvas fingerprint (rendering variations).
    pub canvas: Option<String>,

    /// WebGL fingerprint (GPU/driver variations).
    pub webgl: Option<String>,

    /// Audio context fingerprint (audio processing variations).
    pub audio: Option<String>,

    /// Screen resolution (width x height).
    pub screen_resolution: Option<String>,

    /// Timezone offset from UTC (minutes).
    pub timezone_offset: Option<i32>,

    /// Browser plugins (semicolon-separated list).
    pub plugins: Option<String>,

    /// Fonts installed (comma-separated list).
    pub fonts: Option<String>,

    /// CPU architecture/cores.
    pub cpu_cores: Option<u8>,

    /// Device memory (GB).
    pub device_memory: Option<u8>,

    /// Hardware concurrency (logical processors).
    pub hardware_concurrency: Option<u8>,

    /// Color depth (bits per pixel).
    pub color_depth: Option<u8>,

    /// Platform (navigator.platform).
    pub platform: Option<String>,

    /// Language preferences (navigator.languages).
    pub languages: Option<Vec<String>>,

    /// Do Not Track setting.
    pub do_not_track: Option<bool>,

    /// Touch support (max touch points).
    pub max_touch_points: Option<u8>,

    /// Vendor (navigator.vendor).
    pub vendor: Option<String>,

    /// Renderer (WebGL renderer string).
    pub renderer: Option<String>,

    /// Additional custom fields (extensibility).
    #[serde(flatten)]
    pub custom: std::collections::HashMap<String, serde_json::Value>,
}

/// OAuth user info from provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthUserInfo {
    /// Provider user ID.
    pub provider_user_id: String,

    /// Email address.
    pub email: String,

    /// Email verified flag.
    pub email_verified: bool,

    /// Display name.
    pub name: Option<String>,

    /// Profile picture URL.
    pub picture: Option<String>,
}

/// Risk assessment result.
///
/// Uses the spec's four-level discrete scale rather than a continuous
/// score: policy (lockout, CAPTCHA, step-up) branches on `level`, and an
/// unresolvable signal (geo lookup failure, missing history) must fold into
/// `High` rather than silently passing as `Low`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Risk level.
    pub level: RiskLevel,

    /// Factors that contributed to the level.
    pub factors: Vec<RiskFactor>,

    /// Security alerts raised during assessment (e.g. impossible travel).
    pub alerts: Vec<SecurityAlert>,

    /// Recommended authentication level.
    pub recommended_auth_level: AuthLevel,
}

/// Risk level.
///
/// `Unknown` is a distinct wire value (an external lookup failed or
/// returned nothing usable) but is always treated as `High` by policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Low risk — recognized device, familiar location, no signals.
    Low,

    /// Medium risk — one mitigating signal (new device, high-risk country).
    Medium,

    /// High risk — multiple signals, or any single severe signal.
    High,

    /// Unable to resolve a risk level (geo/ASN lookup failed). Treated as `High`.
    Unknown,
}

impl RiskLevel {
    /// Folds `Unknown` into `High` for policy decisions.
    #[must_use]
    pub const fn effective(self) -> Self {
        match self {
            Self::Unknown => Self::High,
            other => other,
        }
    }
}

/// Risk factor that contributed to an assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    /// Factor name (e.g. `"new_device"`, `"vpn_asn"`, `"high_risk_country"`).
    pub name: String,

    /// Human-readable description.
    pub description: String,
}

/// A security-relevant alert raised while assessing risk, distinct from an
/// ordinary contributing factor in that it is always surfaced to audit
/// logging regardless of the resulting risk level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityAlert {
    /// Alert kind (e.g. `"impossible_travel"`).
    pub kind: String,

    /// Human-readable detail.
    pub detail: String,

    /// When the alert was raised.
    pub raised_at: DateTime<Utc>,
}

/// Login context for risk assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginContext {
    /// User ID (if known).
    pub user_id: Option<UserId>,

    /// Email address.
    pub email: String,

    /// IP address.
    pub ip_address: IpAddr,

    /// User agent.
    pub user_agent: String,

    /// Device ID (if recognized).
    pub device_id: Option<DeviceId>,

    /// Last login location as `(latitude, longitude)`, for impossible-travel
    /// detection.
    pub last_login_location: Option<(f64, f64)>,

    /// Last login timestamp.
    pub last_login_at: Option<DateTime<Utc>>,

    /// Device fingerprint (if provided by client).
    ///
    /// Used for enhanced device recognition and risk assessment.
    /// If provided, the risk calculator can:
    /// - Match against known devices for this user
    /// - Detect device changes/anomalies
    /// - Calculate fingerprint similarity scores
    pub fingerprint: Option<DeviceFingerprint>,
}
