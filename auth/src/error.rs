//! Error types for authentication and authorization operations.

use thiserror::Error;

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Comprehensive error taxonomy for authentication and authorization.
///
/// This enum covers all possible failure modes in the auth system,
/// organized by category for clear error handling and user feedback.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Authentication Errors
    // ═══════════════════════════════════════════════════════════

    /// Invalid credentials provided.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Passkey not found for this device.
    #[error("Passkey not found")]
    PasskeyNotFound,

    /// Passkey verification failed.
    #[error("Passkey verification failed: {reason}")]
    PasskeyVerificationFailed {
        /// Reason for failure
        reason: String
    },

    /// OAuth authorization code is invalid.
    #[error("Invalid OAuth authorization code")]
    OAuthCodeInvalid,

    /// OAuth state parameter is invalid (CSRF protection).
    #[error("Invalid OAuth state parameter")]
    OAuthStateInvalid,

    /// Federated login resolved to an email already owned by a different
    /// local account with no linked subject.
    #[error("Account with email {email} already exists under a different identity")]
    FederatedAccountConflict {
        /// Conflicting email address.
        email: String,
    },

    /// Passkey signature counter did not advance past the stored value.
    ///
    /// Signals a cloned authenticator or a replayed assertion.
    #[error("Passkey signature counter did not advance")]
    SignatureCounterRegression,

    // ═══════════════════════════════════════════════════════════
    // Authorization Errors
    // ═══════════════════════════════════════════════════════════

    /// Caller is not authenticated.
    #[error("Authentication required")]
    Unauthenticated,

    /// Caller is authenticated but lacks required permissions.
    #[error("Insufficient permissions: {required}")]
    InsufficientPermissions {
        /// Required permission that was missing
        required: String
    },

    /// Requested resource not found.
    #[error("Resource not found")]
    ResourceNotFound,

    /// A uniqueness or referential constraint was violated.
    #[error("Conflict: {constraint}")]
    Conflict {
        /// Name of the violated constraint (e.g. `"email_unique"`).
        constraint: String,
    },

    /// Caller-supplied argument failed validation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ═══════════════════════════════════════════════════════════
    // Session Errors
    // ═══════════════════════════════════════════════════════════

    /// Session has expired.
    #[error("Session has expired")]
    SessionExpired,

    /// Session not found.
    #[error("Session not found")]
    SessionNotFound,

    /// Session has been revoked.
    #[error("Session has been revoked")]
    SessionRevoked,

    /// Refresh token is invalid.
    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    // ═══════════════════════════════════════════════════════════
    // Rate Limiting
    // ═══════════════════════════════════════════════════════════

    /// Too many authentication attempts.
    #[error("Too many attempts, please retry after {retry_after:?}")]
    TooManyAttempts {
        /// Duration to wait before retrying
        retry_after: std::time::Duration
    },

    /// Account is locked out following repeated failed login attempts.
    #[error("Account locked, retry after {retry_after:?}")]
    Locked {
        /// Duration until the lockout auto-releases.
        retry_after: std::time::Duration,
    },

    /// A write lost an optimistic-concurrency race (`version` mismatch).
    #[error("Optimistic concurrency conflict")]
    OptimisticConflict,

    // ═══════════════════════════════════════════════════════════
    // WebAuthn Specific
    // ═══════════════════════════════════════════════════════════

    /// WebAuthn challenge has expired.
    #[error("WebAuthn challenge has expired")]
    ChallengeExpired,

    /// WebAuthn challenge not found.
    #[error("WebAuthn challenge not found")]
    ChallengeNotFound,

    /// WebAuthn origin mismatch (phishing protection).
    #[error("WebAuthn origin mismatch")]
    OriginMismatch,

    /// WebAuthn RP ID mismatch.
    #[error("WebAuthn RP ID mismatch")]
    RpIdMismatch,

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Email delivery failed.
    #[error("Failed to send email")]
    EmailDeliveryFailed,

    /// A dependency outside our control failed (geo-IP lookup, CAPTCHA
    /// verification, breach-corpus check). Callers typically fail open.
    #[error("External dependency failed: {0}")]
    External(String),

    /// Internal server error (should not be exposed to users).
    #[error("Internal error")]
    InternalError,
}

impl AuthError {
    /// Returns `true` if this error is due to invalid user input.
    ///
    /// # Examples
    ///
    /// ```
    /// # use aegis_auth::AuthError;
    /// assert!(AuthError::InvalidCredentials.is_user_error());
    /// assert!(!AuthError::InternalError.is_user_error());
    /// ```
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials
                | Self::OAuthCodeInvalid
                | Self::OAuthStateInvalid
                | Self::InsufficientPermissions { .. }
                | Self::InvalidArgument(_)
                | Self::Conflict { .. }
        )
    }

    /// Returns `true` if this error indicates a security issue.
    ///
    /// # Examples
    ///
    /// ```
    /// # use aegis_auth::AuthError;
    /// assert!(AuthError::OriginMismatch.is_security_issue());
    /// assert!(!AuthError::SessionExpired.is_security_issue());
    /// ```
    pub const fn is_security_issue(&self) -> bool {
        matches!(
            self,
            Self::OriginMismatch
                | Self::RpIdMismatch
                | Self::OAuthStateInvalid
                | Self::TooManyAttempts { .. }
                | Self::SignatureCounterRegression
                | Self::FederatedAccountConflict { .. }
        )
    }
}

impl From<aegis_postgres::RepositoryError> for AuthError {
    fn from(err: aegis_postgres::RepositoryError) -> Self {
        match err {
            aegis_postgres::RepositoryError::NotFound => Self::ResourceNotFound,
            aegis_postgres::RepositoryError::Conflict { constraint } => {
                Self::Conflict { constraint }
            }
            aegis_postgres::RepositoryError::VersionConflict => Self::OptimisticConflict,
            other => Self::DatabaseError(other.to_string()),
        }
    }
}
