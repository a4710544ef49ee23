//! Value objects and invariants shared across the account, risk, and token
//! subsystems.
//!
//! Every type here validates in its constructor and is otherwise immutable;
//! a mutation produces a new value rather than mutating in place, mirroring
//! how [`crate::state`]'s `Session`/`OAuthState` are treated as data, not
//! objects with behavior.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════
// ID types
// ═══════════════════════════════════════════════════════════════════════

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub uuid::Uuid);

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a role.
    RoleId
);
uuid_id!(
    /// Unique identifier for a permission.
    PermissionId
);
uuid_id!(
    /// Unique identifier for a passkey credential's database row (distinct
    /// from the credential's own base64url `credential_id`, which is
    /// externally generated by the authenticator).
    CredentialId
);
uuid_id!(
    /// Unique identifier for a registered OAuth2 client.
    ClientId
);
uuid_id!(
    /// Unique identifier for an OAuth2 authorization row.
    AuthorizationId
);

// ═══════════════════════════════════════════════════════════════════════
// EmailAddress
// ═══════════════════════════════════════════════════════════════════════

/// A validated email address.
///
/// Equality and hashing are case-insensitive (the local and domain parts
/// are both lowercased for comparison), but [`EmailAddress::display`]
/// returns the address exactly as given — normalizing for comparison must
/// not silently rewrite what a user typed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAddress {
    original: String,
    normalized: String,
}

/// An email address failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid email address: {0}")]
pub struct InvalidEmail(String);

impl EmailAddress {
    /// Parse and validate an email address.
    ///
    /// Validation is deliberately shallow (requires exactly one `@` with a
    /// non-empty local part and a domain part containing a `.`) — full RFC
    /// 5322 validation rejects many addresses real mail systems accept, and
    /// the authoritative check is always delivery, not syntax.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidEmail`] if the address has no `@`, an empty local or
    /// domain part, or a domain part without a `.`.
    pub fn parse(raw: &str) -> Result<Self, InvalidEmail> {
        let trimmed = raw.trim();
        let Some((local, domain)) = trimmed.split_once('@') else {
            return Err(InvalidEmail(raw.to_string()));
        };
        if local.is_empty() || domain.is_empty() || !domain.contains('.') {
            return Err(InvalidEmail(raw.to_string()));
        }
        Ok(Self {
            original: trimmed.to_string(),
            normalized: trimmed.to_lowercase(),
        })
    }

    /// The address as originally given, for display.
    #[must_use]
    pub fn display(&self) -> &str {
        &self.original
    }

    /// The case-normalized form, suitable for blind-index computation.
    #[must_use]
    pub fn normalized(&self) -> &str {
        &self.normalized
    }
}

impl PartialEq for EmailAddress {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}
impl Eq for EmailAddress {}

impl std::hash::Hash for EmailAddress {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// PhoneNumber
// ═══════════════════════════════════════════════════════════════════════

/// A phone number canonicalized to E.164 (`+<country><subscriber>`, digits
/// only after the leading `+`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhoneNumber(String);

/// A phone number failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid phone number: {0}")]
pub struct InvalidPhoneNumber(String);

impl PhoneNumber {
    /// Parse a phone number, assuming `default_region_code` (e.g. `"1"` for
    /// NANP) when `raw` has no leading `+`.
    ///
    /// This is a lightweight canonicalizer, not a full numbering-plan
    /// parser: it strips formatting punctuation and validates digit count
    /// (E.164 allows 8-15 digits after the country code), but does not
    /// validate that a given country code/subscriber-number combination is
    /// actually assigned.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPhoneNumber`] if, after stripping formatting
    /// characters, the remainder isn't all digits or falls outside the
    /// 8-15 digit range E.164 requires.
    pub fn parse(raw: &str, default_region_code: &str) -> Result<Self, InvalidPhoneNumber> {
        let trimmed = raw.trim();
        let (has_plus, digits_source) = trimmed
            .strip_prefix('+')
            .map_or((false, trimmed), |rest| (true, rest));

        let digits: String = digits_source
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
            .collect();

        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(InvalidPhoneNumber(raw.to_string()));
        }

        let full = if has_plus {
            digits
        } else {
            format!("{default_region_code}{digits}")
        };

        if !(8..=15).contains(&full.len()) {
            return Err(InvalidPhoneNumber(raw.to_string()));
        }

        Ok(Self(format!("+{full}")))
    }

    /// The canonical E.164 representation, e.g. `+14155551234`.
    #[must_use]
    pub fn e164(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// HashedPassword
// ═══════════════════════════════════════════════════════════════════════

/// An Argon2-hashed password.
///
/// Only ever constructed from [`HashedPassword::hash`] (new passwords) or
/// [`HashedPassword::from_encoded`] (loading an existing hash from storage)
/// — there is deliberately no way to construct one from a raw password
/// without going through Argon2, and no accessor that returns anything but
/// the encoded hash string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashedPassword(String);

/// Password hashing or verification failed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordHashError(String);

impl HashedPassword {
    /// Hash a raw password with Argon2id and a freshly generated salt.
    ///
    /// # Errors
    ///
    /// Returns [`PasswordHashError`] if Argon2 hashing fails (should not
    /// happen for any password under the length limit the caller enforces
    /// before calling this).
    pub fn hash(raw_password: &str) -> Result<Self, PasswordHashError> {
        use argon2::password_hash::{PasswordHasher, SaltString, rand_core::OsRng};
        use argon2::Argon2;

        let salt = SaltString::generate(&mut OsRng);
        let encoded = Argon2::default()
            .hash_password(raw_password.as_bytes(), &salt)
            .map_err(|e| PasswordHashError(e.to_string()))?
            .to_string();
        Ok(Self(encoded))
    }

    /// Wrap an already-encoded Argon2 hash loaded from storage.
    #[must_use]
    pub const fn from_encoded(encoded: String) -> Self {
        Self(encoded)
    }

    /// Verify `raw_password` against this hash.
    ///
    /// # Errors
    ///
    /// Returns [`PasswordHashError`] if the stored hash is malformed. A
    /// mismatched-but-well-formed password returns `Ok(false)`, not an
    /// error.
    pub fn verify(&self, raw_password: &str) -> Result<bool, PasswordHashError> {
        use argon2::password_hash::PasswordVerifier;
        use argon2::{Argon2, PasswordHash};

        let parsed = PasswordHash::new(&self.0).map_err(|e| PasswordHashError(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(raw_password.as_bytes(), &parsed)
            .is_ok())
    }

    /// The encoded Argon2 hash string, for persistence.
    #[must_use]
    pub fn encoded(&self) -> &str {
        &self.0
    }
}

// ═══════════════════════════════════════════════════════════════════════
// AccountStatus
// ═══════════════════════════════════════════════════════════════════════

/// Embedded account-lifecycle status.
///
/// Exposes pure query methods only; mutation is expressed as intent methods
/// that return a new `AccountStatus` (e.g. [`AccountStatus::with_failed_login`]),
/// matching how `state.rs`'s `Session` is treated as immutable data threaded
/// through the reducer rather than mutated via `&mut self`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountStatus {
    pub enabled: bool,
    pub account_non_expired: bool,
    pub credentials_non_expired: bool,
    pub account_non_locked: bool,
    pub failed_login_attempts: u32,
    pub lockout_expiration_time: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_password_change_at: Option<DateTime<Utc>>,
}

impl AccountStatus {
    /// Status for a newly created, fully-enabled account.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            enabled: true,
            account_non_expired: true,
            credentials_non_expired: true,
            account_non_locked: true,
            failed_login_attempts: 0,
            lockout_expiration_time: None,
            last_login_at: None,
            last_password_change_at: None,
        }
    }

    /// Whether the account may currently authenticate: enabled, unexpired,
    /// and either never locked or past its lockout expiration.
    #[must_use]
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.enabled
            && self.account_non_expired
            && self.credentials_non_expired
            && (self.account_non_locked || self.lockout_expiration_time.is_none_or(|t| t <= now))
    }

    /// Whether the account is currently locked out.
    #[must_use]
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        !self.account_non_locked && self.lockout_expiration_time.is_some_and(|t| t > now)
    }

    /// Record a failed login attempt, locking the account if `threshold` is
    /// reached.
    #[must_use]
    pub fn with_failed_login(&self, threshold: u32, lockout_until: Option<DateTime<Utc>>) -> Self {
        let failed_login_attempts = self.failed_login_attempts + 1;
        let should_lock = failed_login_attempts >= threshold;
        Self {
            failed_login_attempts,
            account_non_locked: !should_lock,
            lockout_expiration_time: if should_lock {
                lockout_until
            } else {
                self.lockout_expiration_time
            },
            ..self.clone()
        }
    }

    /// Record a successful login: resets the failed-attempt counter and
    /// clears any lockout.
    #[must_use]
    pub fn with_successful_login(&self, at: DateTime<Utc>) -> Self {
        Self {
            failed_login_attempts: 0,
            account_non_locked: true,
            lockout_expiration_time: None,
            last_login_at: Some(at),
            ..self.clone()
        }
    }
}

impl Default for AccountStatus {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// MaterializedPath
// ═══════════════════════════════════════════════════════════════════════

/// An LTREE-style materialized path for role hierarchy (e.g. `admin.billing`).
///
/// Labels are validated to contain only ASCII alphanumerics and underscores
/// (the subset of LTREE label syntax this system actually needs) so a path
/// round-trips cleanly through Postgres's `ltree` type without quoting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterializedPath(String);

/// A materialized path failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid role path: {0}")]
pub struct InvalidPath(String);

impl MaterializedPath {
    /// Construct a root path from a single label.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPath`] if `label` is empty or contains characters
    /// outside `[A-Za-z0-9_]`.
    pub fn root(label: &str) -> Result<Self, InvalidPath> {
        Self::validate_label(label)?;
        Ok(Self(label.to_string()))
    }

    /// Construct a child path by appending `label` to `self`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPath`] if `label` is empty or contains characters
    /// outside `[A-Za-z0-9_]`.
    pub fn child(&self, label: &str) -> Result<Self, InvalidPath> {
        Self::validate_label(label)?;
        Ok(Self(format!("{}.{label}", self.0)))
    }

    fn validate_label(label: &str) -> Result<(), InvalidPath> {
        if label.is_empty() || !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(InvalidPath(label.to_string()));
        }
        Ok(())
    }

    /// The dotted path string, as stored in the `path` LTREE column.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `self` is `other` or a descendant of `other`.
    #[must_use]
    pub fn is_or_descends_from(&self, other: &Self) -> bool {
        self.0 == other.0 || self.0.starts_with(&format!("{}.", other.0))
    }

    /// The path's depth (number of labels).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.split('.').count()
    }
}

impl fmt::Display for MaterializedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
