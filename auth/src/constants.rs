//! Authentication constants.
//!
//! This module contains constant values used throughout the authentication system.

/// Login method identifiers used in `UserLoggedIn` events.
pub mod login_methods {
    /// Local password authentication.
    pub const PASSWORD: &str = "password";

    /// OAuth prefix for OAuth-based authentication.
    ///
    /// Full method format: `oauth_{provider}` (e.g., "oauth_google", "oauth_github").
    pub const OAUTH_PREFIX: &str = "oauth_";

    /// WebAuthn/FIDO2 passkey authentication.
    pub const PASSKEY: &str = "passkey";
}
