//! # Aegis Authentication & Authorization
//!
//! Account lifecycle, risk engine, authentication coordinator, token
//! authority, and session store for the Aegis identity and authorization
//! server — local credentials, federated OIDC login, and passkey/WebAuthn
//! ceremonies, all orchestrated through the functional-core/imperative-shell
//! reducers from `aegis-runtime`.
//!
//! ## Features
//!
//! - **Multi-flow**: local password, federated OIDC/OAuth2, passkeys
//! - **Composable**: reducers compose the same way any `aegis-core` reducer does
//! - **Adaptive risk**: failed-login backoff, geo/ASN/device-fingerprint scoring
//! - **Type-safe**: compile-time guarantees for permissions and grant types
//!
//! ## Architecture
//!
//! Authentication is implemented as reducers and effects:
//!
//! ```text
//! Action → Reducer → (State, Effects) → Effect Execution → More Actions
//! ```
//!
//! ## Example: OAuth2 Login
//!
//! ```rust,ignore
//! use aegis_auth::*;
//!
//! // 1. Initiate OAuth login
//! let effects = reducer.reduce(
//!     &mut state,
//!     AuthAction::InitiateOAuth { provider: OAuthProvider::Google },
//!     &env,
//! );
//!
//! // 2. Execute effects (redirect to Google)
//! // 3. Handle callback
//! let effects = reducer.reduce(
//!     &mut state,
//!     AuthAction::OAuthCallback { code, state },
//!     &env,
//! );
//!
//! // 4. Session created
//! assert!(state.session.is_some());
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod account;
pub mod actions;
pub mod config;
pub mod constants;
pub mod domain;
pub mod effects;
pub mod environment;
pub mod error;
#[cfg(feature = "axum")]
pub mod handlers;
#[cfg(feature = "test-utils")]
pub mod mocks;
pub mod providers;
pub mod reducers;
#[cfg(feature = "axum")]
pub mod router;
pub mod state;
pub mod stores;
pub mod token;
pub mod utils;

// Re-export main types for convenience
pub use actions::AuthAction;
pub use domain::{
    AccountStatus, AuthorizationId, ClientId, CredentialId, EmailAddress, HashedPassword,
    MaterializedPath, PermissionId, PhoneNumber, RoleId,
};
pub use effects::AuthEffect;
pub use environment::AuthEnvironment;
pub use error::{AuthError, Result};
pub use reducers::AuthReducer;
pub use state::{AuthState, Session, SessionId, TokenPair, UserId};
