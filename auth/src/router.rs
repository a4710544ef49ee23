//! Authentication router composition.
//!
//! Composes all authentication handlers into a single Axum router.

use crate::account::AccountManagerOps;
use crate::handlers::{login, oauth, passkey, session};
use crate::providers::{
    ChallengeStore, EmailProvider, OAuth2Provider, OAuthTokenStore, RateLimiter, RiskCalculator,
    SessionStore, TokenStore, WebAuthnProvider,
};
use crate::token::TokenAuthorityOps;
use crate::{AuthAction, AuthEnvironment, AuthReducer, AuthState};
use aegis_runtime::Store;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

/// Create authentication router with all auth endpoints.
///
/// # Routes
///
/// ## Local login
/// - `POST /login` - Email/password login
///
/// ## OAuth
/// - `GET /oauth/:provider/authorize` - Redirect to OAuth provider
/// - `GET /oauth/:provider/callback` - Handle OAuth callback
///
/// ## Passkey / WebAuthn
/// - `POST /passkey/:user_id/registration/begin` - Start passkey registration
/// - `POST /passkey/:user_id/registration/complete` - Finish passkey registration
/// - `POST /passkey/login/begin` - Start passkey login
/// - `POST /passkey/login/complete` - Finish passkey login
/// - `GET /passkey/:user_id` - List registered passkeys
/// - `DELETE /passkey/:user_id/:credential_id` - Remove a passkey
///
/// ## Session
/// - `GET /session` - Get session info
/// - `POST /logout` - Logout (destroy session)
///
/// # Example
///
/// ```rust,ignore
/// let store = Arc::new(Store::new(
///     AuthState::default(),
///     AuthEnvironment::new(...),
///     AuthReducer::new(),
/// ));
///
/// let app = Router::new()
///     .nest("/api/v1/auth", auth_router(store))
///     .layer(TraceLayer::new_for_http());
/// ```
pub fn auth_router<O, E, W, S, T, R, OT, C, RL, AM, TA>(
    store: Arc<
        Store<
            AuthState,
            AuthAction,
            AuthEnvironment<O, E, W, S, T, R, OT, C, RL, AM, TA>,
            AuthReducer<O, E, W, S, T, R, OT, C, RL, AM, TA>,
        >,
    >,
) -> Router
where
    O: OAuth2Provider + Clone + 'static,
    E: EmailProvider + Clone + 'static,
    W: WebAuthnProvider + Clone + 'static,
    S: SessionStore + Clone + 'static,
    T: TokenStore + Clone + 'static,
    R: RiskCalculator + Clone + 'static,
    OT: OAuthTokenStore + Clone + 'static,
    C: ChallengeStore + Clone + 'static,
    RL: RateLimiter + Clone + 'static,
    AM: AccountManagerOps + Clone + 'static,
    TA: TokenAuthorityOps + Clone + 'static,
{
    Router::new()
        .route("/login", post(login::login::<O, E, W, S, T, R, OT, C, RL, AM, TA>))
        .route(
            "/oauth/:provider/authorize",
            get(oauth::oauth_authorize::<O, E, W, S, T, R, OT, C, RL, AM, TA>),
        )
        .route(
            "/oauth/:provider/callback",
            get(oauth::oauth_callback::<O, E, W, S, T, R, OT, C, RL, AM, TA>),
        )
        .route(
            "/passkey/:user_id/registration/begin",
            post(passkey::begin_passkey_registration::<O, E, W, S, T, R, OT, C, RL, AM, TA>),
        )
        .route(
            "/passkey/:user_id/registration/complete",
            post(passkey::complete_passkey_registration::<O, E, W, S, T, R, OT, C, RL, AM, TA>),
        )
        .route(
            "/passkey/login/begin",
            post(passkey::begin_passkey_login::<O, E, W, S, T, R, OT, C, RL, AM, TA>),
        )
        .route(
            "/passkey/login/complete",
            post(passkey::complete_passkey_login::<O, E, W, S, T, R, OT, C, RL, AM, TA>),
        )
        .route(
            "/passkey/:user_id",
            get(passkey::list_passkey_credentials::<O, E, W, S, T, R, OT, C, RL, AM, TA>),
        )
        .route(
            "/passkey/:user_id/:credential_id",
            delete(passkey::delete_passkey_credential::<O, E, W, S, T, R, OT, C, RL, AM, TA>),
        )
        .route("/session", get(session::get_session::<O, E, W, S, T, R, OT, C, RL, AM, TA>))
        .route("/logout", post(session::logout::<O, E, W, S, T, R, OT, C, RL, AM, TA>))
        .with_state(store)
}
