//! OAuth2/OIDC authentication handlers.
//!
//! Implements `OAuth2` authorization code flow with OIDC support.

use crate::account::AccountManagerOps;
use crate::providers::{
    ChallengeStore, EmailProvider, OAuth2Provider, OAuthTokenStore, RateLimiter, RiskCalculator,
    SessionStore, TokenStore, WebAuthnProvider,
};
use crate::token::TokenAuthorityOps;
use crate::{AuthAction, AuthEnvironment, AuthReducer, AuthState};
use aegis_runtime::Store;
use aegis_web::{AppError, ClientIp, CorrelationId, UserAgent};
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// `OAuth` callback query parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OAuthCallbackQuery {
    /// Authorization code from provider.
    pub code: String,

    /// State parameter (`CSRF` protection).
    pub state: String,

    /// Optional error from provider.
    pub error: Option<String>,

    /// Optional error description from provider.
    pub error_description: Option<String>,
}

/// Response after a successful `OAuth` callback.
#[derive(Debug, Clone, Serialize)]
pub struct OAuthCallbackResponse {
    /// Session ID.
    pub session_id: String,

    /// Session token for authentication.
    pub session_token: String,

    /// User's email.
    pub email: String,

    /// Session expiration timestamp (ISO 8601).
    pub expires_at: String,
}

type AuthStore<O, E, W, S, T, R, OT, C, RL, AM, TA> = Store<
    AuthState,
    AuthAction,
    AuthEnvironment<O, E, W, S, T, R, OT, C, RL, AM, TA>,
    AuthReducer<O, E, W, S, T, R, OT, C, RL, AM, TA>,
>;

/// Initiate `OAuth` authorization flow.
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/auth/oauth/:provider/authorize
/// ```
///
/// # Flow
///
/// 1. Extract provider from path (e.g., "google", "github")
/// 2. Send `InitiateOAuth` action
/// 3. Wait for `OAuthAuthorizationUrlReady`
/// 4. Redirect to the `OAuth` provider
///
/// # Response
///
/// HTTP 302 redirect to the `OAuth` provider's authorization page.
pub async fn oauth_authorize<O, E, W, S, T, R, OT, C, RL, AM, TA>(
    State(store): State<Arc<AuthStore<O, E, W, S, T, R, OT, C, RL, AM, TA>>>,
    Path(provider_str): Path<String>,
    correlation_id: CorrelationId,
    client_ip: ClientIp,
    user_agent: UserAgent,
) -> Result<Response, AppError>
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
    let provider = crate::state::OAuthProvider::from_str(&provider_str)
        .map_err(|_| AppError::bad_request(format!("Invalid OAuth provider: {provider_str}")))?;

    let action = AuthAction::InitiateOAuth {
        correlation_id: correlation_id.0,
        provider,
        ip_address: client_ip.0,
        user_agent: user_agent.0.clone(),
        fingerprint: None,
    };

    let result = store
        .send_and_wait_for(
            action,
            |a| {
                matches!(
                    a,
                    AuthAction::OAuthAuthorizationUrlReady { .. } | AuthAction::OAuthFailed { .. }
                )
            },
            Duration::from_secs(10),
        )
        .await
        .map_err(|_| AppError::timeout("OAuth initiation timed out"))?;

    match result {
        AuthAction::OAuthAuthorizationUrlReady { authorization_url, .. } => {
            Ok(Redirect::to(&authorization_url).into_response())
        },
        AuthAction::OAuthFailed { error, error_description, .. } => {
            let message = error_description.unwrap_or(error);
            Err(AppError::bad_request(format!("OAuth initiation failed: {message}")))
        },
        _ => Err(AppError::internal("unexpected action observed on OAuth initiation")),
    }
}

/// Handle the `OAuth` callback after the user authorizes with the provider.
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/auth/oauth/:provider/callback?code=...&state=...
/// ```
///
/// # Flow
///
/// 1. Extract code and state from query parameters
/// 2. Send `OAuthCallback` action
/// 3. Wait for `LoginSucceeded` or `LoginFailed`
/// 4. Return session info or error
pub async fn oauth_callback<O, E, W, S, T, R, OT, C, RL, AM, TA>(
    State(store): State<Arc<AuthStore<O, E, W, S, T, R, OT, C, RL, AM, TA>>>,
    Path(provider_str): Path<String>,
    Query(query): Query<OAuthCallbackQuery>,
    correlation_id: CorrelationId,
    client_ip: ClientIp,
    user_agent: UserAgent,
) -> Result<Json<OAuthCallbackResponse>, AppError>
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
    if let Some(error) = query.error {
        let description = query.error_description.unwrap_or_default();
        return Err(AppError::bad_request(format!("OAuth error: {error} - {description}")));
    }

    // Validates the provider name; the reducer re-derives it from the stored
    // CSRF state rather than trusting the path segment.
    let _provider = crate::state::OAuthProvider::from_str(&provider_str)
        .map_err(|_| AppError::bad_request(format!("Invalid OAuth provider: {provider_str}")))?;

    let action = AuthAction::OAuthCallback {
        correlation_id: correlation_id.0,
        code: query.code,
        state: query.state,
        ip_address: client_ip.0,
        user_agent: user_agent.0.clone(),
        fingerprint: None,
    };

    let result = store
        .send_and_wait_for(
            action,
            |a| matches!(a, AuthAction::LoginSucceeded { .. } | AuthAction::LoginFailed { .. }),
            Duration::from_secs(30),
        )
        .await
        .map_err(|_| AppError::timeout("OAuth callback timed out"))?;

    match result {
        AuthAction::LoginSucceeded { session, .. } => Ok(Json(OAuthCallbackResponse {
            session_id: session.session_id.0.to_string(),
            session_token: session.session_id.0.to_string(),
            email: session.email,
            expires_at: session.expires_at.to_rfc3339(),
        })),
        AuthAction::LoginFailed { error, error_description, .. } => {
            let message = error_description.unwrap_or(error);
            Err(AppError::unauthorized(format!("OAuth authentication failed: {message}")))
        },
        _ => Err(AppError::internal("unexpected action observed on OAuth callback")),
    }
}
