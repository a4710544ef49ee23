//! Local email/password login handler.

use crate::account::AccountManagerOps;
use crate::providers::{
    ChallengeStore, EmailProvider, OAuth2Provider, OAuthTokenStore, RateLimiter, RiskCalculator,
    RiskLevel, SessionStore, TokenStore, WebAuthnProvider,
};
use crate::token::TokenAuthorityOps;
use crate::{AuthAction, AuthEnvironment, AuthReducer, AuthState};
use aegis_runtime::Store;
use aegis_web::{AppError, ClientIp, CorrelationId, UserAgent};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Request body for local email/password login.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginRequest {
    /// Account email address.
    pub email: String,

    /// Plaintext password, never logged.
    pub password: String,
}

/// Response after a successful local login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    /// Session ID.
    pub session_id: String,

    /// User's email.
    pub email: String,

    /// Session expiration timestamp (ISO 8601).
    pub expires_at: String,

    /// Risk level computed for this login.
    pub risk_level: String,
}

type AuthStore<O, E, W, S, T, R, OT, C, RL, AM, TA> = Store<
    AuthState,
    AuthAction,
    AuthEnvironment<O, E, W, S, T, R, OT, C, RL, AM, TA>,
    AuthReducer<O, E, W, S, T, R, OT, C, RL, AM, TA>,
>;

/// Authenticate with email and password.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/auth/login
/// Content-Type: application/json
///
/// {
///   "email": "user@example.com",
///   "password": "..."
/// }
/// ```
pub async fn login<O, E, W, S, T, R, OT, C, RL, AM, TA>(
    State(store): State<Arc<AuthStore<O, E, W, S, T, R, OT, C, RL, AM, TA>>>,
    correlation_id: CorrelationId,
    client_ip: ClientIp,
    user_agent: UserAgent,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError>
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
    let action = AuthAction::Login {
        correlation_id: correlation_id.0,
        email: request.email,
        password: request.password,
        ip_address: client_ip.0,
        user_agent: user_agent.0.clone(),
        fingerprint: None,
    };

    let result = store
        .send_and_wait_for(
            action,
            |a| matches!(a, AuthAction::LoginSucceeded { .. } | AuthAction::LoginFailed { .. }),
            Duration::from_secs(10),
        )
        .await
        .map_err(|_| AppError::timeout("login timed out"))?;

    match result {
        AuthAction::LoginSucceeded { session, risk_level, .. } => Ok(Json(LoginResponse {
            session_id: session.session_id.0.to_string(),
            email: session.email,
            expires_at: session.expires_at.to_rfc3339(),
            risk_level: risk_level_label(risk_level).to_string(),
        })),
        AuthAction::LoginFailed { error, error_description, .. } => {
            let message = error_description.unwrap_or_else(|| error.clone());
            Err(match error.as_str() {
                "locked" => AppError::locked(message),
                "rate_limited" => AppError::too_many_attempts(message),
                _ => AppError::unauthorized(message),
            })
        },
        _ => Err(AppError::internal("unexpected action observed on login")),
    }
}

fn risk_level_label(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Low => "low",
        RiskLevel::Medium => "medium",
        RiskLevel::High => "high",
        RiskLevel::Unknown => "unknown",
    }
}
