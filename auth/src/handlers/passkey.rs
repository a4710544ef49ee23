//! Passkey/`WebAuthn` authentication handlers.
//!
//! Implements FIDO2/`WebAuthn` passwordless registration and login.

use crate::account::AccountManagerOps;
use crate::providers::{
    ChallengeStore, EmailProvider, OAuth2Provider, OAuthTokenStore, RateLimiter, RiskCalculator,
    SessionStore, TokenStore, WebAuthnProvider,
};
use crate::state::{DeviceId, UserId};
use crate::token::TokenAuthorityOps;
use crate::{AuthAction, AuthEnvironment, AuthReducer, AuthState};
use aegis_runtime::Store;
use aegis_web::{AppError, ClientIp, CorrelationId, UserAgent};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Request to begin passkey registration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BeginPasskeyRegistrationRequest {
    /// User ID (must be authenticated).
    pub user_id: String,

    /// Device name for this passkey.
    pub device_name: String,
}

/// Response with `WebAuthn` challenge for registration.
#[derive(Debug, Clone, Serialize)]
pub struct BeginPasskeyRegistrationResponse {
    /// Challenge ID, echoed back on completion.
    pub challenge_id: String,

    /// `WebAuthn` challenge (base64).
    pub challenge: String,

    /// Relying party ID.
    pub rp_id: String,

    /// User info for `WebAuthn`.
    pub user: WebAuthnUser,
}

/// `WebAuthn` user info.
#[derive(Debug, Clone, Serialize)]
pub struct WebAuthnUser {
    /// User ID.
    pub id: String,

    /// User's email.
    pub name: String,

    /// Display name.
    pub display_name: String,
}

/// Request to complete passkey registration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompletePasskeyRegistrationRequest {
    /// Device ID (from the device that is registering this passkey).
    pub device_id: String,

    /// Challenge ID returned by the begin endpoint.
    pub challenge_id: String,

    /// Credential ID from `WebAuthn`.
    pub credential_id: String,

    /// Public key (base64).
    pub public_key: String,

    /// Attestation response from `navigator.credentials.create()`.
    pub attestation_response: String,
}

/// Response after successful passkey registration.
#[derive(Debug, Clone, Serialize)]
pub struct CompletePasskeyRegistrationResponse {
    /// Credential ID that was registered.
    pub credential_id: String,
}

/// Request to begin passkey login.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BeginPasskeyLoginRequest {
    /// Username or email.
    pub username: String,
}

/// Response with `WebAuthn` challenge for login.
#[derive(Debug, Clone, Serialize)]
pub struct BeginPasskeyLoginResponse {
    /// Challenge ID, echoed back on completion.
    pub challenge_id: String,

    /// `WebAuthn` challenge (base64).
    pub challenge: String,

    /// Allowed credential IDs.
    pub allowed_credentials: Vec<String>,
}

/// Request to complete passkey login.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompletePasskeyLoginRequest {
    /// Challenge ID returned by the begin endpoint.
    pub challenge_id: String,

    /// Credential ID used.
    pub credential_id: String,

    /// Assertion response from `navigator.credentials.get()`.
    pub assertion_response: String,
}

/// Response after successful passkey login.
#[derive(Debug, Clone, Serialize)]
pub struct CompletePasskeyLoginResponse {
    /// Session ID.
    pub session_id: String,

    /// Session token for authentication.
    pub session_token: String,

    /// User's email.
    pub email: String,

    /// Session expiration timestamp (ISO 8601).
    pub expires_at: String,
}

/// A single registered passkey, as returned to the owning user.
#[derive(Debug, Clone, Serialize)]
pub struct PasskeyCredentialView {
    /// Credential ID.
    pub credential_id: String,

    /// User-assigned label, if any.
    pub friendly_name: Option<String>,

    /// Last time this credential completed a login.
    pub last_used_at: Option<String>,
}

/// Response listing a user's registered passkeys.
#[derive(Debug, Clone, Serialize)]
pub struct ListPasskeyCredentialsResponse {
    /// Registered credentials.
    pub credentials: Vec<PasskeyCredentialView>,
}

type AuthStore<O, E, W, S, T, R, OT, C, RL, AM, TA> = Store<
    AuthState,
    AuthAction,
    AuthEnvironment<O, E, W, S, T, R, OT, C, RL, AM, TA>,
    AuthReducer<O, E, W, S, T, R, OT, C, RL, AM, TA>,
>;

/// Begin passkey registration for an authenticated user.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/auth/passkey/registration/begin
/// ```
///
/// # Response
///
/// Returns a `WebAuthn` challenge for `navigator.credentials.create()`.
pub async fn begin_passkey_registration<O, E, W, S, T, R, OT, C, RL, AM, TA>(
    State(store): State<Arc<AuthStore<O, E, W, S, T, R, OT, C, RL, AM, TA>>>,
    Path(user_id): Path<uuid::Uuid>,
    correlation_id: CorrelationId,
    Json(request): Json<BeginPasskeyRegistrationRequest>,
) -> Result<Json<BeginPasskeyRegistrationResponse>, AppError>
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
    let action = AuthAction::InitiatePasskeyRegistration {
        correlation_id: correlation_id.0,
        user_id: UserId(user_id),
        device_name: request.device_name,
    };

    let result = store
        .send_and_wait_for(
            action,
            |a| {
                matches!(
                    a,
                    AuthAction::PasskeyRegistrationChallengeGenerated { .. }
                        | AuthAction::PasskeyRegistrationFailed { .. }
                )
            },
            Duration::from_secs(10),
        )
        .await
        .map_err(|_| AppError::timeout("passkey registration initiation timed out"))?;

    match result {
        AuthAction::PasskeyRegistrationChallengeGenerated {
            user_id,
            challenge_id,
            challenge,
            rp_id,
            user_email,
            user_display_name,
            ..
        } => Ok(Json(BeginPasskeyRegistrationResponse {
            challenge_id,
            challenge,
            rp_id,
            user: WebAuthnUser {
                id: user_id.0.to_string(),
                name: user_email,
                display_name: user_display_name,
            },
        })),
        AuthAction::PasskeyRegistrationFailed { error, .. } => {
            Err(AppError::bad_request(format!("passkey registration failed: {error}")))
        },
        _ => Err(AppError::internal("unexpected action observed on passkey registration initiation")),
    }
}

/// Complete passkey registration by verifying the attestation.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/auth/passkey/registration/complete
/// ```
pub async fn complete_passkey_registration<O, E, W, S, T, R, OT, C, RL, AM, TA>(
    State(store): State<Arc<AuthStore<O, E, W, S, T, R, OT, C, RL, AM, TA>>>,
    Path(user_id): Path<uuid::Uuid>,
    correlation_id: CorrelationId,
    Json(request): Json<CompletePasskeyRegistrationRequest>,
) -> Result<(StatusCode, Json<CompletePasskeyRegistrationResponse>), AppError>
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
    let device_id = uuid::Uuid::parse_str(&request.device_id)
        .map_err(|_| AppError::bad_request("invalid device ID format"))?;

    let public_key = base64::Engine::decode(
        &base64::engine::general_purpose::STANDARD,
        &request.public_key,
    )
    .map_err(|_| AppError::bad_request("invalid base64 public key"))?;

    let action = AuthAction::CompletePasskeyRegistration {
        correlation_id: correlation_id.0,
        user_id: UserId(user_id),
        device_id: DeviceId(device_id),
        challenge_id: request.challenge_id,
        credential_id: request.credential_id,
        public_key,
        attestation_response: request.attestation_response,
    };

    let result = store
        .send_and_wait_for(
            action,
            |a| {
                matches!(
                    a,
                    AuthAction::PasskeyRegistrationSuccess { .. }
                        | AuthAction::PasskeyRegistrationFailed { .. }
                )
            },
            Duration::from_secs(10),
        )
        .await
        .map_err(|_| AppError::timeout("passkey registration completion timed out"))?;

    match result {
        AuthAction::PasskeyRegistrationSuccess { credential_id, .. } => Ok((
            StatusCode::CREATED,
            Json(CompletePasskeyRegistrationResponse { credential_id }),
        )),
        AuthAction::PasskeyRegistrationFailed { error, .. } => {
            Err(AppError::bad_request(format!("passkey registration failed: {error}")))
        },
        _ => Err(AppError::internal("unexpected action observed on passkey registration completion")),
    }
}

/// Begin passkey login.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/auth/passkey/login/begin
/// ```
pub async fn begin_passkey_login<O, E, W, S, T, R, OT, C, RL, AM, TA>(
    State(store): State<Arc<AuthStore<O, E, W, S, T, R, OT, C, RL, AM, TA>>>,
    correlation_id: CorrelationId,
    client_ip: ClientIp,
    user_agent: UserAgent,
    Json(request): Json<BeginPasskeyLoginRequest>,
) -> Result<Json<BeginPasskeyLoginResponse>, AppError>
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
    let action = AuthAction::InitiatePasskeyLogin {
        correlation_id: correlation_id.0,
        username: request.username,
        ip_address: client_ip.0,
        user_agent: user_agent.0.clone(),
    };

    let result = store
        .send_and_wait_for(
            action,
            |a| {
                matches!(
                    a,
                    AuthAction::PasskeyLoginChallengeGenerated { .. }
                        | AuthAction::PasskeyAuthenticationFailed { .. }
                )
            },
            Duration::from_secs(10),
        )
        .await
        .map_err(|_| AppError::timeout("passkey login initiation timed out"))?;

    match result {
        AuthAction::PasskeyLoginChallengeGenerated { challenge_id, challenge, allowed_credentials, .. } => {
            Ok(Json(BeginPasskeyLoginResponse { challenge_id, challenge, allowed_credentials }))
        },
        AuthAction::PasskeyAuthenticationFailed { error, .. } => {
            Err(AppError::unauthorized(format!("passkey login failed: {error}")))
        },
        _ => Err(AppError::internal("unexpected action observed on passkey login initiation")),
    }
}

/// Complete passkey login and create a session.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/auth/passkey/login/complete
/// ```
pub async fn complete_passkey_login<O, E, W, S, T, R, OT, C, RL, AM, TA>(
    State(store): State<Arc<AuthStore<O, E, W, S, T, R, OT, C, RL, AM, TA>>>,
    correlation_id: CorrelationId,
    client_ip: ClientIp,
    user_agent: UserAgent,
    Json(request): Json<CompletePasskeyLoginRequest>,
) -> Result<Json<CompletePasskeyLoginResponse>, AppError>
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
    let action = AuthAction::CompletePasskeyLogin {
        correlation_id: correlation_id.0,
        challenge_id: request.challenge_id,
        credential_id: request.credential_id,
        assertion_response: request.assertion_response,
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
                    AuthAction::LoginSucceeded { .. }
                        | AuthAction::LoginFailed { .. }
                        | AuthAction::PasskeyAuthenticationFailed { .. }
                )
            },
            Duration::from_secs(30),
        )
        .await
        .map_err(|_| AppError::timeout("passkey login completion timed out"))?;

    match result {
        AuthAction::LoginSucceeded { session, .. } => Ok(Json(CompletePasskeyLoginResponse {
            session_id: session.session_id.0.to_string(),
            session_token: session.session_id.0.to_string(),
            email: session.email,
            expires_at: session.expires_at.to_rfc3339(),
        })),
        AuthAction::LoginFailed { error, error_description, .. } => {
            let message = error_description.unwrap_or(error);
            Err(AppError::unauthorized(format!("passkey login failed: {message}")))
        },
        AuthAction::PasskeyAuthenticationFailed { error, .. } => {
            Err(AppError::unauthorized(format!("passkey login failed: {error}")))
        },
        _ => Err(AppError::internal("unexpected action observed on passkey login completion")),
    }
}

/// List the passkeys registered to an authenticated user.
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/auth/passkey/:user_id
/// ```
pub async fn list_passkey_credentials<O, E, W, S, T, R, OT, C, RL, AM, TA>(
    State(store): State<Arc<AuthStore<O, E, W, S, T, R, OT, C, RL, AM, TA>>>,
    Path(user_id): Path<uuid::Uuid>,
    correlation_id: CorrelationId,
) -> Result<Json<ListPasskeyCredentialsResponse>, AppError>
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
    let action = AuthAction::ListPasskeyCredentials {
        correlation_id: correlation_id.0,
        user_id: UserId(user_id),
    };

    let result = store
        .send_and_wait_for(
            action,
            |a| matches!(a, AuthAction::PasskeyCredentialsListed { .. }),
            Duration::from_secs(10),
        )
        .await
        .map_err(|_| AppError::timeout("passkey credential listing timed out"))?;

    match result {
        AuthAction::PasskeyCredentialsListed { credentials, .. } => {
            Ok(Json(ListPasskeyCredentialsResponse {
                credentials: credentials
                    .into_iter()
                    .map(|c| PasskeyCredentialView {
                        credential_id: c.credential_id,
                        friendly_name: c.friendly_name,
                        last_used_at: c.last_used_at.map(|t| t.to_rfc3339()),
                    })
                    .collect(),
            }))
        },
        _ => Err(AppError::internal("unexpected action observed on passkey credential listing")),
    }
}

/// Delete a registered passkey.
///
/// # Endpoint
///
/// ```text
/// DELETE /api/v1/auth/passkey/:user_id/:credential_id
/// ```
pub async fn delete_passkey_credential<O, E, W, S, T, R, OT, C, RL, AM, TA>(
    State(store): State<Arc<AuthStore<O, E, W, S, T, R, OT, C, RL, AM, TA>>>,
    Path((user_id, credential_id)): Path<(uuid::Uuid, String)>,
    correlation_id: CorrelationId,
) -> Result<StatusCode, AppError>
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
    let action = AuthAction::DeletePasskeyCredential {
        correlation_id: correlation_id.0,
        user_id: UserId(user_id),
        credential_id,
    };

    let result = store
        .send_and_wait_for(
            action,
            |a| {
                matches!(
                    a,
                    AuthAction::PasskeyCredentialDeleted { .. }
                        | AuthAction::PasskeyCredentialDeletionFailed { .. }
                )
            },
            Duration::from_secs(10),
        )
        .await
        .map_err(|_| AppError::timeout("passkey credential deletion timed out"))?;

    match result {
        AuthAction::PasskeyCredentialDeleted { .. } => Ok(StatusCode::NO_CONTENT),
        AuthAction::PasskeyCredentialDeletionFailed { error, .. } => {
            Err(AppError::bad_request(format!("passkey credential deletion failed: {error}")))
        },
        _ => Err(AppError::internal("unexpected action observed on passkey credential deletion")),
    }
}
