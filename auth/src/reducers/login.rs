//! Local email/password login reducer.
//!
//! # Flow
//!
//! ```text
//! 1. Login                → rate limit check → verify credentials → risk assessment → create session
//! 2. LoginSucceeded        → store session in state
//! 3. LoginFailed           → no state change, surfaced to the caller
//! ```
//!
//! Failed attempts and lockout bookkeeping live in [`crate::account::AccountManagerOps`]
//! (C5); this reducer only sequences the calls and maps their outcomes onto
//! [`AuthAction::LoginSucceeded`]/[`AuthAction::LoginFailed`].

use crate::account::AccountManagerOps;
use crate::actions::{AuthAction, AuthLevel};
use crate::config::LoginConfig;
use crate::environment::AuthEnvironment;
use crate::error::AuthError;
use crate::providers::{
    ChallengeStore, DeviceFingerprint, EmailProvider, LoginContext, OAuth2Provider,
    OAuthTokenStore, RateLimiter, RiskCalculator, SessionStore, TokenStore, WebAuthnProvider,
};
use crate::state::{AuthState, Session, SessionId};
use crate::token::TokenAuthorityOps;
use aegis_core::effect::Effect;
use aegis_core::reducer::Reducer;
use base64::Engine;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::marker::PhantomData;
use std::net::IpAddr;

/// Local email/password login reducer.
#[derive(Debug, Clone)]
pub struct LoginReducer<O, E, W, S, T, R, OT, C, RL, AM, TA> {
    config: LoginConfig,
    _phantom: PhantomData<(O, E, W, S, T, R, OT, C, RL, AM, TA)>,
}

impl<O, E, W, S, T, R, OT, C, RL, AM, TA> LoginReducer<O, E, W, S, T, R, OT, C, RL, AM, TA> {
    /// Create a new login reducer with the default [`LoginConfig`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: LoginConfig::default(),
            _phantom: PhantomData,
        }
    }

    /// Create a new login reducer with a custom configuration.
    #[must_use]
    pub fn with_config(config: LoginConfig) -> Self {
        Self {
            config,
            _phantom: PhantomData,
        }
    }
}

impl<O, E, W, S, T, R, OT, C, RL, AM, TA> Default for LoginReducer<O, E, W, S, T, R, OT, C, RL, AM, TA> {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash a device fingerprint's fields for storage, since the raw fingerprint
/// is treated as sensitive client-supplied data.
fn hash_fingerprint(fingerprint: &DeviceFingerprint) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fingerprint.canvas.as_deref().unwrap_or_default().as_bytes());
    hasher.update(fingerprint.webgl.as_deref().unwrap_or_default().as_bytes());
    hasher.update(fingerprint.audio.as_deref().unwrap_or_default().as_bytes());
    hasher.update(fingerprint.screen_resolution.as_deref().unwrap_or_default().as_bytes());
    hasher.update(fingerprint.platform.as_deref().unwrap_or_default().as_bytes());
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

impl<O, E, W, S, T, R, OT, C, RL, AM, TA> LoginReducer<O, E, W, S, T, R, OT, C, RL, AM, TA>
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
    #[allow(clippy::too_many_arguments)]
    async fn perform_login(
        env: AuthEnvironment<O, E, W, S, T, R, OT, C, RL, AM, TA>,
        config: LoginConfig,
        correlation_id: uuid::Uuid,
        email: String,
        password: String,
        ip_address: IpAddr,
        user_agent: String,
        fingerprint: Option<DeviceFingerprint>,
    ) -> AuthAction {
        if let Err(err) = env
            .rate_limiter
            .check_and_record(&email, config.rate_limit_max_attempts, config.rate_limit_window)
            .await
        {
            return match err {
                AuthError::TooManyAttempts { .. } => AuthAction::LoginFailed {
                    correlation_id,
                    error: "rate_limited".to_string(),
                    error_description: Some("too many login attempts, try again later".to_string()),
                },
                other => AuthAction::LoginFailed {
                    correlation_id,
                    error: "internal_error".to_string(),
                    error_description: Some(other.to_string()),
                },
            };
        }

        let user_id = match env.accounts.verify_login_credentials(&email, &password).await {
            Ok(user_id) => user_id,
            Err(AuthError::Locked { retry_after }) => {
                return AuthAction::LoginFailed {
                    correlation_id,
                    error: "locked".to_string(),
                    error_description: Some(format!("account locked, retry after {retry_after:?}")),
                };
            }
            Err(_) => {
                env.accounts.handle_failed_login(&email).await;
                return AuthAction::LoginFailed {
                    correlation_id,
                    error: "invalid_credentials".to_string(),
                    error_description: None,
                };
            }
        };

        let context = LoginContext {
            user_id: Some(user_id),
            email: email.clone(),
            ip_address,
            user_agent: user_agent.clone(),
            device_id: None,
            last_login_location: None,
            last_login_at: None,
            fingerprint: fingerprint.clone(),
        };

        let risk = match env.risk.calculate_login_risk(&context).await {
            Ok(assessment) => assessment,
            Err(err) => {
                tracing::warn!(error = %err, "risk assessment failed, treating login as high risk");
                crate::providers::RiskAssessment {
                    level: crate::providers::RiskLevel::Unknown,
                    factors: Vec::new(),
                    alerts: Vec::new(),
                    recommended_auth_level: AuthLevel::MultiFactor,
                }
            }
        };

        if risk.recommended_auth_level > AuthLevel::Basic {
            return AuthAction::LoginFailed {
                correlation_id,
                error: "step_up_required".to_string(),
                error_description: Some("additional authentication required for this login".to_string()),
            };
        }

        let country = match env.risk.get_ip_location(ip_address).await {
            Ok(location) => location.country,
            Err(_) => None,
        };

        let fingerprint_hash = fingerprint.as_ref().map(hash_fingerprint);
        if let Err(err) = env
            .accounts
            .handle_successful_login(&email, fingerprint_hash, Some(ip_address), country)
            .await
        {
            tracing::warn!(error = %err, "failed to record successful login");
        }
        if let Err(err) = env.rate_limiter.reset(&email).await {
            tracing::warn!(error = %err, "failed to reset rate limit after successful login");
        }

        let now = Utc::now();
        let login_risk_score = match risk.level.effective() {
            crate::providers::RiskLevel::Low => 0.0,
            crate::providers::RiskLevel::Medium => 0.5,
            crate::providers::RiskLevel::High | crate::providers::RiskLevel::Unknown => 1.0,
        };
        let session = Session {
            session_id: SessionId::new(),
            user_id,
            device_id: crate::state::DeviceId::new(),
            email,
            created_at: now,
            last_active: now,
            expires_at: now + config.session_duration,
            ip_address,
            user_agent,
            oauth_provider: None,
            login_risk_score,
            idle_timeout: config.idle_timeout,
            enable_sliding_refresh: config.enable_sliding_session_refresh,
        };

        if let Err(err) = env.sessions.create_session(&session, config.session_duration).await {
            return AuthAction::LoginFailed {
                correlation_id,
                error: "internal_error".to_string(),
                error_description: Some(err.to_string()),
            };
        }

        AuthAction::LoginSucceeded {
            correlation_id,
            session,
            risk_level: risk.level,
        }
    }
}

impl<O, E, W, S, T, R, OT, C, RL, AM, TA> Reducer for LoginReducer<O, E, W, S, T, R, OT, C, RL, AM, TA>
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
    type State = AuthState;
    type Action = AuthAction;
    type Environment = AuthEnvironment<O, E, W, S, T, R, OT, C, RL, AM, TA>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Vec<Effect<Self::Action>> {
        match action {
            AuthAction::Login {
                correlation_id,
                email,
                password,
                ip_address,
                user_agent,
                fingerprint,
            } => {
                let env = env.clone();
                let config = self.config.clone();
                vec![Effect::Future(Box::pin(async move {
                    Some(
                        Self::perform_login(
                            env,
                            config,
                            correlation_id,
                            email,
                            password,
                            ip_address,
                            user_agent,
                            fingerprint,
                        )
                        .await,
                    )
                }))]
            }
            AuthAction::LoginSucceeded { session, .. } => {
                state.session = Some(session);
                vec![Effect::None]
            }
            AuthAction::LoginFailed { .. } => vec![Effect::None],
            _ => vec![Effect::None],
        }
    }
}
