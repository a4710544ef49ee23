//! `WebAuthn`/Passkey authentication reducer.
//!
//! # Flow
//!
//! ```text
//! Registration:
//!   InitiatePasskeyRegistration     → challenge generated, stored under its own ID
//!   CompletePasskeyRegistration     → challenge consumed, attestation verified, credential stored
//!
//! Login:
//!   InitiatePasskeyLogin            → user's credentials looked up, challenge generated
//!   CompletePasskeyLogin            → challenge consumed, assertion verified, counter advanced
//!   LoginSucceeded/LoginFailed      → terminal event, picked up by `LoginReducer`'s own match
//!      arms when reducers are run through the combined `AuthReducer`
//! ```
//!
//! The [`ChallengeStore`] is keyed by `(user_id, challenge)`; this reducer stores
//! the provider-issued `challenge_id` itself as that opaque challenge string, so
//! a single token carries both replay protection and the binding passed to
//! [`WebAuthnProvider::verify_registration`]/[`WebAuthnProvider::verify_authentication`].
//!
//! Credential persistence goes through [`AccountManagerOps`] (C5), not a direct
//! repository call, matching how [`crate::reducers::login::LoginReducer`] and
//! [`crate::reducers::oauth::OAuthReducer`] delegate account state.

use crate::account::AccountManagerOps;
use crate::actions::{AuthAction, AuthLevel};
use crate::config::PasskeyConfig;
use crate::environment::AuthEnvironment;
use crate::error::AuthError;
use crate::providers::{
    ChallengeStore, DeviceFingerprint, EmailProvider, LoginContext, OAuth2Provider,
    OAuthTokenStore, RateLimiter, RiskCalculator, SessionStore, TokenStore, WebAuthnProvider,
};
use crate::state::{AuthState, DeviceId, Session, SessionId, UserId};
use crate::token::TokenAuthorityOps;
use aegis_core::effect::Effect;
use aegis_core::reducer::Reducer;
use chrono::Utc;
use std::marker::PhantomData;
use std::net::IpAddr;

/// `WebAuthn`/Passkey authentication reducer.
#[derive(Debug, Clone)]
pub struct PasskeyReducer<O, E, W, S, T, R, OT, C, RL, AM, TA> {
    config: PasskeyConfig,
    _phantom: PhantomData<(O, E, W, S, T, R, OT, C, RL, AM, TA)>,
}

impl<O, E, W, S, T, R, OT, C, RL, AM, TA> PasskeyReducer<O, E, W, S, T, R, OT, C, RL, AM, TA> {
    /// Create a new passkey reducer with the default [`PasskeyConfig`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: PasskeyConfig::default(),
            _phantom: PhantomData,
        }
    }

    /// Create a new passkey reducer with a custom configuration.
    #[must_use]
    pub fn with_config(config: PasskeyConfig) -> Self {
        Self {
            config,
            _phantom: PhantomData,
        }
    }
}

impl<O, E, W, S, T, R, OT, C, RL, AM, TA> Default for PasskeyReducer<O, E, W, S, T, R, OT, C, RL, AM, TA> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O, E, W, S, T, R, OT, C, RL, AM, TA> PasskeyReducer<O, E, W, S, T, R, OT, C, RL, AM, TA>
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
    async fn perform_registration_initiate(
        env: AuthEnvironment<O, E, W, S, T, R, OT, C, RL, AM, TA>,
        config: PasskeyConfig,
        correlation_id: uuid::Uuid,
        user_id: UserId,
        device_name: String,
    ) -> AuthAction {
        let email = match env.accounts.get_user_email(user_id).await {
            Ok(email) => email,
            Err(err) => {
                return AuthAction::PasskeyRegistrationFailed {
                    correlation_id,
                    error: err.to_string(),
                };
            }
        };

        let challenge = match env
            .webauthn
            .generate_registration_challenge(user_id, &email, &device_name)
            .await
        {
            Ok(challenge) => challenge,
            Err(err) => {
                return AuthAction::PasskeyRegistrationFailed {
                    correlation_id,
                    error: err.to_string(),
                };
            }
        };

        let ttl = chrono::Duration::minutes(config.challenge_ttl_minutes);
        if let Err(err) = env
            .challenges
            .store_challenge(user_id, challenge.challenge_id.clone(), ttl)
            .await
        {
            return AuthAction::PasskeyRegistrationFailed {
                correlation_id,
                error: err.to_string(),
            };
        }

        AuthAction::PasskeyRegistrationChallengeGenerated {
            correlation_id,
            user_id,
            challenge_id: challenge.challenge_id,
            challenge: challenge.challenge,
            rp_id: config.rp_id,
            user_email: email.clone(),
            user_display_name: email,
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn perform_registration_complete(
        env: AuthEnvironment<O, E, W, S, T, R, OT, C, RL, AM, TA>,
        config: PasskeyConfig,
        correlation_id: uuid::Uuid,
        user_id: UserId,
        device_id: DeviceId,
        challenge_id: String,
        attestation_response: String,
    ) -> AuthAction {
        match env.challenges.consume_challenge(user_id, &challenge_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return AuthAction::PasskeyRegistrationFailed {
                    correlation_id,
                    error: "challenge expired or already used".to_string(),
                };
            }
            Err(err) => {
                return AuthAction::PasskeyRegistrationFailed {
                    correlation_id,
                    error: err.to_string(),
                };
            }
        }

        let result = match env
            .webauthn
            .verify_registration(&challenge_id, &attestation_response, &config.origin, &config.rp_id)
            .await
        {
            Ok(result) => result,
            Err(err) => {
                return AuthAction::PasskeyRegistrationFailed {
                    correlation_id,
                    error: err.to_string(),
                };
            }
        };

        if let Err(err) = env
            .accounts
            .create_passkey_credential(user_id, result.credential_id.clone(), result.public_key, None)
            .await
        {
            return AuthAction::PasskeyRegistrationFailed {
                correlation_id,
                error: err.to_string(),
            };
        }

        AuthAction::PasskeyRegistrationSuccess {
            correlation_id,
            user_id,
            device_id,
            credential_id: result.credential_id,
        }
    }

    async fn perform_login_initiate(
        env: AuthEnvironment<O, E, W, S, T, R, OT, C, RL, AM, TA>,
        config: PasskeyConfig,
        correlation_id: uuid::Uuid,
        username: String,
    ) -> AuthAction {
        let user_id = match env.accounts.find_user_id_by_email(&username).await {
            Ok(user_id) => user_id,
            Err(_) => {
                return AuthAction::PasskeyAuthenticationFailed {
                    correlation_id,
                    error: "invalid_credentials".to_string(),
                };
            }
        };

        let summaries = match env.accounts.list_passkey_credentials(user_id).await {
            Ok(summaries) => summaries,
            Err(err) => {
                return AuthAction::PasskeyAuthenticationFailed {
                    correlation_id,
                    error: err.to_string(),
                };
            }
        };

        let mut credentials = Vec::with_capacity(summaries.len());
        for summary in &summaries {
            match env.accounts.get_passkey_credential(&summary.credential_id).await {
                Ok(credential) => credentials.push(credential),
                Err(err) => {
                    tracing::warn!(
                        credential_id = %summary.credential_id,
                        error = %err,
                        "passkey listed but could not be loaded for assertion"
                    );
                }
            }
        }

        if credentials.is_empty() {
            return AuthAction::PasskeyAuthenticationFailed {
                correlation_id,
                error: "no_credentials".to_string(),
            };
        }

        let allowed_credentials: Vec<String> = credentials.iter().map(|c| c.credential_id.clone()).collect();

        let challenge = match env.webauthn.generate_authentication_challenge(user_id, credentials).await {
            Ok(challenge) => challenge,
            Err(err) => {
                return AuthAction::PasskeyAuthenticationFailed {
                    correlation_id,
                    error: err.to_string(),
                };
            }
        };

        let ttl = chrono::Duration::minutes(config.challenge_ttl_minutes);
        if let Err(err) = env
            .challenges
            .store_challenge(user_id, challenge.challenge_id.clone(), ttl)
            .await
        {
            return AuthAction::PasskeyAuthenticationFailed {
                correlation_id,
                error: err.to_string(),
            };
        }

        AuthAction::PasskeyLoginChallengeGenerated {
            correlation_id,
            challenge_id: challenge.challenge_id,
            challenge: challenge.challenge,
            allowed_credentials,
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn perform_login_complete(
        env: AuthEnvironment<O, E, W, S, T, R, OT, C, RL, AM, TA>,
        config: PasskeyConfig,
        correlation_id: uuid::Uuid,
        challenge_id: String,
        credential_id: String,
        assertion_response: String,
        ip_address: IpAddr,
        user_agent: String,
        fingerprint: Option<DeviceFingerprint>,
    ) -> AuthAction {
        if let Err(err) = env
            .rate_limiter
            .check_and_record(&credential_id, config.rate_limit_max_attempts, config.rate_limit_window)
            .await
        {
            return match err {
                AuthError::TooManyAttempts { .. } => AuthAction::PasskeyAuthenticationFailed {
                    correlation_id,
                    error: "rate_limited".to_string(),
                },
                other => AuthAction::PasskeyAuthenticationFailed {
                    correlation_id,
                    error: other.to_string(),
                },
            };
        }

        let credential = match env.accounts.get_passkey_credential(&credential_id).await {
            Ok(credential) => credential,
            Err(_) => {
                return AuthAction::PasskeyAuthenticationFailed {
                    correlation_id,
                    error: "credential_not_found".to_string(),
                };
            }
        };

        match env.challenges.consume_challenge(credential.user_id, &challenge_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return AuthAction::PasskeyAuthenticationFailed {
                    correlation_id,
                    error: "challenge expired or already used".to_string(),
                };
            }
            Err(err) => {
                return AuthAction::PasskeyAuthenticationFailed {
                    correlation_id,
                    error: err.to_string(),
                };
            }
        }

        let result = match env
            .webauthn
            .verify_authentication(&challenge_id, &assertion_response, &credential, &config.origin, &config.rp_id)
            .await
        {
            Ok(result) => result,
            Err(err) => {
                return AuthAction::PasskeyAuthenticationFailed {
                    correlation_id,
                    error: err.to_string(),
                };
            }
        };

        if let Err(err) = env.accounts.update_passkey_signature_count(&credential_id, result.counter).await {
            return match err {
                AuthError::SignatureCounterRegression => AuthAction::PasskeyAuthenticationFailed {
                    correlation_id,
                    error: "signature_counter_regression".to_string(),
                },
                other => AuthAction::PasskeyAuthenticationFailed {
                    correlation_id,
                    error: other.to_string(),
                },
            };
        }

        let email = match env.accounts.get_user_email(result.user_id).await {
            Ok(email) => email,
            Err(err) => {
                return AuthAction::LoginFailed {
                    correlation_id,
                    error: "internal_error".to_string(),
                    error_description: Some(err.to_string()),
                };
            }
        };

        let context = LoginContext {
            user_id: Some(result.user_id),
            email: email.clone(),
            ip_address,
            user_agent: user_agent.clone(),
            device_id: Some(result.device_id),
            last_login_location: None,
            last_login_at: None,
            fingerprint,
        };

        let risk = match env.risk.calculate_login_risk(&context).await {
            Ok(assessment) => assessment,
            Err(err) => {
                tracing::warn!(error = %err, "risk assessment failed, treating passkey login as high risk");
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

        let now = Utc::now();
        let login_risk_score = match risk.level.effective() {
            crate::providers::RiskLevel::Low => 0.0,
            crate::providers::RiskLevel::Medium => 0.5,
            crate::providers::RiskLevel::High | crate::providers::RiskLevel::Unknown => 1.0,
        };
        let session = Session {
            session_id: SessionId::new(),
            user_id: result.user_id,
            device_id: result.device_id,
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

impl<O, E, W, S, T, R, OT, C, RL, AM, TA> Reducer for PasskeyReducer<O, E, W, S, T, R, OT, C, RL, AM, TA>
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
        _state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Vec<Effect<Self::Action>> {
        match action {
            AuthAction::InitiatePasskeyRegistration {
                correlation_id,
                user_id,
                device_name,
            } => {
                let env = env.clone();
                let config = self.config.clone();
                vec![Effect::Future(Box::pin(async move {
                    Some(Self::perform_registration_initiate(env, config, correlation_id, user_id, device_name).await)
                }))]
            }

            AuthAction::CompletePasskeyRegistration {
                correlation_id,
                user_id,
                device_id,
                challenge_id,
                attestation_response,
                ..
            } => {
                let env = env.clone();
                let config = self.config.clone();
                vec![Effect::Future(Box::pin(async move {
                    Some(
                        Self::perform_registration_complete(
                            env,
                            config,
                            correlation_id,
                            user_id,
                            device_id,
                            challenge_id,
                            attestation_response,
                        )
                        .await,
                    )
                }))]
            }

            AuthAction::PasskeyRegistrationChallengeGenerated { .. } => vec![Effect::None],
            AuthAction::PasskeyRegistrationSuccess { .. } => vec![Effect::None],
            AuthAction::PasskeyRegistrationFailed { .. } => vec![Effect::None],

            AuthAction::InitiatePasskeyLogin {
                correlation_id,
                username,
                ip_address: _,
                user_agent: _,
            } => {
                let env = env.clone();
                let config = self.config.clone();
                vec![Effect::Future(Box::pin(async move {
                    Some(Self::perform_login_initiate(env, config, correlation_id, username).await)
                }))]
            }

            AuthAction::CompletePasskeyLogin {
                correlation_id,
                challenge_id,
                credential_id,
                assertion_response,
                ip_address,
                user_agent,
                fingerprint,
            } => {
                let env = env.clone();
                let config = self.config.clone();
                vec![Effect::Future(Box::pin(async move {
                    Some(
                        Self::perform_login_complete(
                            env,
                            config,
                            correlation_id,
                            challenge_id,
                            credential_id,
                            assertion_response,
                            ip_address,
                            user_agent,
                            fingerprint,
                        )
                        .await,
                    )
                }))]
            }

            AuthAction::PasskeyLoginChallengeGenerated { .. } => vec![Effect::None],
            AuthAction::PasskeyAuthenticationFailed { .. } => vec![Effect::None],

            AuthAction::ListPasskeyCredentials { correlation_id, user_id } => {
                let env = env.clone();
                vec![Effect::Future(Box::pin(async move {
                    let credentials = match env.accounts.list_passkey_credentials(user_id).await {
                        Ok(credentials) => credentials,
                        Err(err) => {
                            tracing::warn!(error = %err, "failed to list passkey credentials");
                            Vec::new()
                        }
                    };
                    Some(AuthAction::PasskeyCredentialsListed {
                        correlation_id,
                        user_id,
                        credentials,
                    })
                }))]
            }

            AuthAction::DeletePasskeyCredential {
                correlation_id,
                user_id,
                credential_id,
            } => {
                let env = env.clone();
                vec![Effect::Future(Box::pin(async move {
                    match env.accounts.delete_passkey_credential(user_id, &credential_id).await {
                        Ok(()) => Some(AuthAction::PasskeyCredentialDeleted {
                            correlation_id,
                            user_id,
                            credential_id,
                        }),
                        Err(err) => Some(AuthAction::PasskeyCredentialDeletionFailed {
                            correlation_id,
                            user_id,
                            credential_id,
                            error: err.to_string(),
                        }),
                    }
                }))]
            }

            AuthAction::PasskeyCredentialsListed { .. } => vec![Effect::None],
            AuthAction::PasskeyCredentialDeleted { .. } => vec![Effect::None],
            AuthAction::PasskeyCredentialDeletionFailed { .. } => vec![Effect::None],

            _ => vec![Effect::None],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{
        MockAccountManager, MockChallengeStore, MockEmailProvider, MockOAuth2Provider,
        MockOAuthTokenStore, MockRateLimiter, MockRiskCalculator, MockSessionStore,
        MockTokenAuthority, MockTokenStore, MockWebAuthnProvider,
    };
    use std::net::Ipv4Addr;

    type TestEnv = AuthEnvironment<
        MockOAuth2Provider,
        MockEmailProvider,
        MockWebAuthnProvider,
        MockSessionStore,
        MockTokenStore,
        MockRiskCalculator,
        MockOAuthTokenStore,
        MockChallengeStore,
        MockRateLimiter,
        MockAccountManager,
        MockTokenAuthority,
    >;

    type TestReducer = PasskeyReducer<
        MockOAuth2Provider,
        MockEmailProvider,
        MockWebAuthnProvider,
        MockSessionStore,
        MockTokenStore,
        MockRiskCalculator,
        MockOAuthTokenStore,
        MockChallengeStore,
        MockRateLimiter,
        MockAccountManager,
        MockTokenAuthority,
    >;

    fn test_env(accounts: MockAccountManager) -> TestEnv {
        AuthEnvironment::new(
            MockOAuth2Provider::new(),
            MockEmailProvider::new(),
            MockWebAuthnProvider::new(),
            MockSessionStore::new(),
            MockTokenStore::new(),
            MockRiskCalculator::new(),
            MockOAuthTokenStore::new(),
            MockChallengeStore::new(),
            MockRateLimiter::new(),
            accounts,
            MockTokenAuthority::new(),
        )
    }

    fn ip() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
    }

    async fn run_future(effects: Vec<Effect<AuthAction>>) -> AuthAction {
        assert_eq!(effects.len(), 1);
        match effects.into_iter().next().unwrap() {
            Effect::Future(fut) => fut.await.expect("passkey step always resolves to an action"),
            other => panic!("expected Effect::Future, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn registration_round_trip_stores_credential() {
        let accounts = MockAccountManager::new();
        let user_id = accounts.seed_user("alice@example.com", "correct-horse1", true);
        let env = test_env(accounts);
        let reducer = TestReducer::new();
        let mut state = AuthState::default();

        let init_effects = reducer.reduce(
            &mut state,
            AuthAction::InitiatePasskeyRegistration {
                correlation_id: uuid::Uuid::new_v4(),
                user_id,
                device_name: "Test Device".to_string(),
            },
            &env,
        );
        let generated = run_future(init_effects).await;
        let challenge_id = match &generated {
            AuthAction::PasskeyRegistrationChallengeGenerated { challenge_id, .. } => challenge_id.clone(),
            other => panic!("expected PasskeyRegistrationChallengeGenerated, got {other:?}"),
        };

        let complete_effects = reducer.reduce(
            &mut state,
            AuthAction::CompletePasskeyRegistration {
                correlation_id: uuid::Uuid::new_v4(),
                user_id,
                device_id: DeviceId::new(),
                challenge_id,
                credential_id: "ignored-client-value".to_string(),
                public_key: vec![],
                attestation_response: "mock-attestation".to_string(),
            },
            &env,
        );
        let result = run_future(complete_effects).await;
        match result {
            AuthAction::PasskeyRegistrationSuccess { user_id: uid, .. } => assert_eq!(uid, user_id),
            other => panic!("expected PasskeyRegistrationSuccess, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn registration_completion_rejects_replayed_challenge() {
        let accounts = MockAccountManager::new();
        let user_id = accounts.seed_user("alice@example.com", "correct-horse1", true);
        let env = test_env(accounts);
        let reducer = TestReducer::new();
        let mut state = AuthState::default();

        let init_effects = reducer.reduce(
            &mut state,
            AuthAction::InitiatePasskeyRegistration {
                correlation_id: uuid::Uuid::new_v4(),
                user_id,
                device_name: "Test Device".to_string(),
            },
            &env,
        );
        let generated = run_future(init_effects).await;
        let challenge_id = match &generated {
            AuthAction::PasskeyRegistrationChallengeGenerated { challenge_id, .. } => challenge_id.clone(),
            other => panic!("expected PasskeyRegistrationChallengeGenerated, got {other:?}"),
        };

        let complete_action = |challenge_id: String| AuthAction::CompletePasskeyRegistration {
            correlation_id: uuid::Uuid::new_v4(),
            user_id,
            device_id: DeviceId::new(),
            challenge_id,
            credential_id: "ignored".to_string(),
            public_key: vec![],
            attestation_response: "mock-attestation".to_string(),
        };

        let first = reducer.reduce(&mut state, complete_action(challenge_id.clone()), &env);
        run_future(first).await;

        let second = reducer.reduce(&mut state, complete_action(challenge_id), &env);
        match run_future(second).await {
            AuthAction::PasskeyRegistrationFailed { .. } => {}
            other => panic!("expected PasskeyRegistrationFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn login_round_trip_creates_session() {
        let accounts = MockAccountManager::new();
        let user_id = accounts.seed_user("alice@example.com", "correct-horse1", true);
        accounts.seed_passkey("cred-1", user_id, vec![1, 2, 3], 0);
        let env = test_env(accounts);
        let reducer = TestReducer::new();
        let mut state = AuthState::default();

        let init_effects = reducer.reduce(
            &mut state,
            AuthAction::InitiatePasskeyLogin {
                correlation_id: uuid::Uuid::new_v4(),
                username: "alice@example.com".to_string(),
                ip_address: ip(),
                user_agent: "test-agent".to_string(),
            },
            &env,
        );
        let generated = run_future(init_effects).await;
        let challenge_id = match &generated {
            AuthAction::PasskeyLoginChallengeGenerated { challenge_id, allowed_credentials, .. } => {
                assert!(allowed_credentials.contains(&"cred-1".to_string()));
                challenge_id.clone()
            }
            other => panic!("expected PasskeyLoginChallengeGenerated, got {other:?}"),
        };

        let complete_effects = reducer.reduce(
            &mut state,
            AuthAction::CompletePasskeyLogin {
                correlation_id: uuid::Uuid::new_v4(),
                challenge_id,
                credential_id: "cred-1".to_string(),
                assertion_response: "mock-assertion".to_string(),
                ip_address: ip(),
                user_agent: "test-agent".to_string(),
                fingerprint: None,
            },
            &env,
        );
        match run_future(complete_effects).await {
            AuthAction::LoginSucceeded { session, .. } => assert_eq!(session.user_id, user_id),
            other => panic!("expected LoginSucceeded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn login_initiate_fails_for_unknown_user() {
        let env = test_env(MockAccountManager::new());
        let reducer = TestReducer::new();
        let mut state = AuthState::default();

        let effects = reducer.reduce(
            &mut state,
            AuthAction::InitiatePasskeyLogin {
                correlation_id: uuid::Uuid::new_v4(),
                username: "nobody@example.com".to_string(),
                ip_address: ip(),
                user_agent: "test-agent".to_string(),
            },
            &env,
        );
        match run_future(effects).await {
            AuthAction::PasskeyAuthenticationFailed { error, .. } => assert_eq!(error, "invalid_credentials"),
            other => panic!("expected PasskeyAuthenticationFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn list_and_delete_credential() {
        let accounts = MockAccountManager::new();
        let user_id = accounts.seed_user("alice@example.com", "correct-horse1", true);
        accounts.seed_passkey("cred-1", user_id, vec![1, 2, 3], 0);
        let env = test_env(accounts);
        let reducer = TestReducer::new();
        let mut state = AuthState::default();

        let list_effects = reducer.reduce(
            &mut state,
            AuthAction::ListPasskeyCredentials {
                correlation_id: uuid::Uuid::new_v4(),
                user_id,
            },
            &env,
        );
        match run_future(list_effects).await {
            AuthAction::PasskeyCredentialsListed { credentials, .. } => assert_eq!(credentials.len(), 1),
            other => panic!("expected PasskeyCredentialsListed, got {other:?}"),
        }

        let delete_effects = reducer.reduce(
            &mut state,
            AuthAction::DeletePasskeyCredential {
                correlation_id: uuid::Uuid::new_v4(),
                user_id,
                credential_id: "cred-1".to_string(),
            },
            &env,
        );
        match run_future(delete_effects).await {
            AuthAction::PasskeyCredentialDeleted { credential_id, .. } => assert_eq!(credential_id, "cred-1"),
            other => panic!("expected PasskeyCredentialDeleted, got {other:?}"),
        }
    }
}
