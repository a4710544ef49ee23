//! Federated `OAuth2`/`OIDC` login reducer.
//!
//! # Flow
//!
//! ```text
//! 1. InitiateOAuth              → CSRF state stored, authorization URL built
//! 2. OAuthAuthorizationUrlReady → web layer issues a 302 redirect
//! 3. OAuthCallback              → CSRF state validated, code exchanged, user info fetched
//! 4. OAuthSuccess               → account provisioned/linked, risk assessed, session created
//! 5. LoginSucceeded/LoginFailed → terminal event, picked up by `LoginReducer`'s own match
//!    arms when reducers are run through `aegis_core::composition::combine_reducers`
//! ```
//!
//! Account provisioning goes through [`AccountManagerOps::find_or_create_federated_user`]
//! (C5) rather than a direct repository call, so blind-index lookups and
//! uniqueness enforcement stay in one place.

use crate::account::AccountManagerOps;
use crate::actions::{AuthAction, AuthLevel};
use crate::config::OAuthConfig;
use crate::environment::AuthEnvironment;
use crate::providers::{
    ChallengeStore, DeviceFingerprint, EmailProvider, LoginContext, OAuth2Provider,
    OAuthTokenData, OAuthTokenStore, RateLimiter, RiskCalculator, SessionStore, TokenStore,
    WebAuthnProvider,
};
use crate::state::{AuthState, DeviceId, OAuthProvider, OAuthState, Session, SessionId};
use crate::token::TokenAuthorityOps;
use aegis_core::effect::Effect;
use aegis_core::reducer::Reducer;
use chrono::Utc;
use std::marker::PhantomData;
use std::net::IpAddr;

/// Federated `OAuth2`/`OIDC` login reducer.
#[derive(Debug, Clone)]
pub struct OAuthReducer<O, E, W, S, T, R, OT, C, RL, AM, TA> {
    config: OAuthConfig,
    _phantom: PhantomData<(O, E, W, S, T, R, OT, C, RL, AM, TA)>,
}

impl<O, E, W, S, T, R, OT, C, RL, AM, TA> OAuthReducer<O, E, W, S, T, R, OT, C, RL, AM, TA> {
    /// Create a new `OAuth` reducer with the default [`OAuthConfig`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: OAuthConfig::default(),
            _phantom: PhantomData,
        }
    }

    /// Create a new `OAuth` reducer with a custom configuration.
    #[must_use]
    pub fn with_config(config: OAuthConfig) -> Self {
        Self {
            config,
            _phantom: PhantomData,
        }
    }

    fn redirect_uri(&self) -> String {
        format!("{}/auth/oauth/callback", self.config.base_url)
    }
}

impl<O, E, W, S, T, R, OT, C, RL, AM, TA> Default for OAuthReducer<O, E, W, S, T, R, OT, C, RL, AM, TA> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O, E, W, S, T, R, OT, C, RL, AM, TA> OAuthReducer<O, E, W, S, T, R, OT, C, RL, AM, TA>
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
    async fn perform_callback(
        env: AuthEnvironment<O, E, W, S, T, R, OT, C, RL, AM, TA>,
        correlation_id: uuid::Uuid,
        provider: OAuthProvider,
        code: String,
        redirect_uri: String,
        ip_address: IpAddr,
        user_agent: String,
        fingerprint: Option<DeviceFingerprint>,
    ) -> AuthAction {
        let tokens = match env.oauth.exchange_code(provider, &code, &redirect_uri).await {
            Ok(tokens) => tokens,
            Err(err) => {
                return AuthAction::OAuthFailed {
                    correlation_id,
                    error: "code_exchange_failed".to_string(),
                    error_description: Some(err.to_string()),
                };
            }
        };

        let user_info = match env.oauth.fetch_user_info(provider, &tokens.access_token).await {
            Ok(info) => info,
            Err(err) => {
                return AuthAction::OAuthFailed {
                    correlation_id,
                    error: "user_info_failed".to_string(),
                    error_description: Some(err.to_string()),
                };
            }
        };

        AuthAction::OAuthSuccess {
            correlation_id,
            email: user_info.email,
            name: user_info.name,
            provider,
            provider_user_id: user_info.provider_user_id,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            ip_address,
            user_agent,
            fingerprint,
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn perform_success(
        env: AuthEnvironment<O, E, W, S, T, R, OT, C, RL, AM, TA>,
        config: OAuthConfig,
        correlation_id: uuid::Uuid,
        email: String,
        name: Option<String>,
        provider: OAuthProvider,
        access_token: String,
        refresh_token: Option<String>,
        ip_address: IpAddr,
        user_agent: String,
        fingerprint: Option<DeviceFingerprint>,
    ) -> AuthAction {
        let user_id = match env.accounts.find_or_create_federated_user(&email, name).await {
            Ok(user_id) => user_id,
            Err(err) => {
                return AuthAction::LoginFailed {
                    correlation_id,
                    error: "account_provisioning_failed".to_string(),
                    error_description: Some(err.to_string()),
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
            fingerprint,
        };

        let risk = match env.risk.calculate_login_risk(&context).await {
            Ok(assessment) => assessment,
            Err(err) => {
                tracing::warn!(error = %err, "risk assessment failed, treating OAuth login as high risk");
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

        let token_data = OAuthTokenData {
            user_id,
            provider,
            access_token,
            refresh_token,
            expires_at: None,
            stored_at: Utc::now(),
        };
        if let Err(err) = env.oauth_tokens.store_tokens(&token_data).await {
            tracing::warn!(error = %err, "failed to persist OAuth provider tokens");
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
            device_id: DeviceId::new(),
            email,
            created_at: now,
            last_active: now,
            expires_at: now + config.session_duration,
            ip_address,
            user_agent,
            oauth_provider: Some(provider),
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

impl<O, E, W, S, T, R, OT, C, RL, AM, TA> Reducer for OAuthReducer<O, E, W, S, T, R, OT, C, RL, AM, TA>
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
            AuthAction::InitiateOAuth {
                correlation_id,
                provider,
                ip_address: _,
                user_agent: _,
                fingerprint: _,
            } => {
                let state_param = uuid::Uuid::new_v4().to_string();
                state.oauth_state = Some(OAuthState {
                    state_param: state_param.clone(),
                    provider,
                    initiated_at: Utc::now(),
                });

                let env = env.clone();
                let redirect_uri = self.redirect_uri();
                vec![Effect::Future(Box::pin(async move {
                    match env.oauth.build_authorization_url(provider, &state_param, &redirect_uri).await {
                        Ok(authorization_url) => Some(AuthAction::OAuthAuthorizationUrlReady {
                            correlation_id,
                            provider,
                            authorization_url,
                        }),
                        Err(err) => Some(AuthAction::OAuthFailed {
                            correlation_id,
                            error: "authorization_url_failed".to_string(),
                            error_description: Some(err.to_string()),
                        }),
                    }
                }))]
            }

            AuthAction::OAuthAuthorizationUrlReady { .. } => vec![Effect::None],

            AuthAction::OAuthCallback {
                correlation_id,
                code,
                state: state_param,
                ip_address,
                user_agent,
                fingerprint,
            } => {
                let Some(oauth_state) = state.oauth_state.clone() else {
                    return vec![Effect::Future(Box::pin(async move {
                        Some(AuthAction::OAuthFailed {
                            correlation_id,
                            error: "invalid_state".to_string(),
                            error_description: Some("no OAuth flow in progress".to_string()),
                        })
                    }))];
                };
                if oauth_state.state_param != state_param {
                    state.oauth_state = None;
                    return vec![Effect::Future(Box::pin(async move {
                        Some(AuthAction::OAuthFailed {
                            correlation_id,
                            error: "invalid_state".to_string(),
                            error_description: Some("OAuth state mismatch".to_string()),
                        })
                    }))];
                }
                let ttl = chrono::Duration::minutes(self.config.state_ttl_minutes);
                if Utc::now() - oauth_state.initiated_at > ttl {
                    state.oauth_state = None;
                    return vec![Effect::Future(Box::pin(async move {
                        Some(AuthAction::OAuthFailed {
                            correlation_id,
                            error: "state_expired".to_string(),
                            error_description: Some("OAuth flow took too long".to_string()),
                        })
                    }))];
                }
                state.oauth_state = None;

                let env = env.clone();
                let provider = oauth_state.provider;
                let redirect_uri = self.redirect_uri();
                vec![Effect::Future(Box::pin(async move {
                    Some(
                        Self::perform_callback(env, correlation_id, provider, code, redirect_uri, ip_address, user_agent, fingerprint)
                            .await,
                    )
                }))]
            }

            AuthAction::OAuthSuccess {
                correlation_id,
                email,
                name,
                provider,
                provider_user_id: _,
                access_token,
                refresh_token,
                ip_address,
                user_agent,
                fingerprint,
            } => {
                let env = env.clone();
                let config = self.config.clone();
                vec![Effect::Future(Box::pin(async move {
                    Some(
                        Self::perform_success(
                            env,
                            config,
                            correlation_id,
                            email,
                            name,
                            provider,
                            access_token,
                            refresh_token,
                            ip_address,
                            user_agent,
                            fingerprint,
                        )
                        .await,
                    )
                }))]
            }

            AuthAction::OAuthFailed { .. } => {
                state.oauth_state = None;
                vec![Effect::None]
            }

            AuthAction::RefreshOAuthToken {
                correlation_id,
                user_id,
                provider,
            } => {
                let env = env.clone();
                vec![Effect::Future(Box::pin(async move {
                    let stored = match env.oauth_tokens.get_tokens(user_id, provider).await {
                        Ok(Some(tokens)) => tokens,
                        Ok(None) => {
                            return Some(AuthAction::OAuthFailed {
                                correlation_id,
                                error: "no_refresh_token".to_string(),
                                error_description: Some("no stored OAuth tokens for this user/provider".to_string()),
                            });
                        }
                        Err(err) => {
                            return Some(AuthAction::OAuthFailed {
                                correlation_id,
                                error: "internal_error".to_string(),
                                error_description: Some(err.to_string()),
                            });
                        }
                    };
                    let Some(refresh_token) = stored.refresh_token.as_deref() else {
                        return Some(AuthAction::OAuthFailed {
                            correlation_id,
                            error: "no_refresh_token".to_string(),
                            error_description: Some("provider never issued a refresh token".to_string()),
                        });
                    };
                    match env.oauth.refresh_token(provider, refresh_token).await {
                        Ok(refreshed) => {
                            let token_data = OAuthTokenData {
                                user_id,
                                provider,
                                access_token: refreshed.access_token.clone(),
                                refresh_token: refreshed.refresh_token.or(stored.refresh_token),
                                expires_at: refreshed.expires_at,
                                stored_at: Utc::now(),
                            };
                            if let Err(err) = env.oauth_tokens.store_tokens(&token_data).await {
                                tracing::warn!(error = %err, "failed to persist refreshed OAuth tokens");
                            }
                            Some(AuthAction::OAuthTokenRefreshed {
                                correlation_id,
                                user_id,
                                provider,
                                access_token: refreshed.access_token,
                                expires_at: refreshed.expires_at,
                            })
                        }
                        Err(err) => Some(AuthAction::OAuthFailed {
                            correlation_id,
                            error: "refresh_failed".to_string(),
                            error_description: Some(err.to_string()),
                        }),
                    }
                }))]
            }

            AuthAction::OAuthTokenRefreshed { .. } => vec![Effect::None],

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

    type TestReducer = OAuthReducer<
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

    fn test_env() -> TestEnv {
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
            MockAccountManager::new(),
            MockTokenAuthority::new(),
        )
    }

    fn ip() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
    }

    async fn run_future(effects: Vec<Effect<AuthAction>>) -> AuthAction {
        assert_eq!(effects.len(), 1);
        match effects.into_iter().next().unwrap() {
            Effect::Future(fut) => fut.await.expect("oauth step always resolves to an action"),
            other => panic!("expected Effect::Future, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn initiate_oauth_stores_csrf_state_and_builds_url() {
        let env = test_env();
        let reducer = TestReducer::new();
        let mut state = AuthState::default();

        let effects = reducer.reduce(
            &mut state,
            AuthAction::InitiateOAuth {
                correlation_id: uuid::Uuid::new_v4(),
                provider: OAuthProvider::Google,
                ip_address: ip(),
                user_agent: "test-agent".to_string(),
                fingerprint: None,
            },
            &env,
        );
        assert!(state.oauth_state.is_some());
        let result = run_future(effects).await;
        match result {
            AuthAction::OAuthAuthorizationUrlReady { authorization_url, .. } => {
                assert!(authorization_url.contains("google"));
            }
            other => panic!("expected OAuthAuthorizationUrlReady, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn callback_with_wrong_state_fails() {
        let env = test_env();
        let reducer = TestReducer::new();
        let mut state = AuthState::default();
        state.oauth_state = Some(OAuthState {
            state_param: "expected-state".to_string(),
            provider: OAuthProvider::Google,
            initiated_at: Utc::now(),
        });

        let effects = reducer.reduce(
            &mut state,
            AuthAction::OAuthCallback {
                correlation_id: uuid::Uuid::new_v4(),
                code: "code".to_string(),
                state: "wrong-state".to_string(),
                ip_address: ip(),
                user_agent: "test-agent".to_string(),
                fingerprint: None,
            },
            &env,
        );
        let result = run_future(effects).await;
        match result {
            AuthAction::OAuthFailed { error, .. } => assert_eq!(error, "invalid_state"),
            other => panic!("expected OAuthFailed, got {other:?}"),
        }
        assert!(state.oauth_state.is_none());
    }

    #[tokio::test]
    async fn full_flow_creates_session_on_success() {
        let env = test_env();
        let reducer = TestReducer::new();
        let mut state = AuthState::default();

        let init_effects = reducer.reduce(
            &mut state,
            AuthAction::InitiateOAuth {
                correlation_id: uuid::Uuid::new_v4(),
                provider: OAuthProvider::Google,
                ip_address: ip(),
                user_agent: "test-agent".to_string(),
                fingerprint: None,
            },
            &env,
        );
        run_future(init_effects).await;
        let state_param = state.oauth_state.as_ref().unwrap().state_param.clone();

        let callback_effects = reducer.reduce(
            &mut state,
            AuthAction::OAuthCallback {
                correlation_id: uuid::Uuid::new_v4(),
                code: "valid-code".to_string(),
                state: state_param,
                ip_address: ip(),
                user_agent: "test-agent".to_string(),
                fingerprint: None,
            },
            &env,
        );
        let success = run_future(callback_effects).await;
        let AuthAction::OAuthSuccess { .. } = &success else {
            panic!("expected OAuthSuccess, got {success:?}");
        };

        let success_effects = reducer.reduce(&mut state, success, &env);
        let terminal = run_future(success_effects).await;
        match &terminal {
            AuthAction::LoginSucceeded { session, .. } => {
                assert_eq!(session.oauth_provider, Some(OAuthProvider::Google));
            }
            other => panic!("expected LoginSucceeded, got {other:?}"),
        }
    }
}
