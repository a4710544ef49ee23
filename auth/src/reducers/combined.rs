//! Top-level reducer wiring together every authentication flow.
//!
//! Grounded on [`aegis_core::composition::combine_reducers`]'s
//! run-every-reducer-in-sequence-and-concatenate-effects semantics, but
//! expressed as a concrete struct rather than `Vec<Box<dyn Reducer<..>>>` so
//! that [`AuthReducer`] stays `Clone` — [`aegis_runtime::Store`] needs its
//! reducer to be `Clone` to spawn effect-execution tasks, and a `Vec` of
//! trait objects can't derive that.

use crate::account::AccountManagerOps;
use crate::actions::AuthAction;
use crate::environment::AuthEnvironment;
use crate::providers::{
    ChallengeStore, EmailProvider, OAuth2Provider, OAuthTokenStore, RateLimiter, RiskCalculator,
    SessionStore, TokenStore, WebAuthnProvider,
};
use crate::reducers::{LoginReducer, OAuthReducer, PasskeyReducer, SessionReducer};
use crate::state::AuthState;
use crate::token::TokenAuthorityOps;
use aegis_core::effect::Effect;
use aegis_core::reducer::Reducer;

/// Combined reducer for every authentication flow this server exposes.
///
/// Local login and federated OAuth both terminate in the same
/// [`AuthAction::LoginSucceeded`]/[`AuthAction::LoginFailed`] pair; running
/// every reducer over every action lets [`LoginReducer`]'s `LoginSucceeded`
/// arm apply the session to state no matter which flow produced it, and lets
/// [`SessionReducer`] handle validation/logout for whatever session either
/// flow created, exactly as `combine_reducers` would sequence them.
///
/// Passkey/`WebAuthn` login shares the same terminal
/// [`AuthAction::LoginSucceeded`]/[`AuthAction::LoginFailed`] pair, so
/// [`PasskeyReducer`] composes in alongside the other two flows rather than
/// needing its own session handling.
#[derive(Debug, Clone)]
pub struct AuthReducer<O, E, W, S, T, R, OT, C, RL, AM, TA> {
    login: LoginReducer<O, E, W, S, T, R, OT, C, RL, AM, TA>,
    oauth: OAuthReducer<O, E, W, S, T, R, OT, C, RL, AM, TA>,
    passkey: PasskeyReducer<O, E, W, S, T, R, OT, C, RL, AM, TA>,
    session: SessionReducer<O, E, W, S, T, R, OT, C, RL, AM, TA>,
}

impl<O, E, W, S, T, R, OT, C, RL, AM, TA> AuthReducer<O, E, W, S, T, R, OT, C, RL, AM, TA> {
    /// Create the combined reducer with default flow configurations.
    #[must_use]
    pub fn new() -> Self {
        Self {
            login: LoginReducer::new(),
            oauth: OAuthReducer::new(),
            passkey: PasskeyReducer::new(),
            session: SessionReducer::new(),
        }
    }

    /// Create the combined reducer from already-configured flow reducers.
    #[must_use]
    pub fn from_reducers(
        login: LoginReducer<O, E, W, S, T, R, OT, C, RL, AM, TA>,
        oauth: OAuthReducer<O, E, W, S, T, R, OT, C, RL, AM, TA>,
        passkey: PasskeyReducer<O, E, W, S, T, R, OT, C, RL, AM, TA>,
        session: SessionReducer<O, E, W, S, T, R, OT, C, RL, AM, TA>,
    ) -> Self {
        Self { login, oauth, passkey, session }
    }
}

impl<O, E, W, S, T, R, OT, C, RL, AM, TA> Default for AuthReducer<O, E, W, S, T, R, OT, C, RL, AM, TA> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O, E, W, S, T, R, OT, C, RL, AM, TA> Reducer for AuthReducer<O, E, W, S, T, R, OT, C, RL, AM, TA>
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
        let mut effects = self.login.reduce(state, action.clone(), env);
        effects.extend(self.oauth.reduce(state, action.clone(), env));
        effects.extend(self.passkey.reduce(state, action.clone(), env));
        effects.extend(self.session.reduce(state, action, env));
        effects
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
    use std::net::{IpAddr, Ipv4Addr};

    type TestReducer = AuthReducer<
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

    fn test_env(accounts: MockAccountManager) -> AuthEnvironment<
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
    > {
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

    #[tokio::test]
    async fn local_login_action_is_ignored_by_oauth_half() {
        let reducer = TestReducer::default();
        let accounts = MockAccountManager::new();
        accounts.seed_user("alice@example.com", "correct-horse1", true);
        let env = test_env(accounts);
        let mut state = AuthState::default();

        let effects = reducer.reduce(
            &mut state,
            AuthAction::Login {
                correlation_id: uuid::Uuid::new_v4(),
                email: "alice@example.com".to_string(),
                password: "correct-horse1".to_string(),
                ip_address: ip(),
                user_agent: "test-agent".to_string(),
                fingerprint: None,
            },
            &env,
        );

        // All four reducers run; only LoginReducer's arm produces a real effect.
        assert_eq!(effects.len(), 4);
    }

    #[tokio::test]
    async fn session_action_is_handled_by_session_half() {
        use crate::state::{DeviceId, Session, SessionId, UserId};

        let reducer = TestReducer::default();
        let accounts = MockAccountManager::new();
        let env = test_env(accounts);
        let now = chrono::Utc::now();
        let session = Session {
            session_id: SessionId::new(),
            user_id: UserId::new(),
            device_id: DeviceId::new(),
            email: "alice@example.com".to_string(),
            created_at: now,
            last_active: now,
            expires_at: now + chrono::Duration::hours(24),
            ip_address: ip(),
            user_agent: "test-agent".to_string(),
            oauth_provider: None,
            login_risk_score: 0.0,
            idle_timeout: chrono::Duration::minutes(30),
            enable_sliding_refresh: false,
        };
        env.sessions.create_session(&session, chrono::Duration::hours(24)).await.expect("seed session");
        let mut state = AuthState::default();

        let effects = reducer.reduce(
            &mut state,
            AuthAction::ValidateSession {
                correlation_id: uuid::Uuid::new_v4(),
                session_id: session.session_id,
                ip_address: ip(),
            },
            &env,
        );

        // login, oauth, and passkey ignore this action; only session produces a real effect.
        assert_eq!(effects.len(), 4);
    }
}
