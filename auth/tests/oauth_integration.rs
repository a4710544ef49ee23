//! Integration tests for the federated OAuth2 login flow, driven end-to-end
//! through the composed [`AuthReducer`] rather than `OAuthReducer` in
//! isolation (see `auth/src/reducers/oauth.rs`'s own unit tests for that).

use aegis_auth::mocks::{
    MockAccountManager, MockChallengeStore, MockEmailProvider, MockOAuth2Provider,
    MockOAuthTokenStore, MockRateLimiter, MockRiskCalculator, MockSessionStore,
    MockTokenAuthority, MockTokenStore, MockWebAuthnProvider,
};
use aegis_auth::state::OAuthProvider;
use aegis_auth::{AuthAction, AuthEnvironment, AuthReducer, AuthState};
use aegis_core::effect::Effect;
use aegis_core::reducer::Reducer;
use std::net::{IpAddr, Ipv4Addr};

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
    IpAddr::V4(Ipv4Addr::new(192, 168, 1, 100))
}

async fn run_single_future(effects: Vec<Effect<AuthAction>>) -> AuthAction {
    let mut futures: Vec<_> = effects
        .into_iter()
        .filter(|e| !matches!(e, Effect::None))
        .collect();
    assert_eq!(futures.len(), 1, "expected exactly one non-trivial effect");
    match futures.remove(0) {
        Effect::Future(fut) => fut.await.expect("step always resolves to an action"),
        other => panic!("expected Effect::Future, got {other:?}"),
    }
}

#[tokio::test]
async fn oauth_flow_complete_happy_path_creates_session() {
    let env = test_env();
    let reducer = TestReducer::default();
    let mut state = AuthState::default();

    let effects = reducer.reduce(
        &mut state,
        AuthAction::InitiateOAuth {
            correlation_id: uuid::Uuid::new_v4(),
            provider: OAuthProvider::Google,
            ip_address: ip(),
            user_agent: "Mozilla/5.0 (Test)".to_string(),
            fingerprint: None,
        },
        &env,
    );
    assert!(state.oauth_state.is_some());
    let url_ready = run_single_future(effects).await;
    let AuthAction::OAuthAuthorizationUrlReady { .. } = url_ready else {
        panic!("expected OAuthAuthorizationUrlReady, got {url_ready:?}");
    };

    let state_param = state.oauth_state.as_ref().unwrap().state_param.clone();
    let callback_effects = reducer.reduce(
        &mut state,
        AuthAction::OAuthCallback {
            correlation_id: uuid::Uuid::new_v4(),
            code: "test_auth_code_123".to_string(),
            state: state_param,
            ip_address: ip(),
            user_agent: "Mozilla/5.0 (Test)".to_string(),
            fingerprint: None,
        },
        &env,
    );
    assert!(state.oauth_state.is_none());
    let success = run_single_future(callback_effects).await;
    let AuthAction::OAuthSuccess { .. } = &success else {
        panic!("expected OAuthSuccess, got {success:?}");
    };

    let terminal_effects = reducer.reduce(&mut state, success, &env);
    let terminal = run_single_future(terminal_effects).await;
    let AuthAction::LoginSucceeded { session, .. } = terminal.clone() else {
        panic!("expected LoginSucceeded, got {terminal:?}");
    };
    let _ = reducer.reduce(&mut state, terminal, &env);

    assert!(state.session.is_some());
    let stored = state.session.as_ref().unwrap();
    assert_eq!(stored.email, session.email);
    assert_eq!(stored.oauth_provider, Some(OAuthProvider::Google));
    assert_eq!(stored.ip_address, ip());
}

#[tokio::test]
async fn oauth_callback_rejects_invalid_csrf_state() {
    let env = test_env();
    let reducer = TestReducer::default();
    let mut state = AuthState::default();

    let _ = reducer.reduce(
        &mut state,
        AuthAction::InitiateOAuth {
            correlation_id: uuid::Uuid::new_v4(),
            provider: OAuthProvider::Google,
            ip_address: ip(),
            user_agent: "Mozilla/5.0 (Test)".to_string(),
            fingerprint: None,
        },
        &env,
    );
    assert!(state.oauth_state.is_some());

    let effects = reducer.reduce(
        &mut state,
        AuthAction::OAuthCallback {
            correlation_id: uuid::Uuid::new_v4(),
            code: "test_auth_code_123".to_string(),
            state: "invalid_csrf_state_12345".to_string(),
            ip_address: ip(),
            user_agent: "Mozilla/5.0 (Test)".to_string(),
            fingerprint: None,
        },
        &env,
    );

    assert!(state.oauth_state.is_none());
    let result = run_single_future(effects).await;
    let AuthAction::OAuthFailed { error, .. } = result else {
        panic!("expected OAuthFailed, got {result:?}");
    };
    assert_eq!(error, "invalid_state");
    assert!(state.session.is_none());
}

#[tokio::test]
async fn oauth_callback_without_prior_initiation_fails() {
    let env = test_env();
    let reducer = TestReducer::default();
    let mut state = AuthState::default();

    let effects = reducer.reduce(
        &mut state,
        AuthAction::OAuthCallback {
            correlation_id: uuid::Uuid::new_v4(),
            code: "test_auth_code_123".to_string(),
            state: "some_state".to_string(),
            ip_address: ip(),
            user_agent: "Mozilla/5.0 (Test)".to_string(),
            fingerprint: None,
        },
        &env,
    );

    assert!(state.oauth_state.is_none());
    let result = run_single_future(effects).await;
    assert!(matches!(result, AuthAction::OAuthFailed { .. }));
    assert!(state.session.is_none());
}

#[tokio::test]
async fn csrf_states_are_unique_across_initiations() {
    let env = test_env();
    let reducer = TestReducer::default();

    let mut states = Vec::new();
    for _ in 0..10 {
        let mut state = AuthState::default();
        let _ = reducer.reduce(
            &mut state,
            AuthAction::InitiateOAuth {
                correlation_id: uuid::Uuid::new_v4(),
                provider: OAuthProvider::Google,
                ip_address: ip(),
                user_agent: "Mozilla/5.0 (Test)".to_string(),
                fingerprint: None,
            },
            &env,
        );
        states.push(state.oauth_state.unwrap().state_param);
    }

    let unique_count = states.iter().collect::<std::collections::HashSet<_>>().len();
    assert_eq!(unique_count, 10, "CSRF states should be unique");
    for state_param in &states {
        assert!(!state_param.is_empty());
        assert!(state_param.len() > 20, "CSRF state should be sufficiently long");
    }
}

#[tokio::test]
async fn session_created_by_oauth_can_be_validated_and_logged_out() {
    let env = test_env();
    let reducer = TestReducer::default();
    let mut state = AuthState::default();

    let init_effects = reducer.reduce(
        &mut state,
        AuthAction::InitiateOAuth {
            correlation_id: uuid::Uuid::new_v4(),
            provider: OAuthProvider::GitHub,
            ip_address: ip(),
            user_agent: "Mozilla/5.0 (Test)".to_string(),
            fingerprint: None,
        },
        &env,
    );
    run_single_future(init_effects).await;
    let state_param = state.oauth_state.as_ref().unwrap().state_param.clone();

    let callback_effects = reducer.reduce(
        &mut state,
        AuthAction::OAuthCallback {
            correlation_id: uuid::Uuid::new_v4(),
            code: "test_auth_code_123".to_string(),
            state: state_param,
            ip_address: ip(),
            user_agent: "Mozilla/5.0 (Test)".to_string(),
            fingerprint: None,
        },
        &env,
    );
    let success = run_single_future(callback_effects).await;
    let login_effects = reducer.reduce(&mut state, success, &env);
    let terminal = run_single_future(login_effects).await;
    let _ = reducer.reduce(&mut state, terminal.clone(), &env);
    let AuthAction::LoginSucceeded { session, .. } = terminal else {
        panic!("expected LoginSucceeded");
    };

    let validate_effects = reducer.reduce(
        &mut state,
        AuthAction::ValidateSession {
            correlation_id: uuid::Uuid::new_v4(),
            session_id: session.session_id,
            ip_address: ip(),
        },
        &env,
    );
    let validated = run_single_future(validate_effects).await;
    assert!(matches!(validated, AuthAction::SessionValidated { .. }));
    let _ = reducer.reduce(&mut state, validated, &env);
    assert!(state.session.is_some());

    let logout_effects = reducer.reduce(
        &mut state,
        AuthAction::Logout { correlation_id: uuid::Uuid::new_v4(), session_id: session.session_id },
        &env,
    );
    let logged_out = run_single_future(logout_effects).await;
    assert!(matches!(logged_out, AuthAction::LogoutSuccess { .. }));
    let _ = reducer.reduce(&mut state, logged_out, &env);
    assert!(state.session.is_none());

    let still_exists = env.sessions.exists(session.session_id).await.unwrap();
    assert!(!still_exists);
}
