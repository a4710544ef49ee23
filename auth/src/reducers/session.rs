//! Session validation and logout reducer (C8).
//!
//! # Flow
//!
//! ```text
//! ValidateSession → look up session → expired? SessionExpired : bump
//!                    last_active (and expires_at, if sliding) → SessionValidated
//! Logout           → delete session → LogoutSuccess
//! ```
//!
//! Session *creation* happens inside [`crate::reducers::login::LoginReducer`]
//! and [`crate::reducers::oauth::OAuthReducer`] as part of each flow's
//! terminal action; this reducer only handles the read/revoke side once a
//! session already exists.

use crate::account::AccountManagerOps;
use crate::actions::AuthAction;
use crate::environment::AuthEnvironment;
use crate::providers::{
    ChallengeStore, EmailProvider, OAuth2Provider, OAuthTokenStore, RateLimiter, RiskCalculator,
    SessionStore, TokenStore, WebAuthnProvider,
};
use crate::state::{AuthState, SessionId};
use crate::token::TokenAuthorityOps;
use aegis_core::effect::Effect;
use aegis_core::reducer::Reducer;
use chrono::Utc;

/// Session validation, refresh, and logout reducer.
#[derive(Debug, Clone, Default)]
pub struct SessionReducer<O, E, W, S, T, R, OT, C, RL, AM, TA> {
    _phantom: std::marker::PhantomData<(O, E, W, S, T, R, OT, C, RL, AM, TA)>,
}

impl<O, E, W, S, T, R, OT, C, RL, AM, TA> SessionReducer<O, E, W, S, T, R, OT, C, RL, AM, TA> {
    /// Create a new session reducer.
    #[must_use]
    pub fn new() -> Self {
        Self { _phantom: std::marker::PhantomData }
    }
}

impl<O, E, W, S, T, R, OT, C, RL, AM, TA> SessionReducer<O, E, W, S, T, R, OT, C, RL, AM, TA>
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
    async fn perform_validate(
        env: AuthEnvironment<O, E, W, S, T, R, OT, C, RL, AM, TA>,
        correlation_id: uuid::Uuid,
        session_id: SessionId,
    ) -> AuthAction {
        let mut session = match env.sessions.get_session(session_id).await {
            Ok(session) => session,
            Err(_) => return AuthAction::SessionExpired { correlation_id, session_id },
        };

        let now = Utc::now();
        session.last_active = now;
        if session.enable_sliding_refresh {
            session.expires_at = now + session.idle_timeout;
        }

        if let Err(err) = env.sessions.update_session(&session).await {
            tracing::warn!(error = %err, "failed to persist session refresh");
        }

        AuthAction::SessionValidated { correlation_id, session }
    }

    async fn perform_logout(
        env: AuthEnvironment<O, E, W, S, T, R, OT, C, RL, AM, TA>,
        correlation_id: uuid::Uuid,
        session_id: SessionId,
    ) -> AuthAction {
        if let Err(err) = env.sessions.delete_session(session_id).await {
            tracing::warn!(error = %err, "failed to delete session on logout");
        }
        AuthAction::LogoutSuccess { correlation_id, session_id }
    }
}

impl<O, E, W, S, T, R, OT, C, RL, AM, TA> Reducer for SessionReducer<O, E, W, S, T, R, OT, C, RL, AM, TA>
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
            AuthAction::ValidateSession { correlation_id, session_id, ip_address: _ } => {
                let env = env.clone();
                vec![Effect::Future(Box::pin(async move {
                    Some(Self::perform_validate(env, correlation_id, session_id).await)
                }))]
            },
            AuthAction::SessionValidated { session, .. } => {
                state.session = Some(session);
                vec![Effect::None]
            },
            AuthAction::SessionExpired { .. } => {
                state.session = None;
                vec![Effect::None]
            },
            AuthAction::Logout { correlation_id, session_id } => {
                let env = env.clone();
                vec![Effect::Future(Box::pin(async move {
                    Some(Self::perform_logout(env, correlation_id, session_id).await)
                }))]
            },
            AuthAction::LogoutSuccess { .. } => {
                state.session = None;
                vec![Effect::None]
            },
            _ => vec![Effect::None],
        }
    }
}
