//! Authentication environment.
//!
//! This module defines the environment type for dependency injection in
//! auth reducers.

use crate::account::AccountManagerOps;
use crate::providers::{
    ChallengeStore, EmailProvider, OAuth2Provider, OAuthTokenStore, RateLimiter, RiskCalculator,
    SessionStore, TokenStore, WebAuthnProvider,
};
use crate::token::TokenAuthorityOps;

/// Authentication environment.
///
/// Contains all external dependencies needed by auth reducers.
///
/// # Type Parameters
///
/// - `O`: `OAuth2` provider
/// - `E`: Email provider
/// - `W`: `WebAuthn` provider
/// - `S`: Session store
/// - `T`: Token store
/// - `R`: Risk calculator
/// - `OT`: `OAuth` token store
/// - `C`: Challenge store
/// - `RL`: Rate limiter
/// - `AM`: Account manager (C5)
/// - `TA`: Token authority (C7)
#[derive(Clone)]
pub struct AuthEnvironment<O, E, W, S, T, R, OT, C, RL, AM, TA>
where
    O: OAuth2Provider + Clone,
    E: EmailProvider + Clone,
    W: WebAuthnProvider + Clone,
    S: SessionStore + Clone,
    T: TokenStore + Clone,
    R: RiskCalculator + Clone,
    OT: OAuthTokenStore + Clone,
    C: ChallengeStore + Clone,
    RL: RateLimiter + Clone,
    AM: AccountManagerOps + Clone,
    TA: TokenAuthorityOps + Clone,
{
    /// `OAuth2` provider.
    pub oauth: O,

    /// Email provider.
    pub email: E,

    /// `WebAuthn` provider.
    pub webauthn: W,

    /// Session store (`Redis`).
    pub sessions: S,

    /// Token store (`Redis` - one-time tokens with atomic consumption).
    pub tokens: T,

    /// Risk calculator (C4).
    pub risk: R,

    /// `OAuth` token store (`PostgreSQL` - encrypted access/refresh tokens).
    pub oauth_tokens: OT,

    /// Challenge store (`Redis` - `WebAuthn` challenges with atomic consumption).
    pub challenges: C,

    /// Rate limiter (`Redis` - brute force protection).
    pub rate_limiter: RL,

    /// Account manager (C5 - user lifecycle, credentials, roles).
    pub accounts: AM,

    /// Token authority (C7 - OAuth2/OIDC grants, JWT signing, JWKS).
    pub token_authority: TA,
}

impl<O, E, W, S, T, R, OT, C, RL, AM, TA> AuthEnvironment<O, E, W, S, T, R, OT, C, RL, AM, TA>
where
    O: OAuth2Provider + Clone,
    E: EmailProvider + Clone,
    W: WebAuthnProvider + Clone,
    S: SessionStore + Clone,
    T: TokenStore + Clone,
    R: RiskCalculator + Clone,
    OT: OAuthTokenStore + Clone,
    C: ChallengeStore + Clone,
    RL: RateLimiter + Clone,
    AM: AccountManagerOps + Clone,
    TA: TokenAuthorityOps + Clone,
{
    /// Create a new authentication environment.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        oauth: O,
        email: E,
        webauthn: W,
        sessions: S,
        tokens: T,
        risk: R,
        oauth_tokens: OT,
        challenges: C,
        rate_limiter: RL,
        accounts: AM,
        token_authority: TA,
    ) -> Self {
        Self {
            oauth,
            email,
            webauthn,
            sessions,
            tokens,
            risk,
            oauth_tokens,
            challenges,
            rate_limiter,
            accounts,
            token_authority,
        }
    }
}
