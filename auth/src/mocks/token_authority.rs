//! Mock token authority for testing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use jsonwebtoken::jwk::JwkSet;

use crate::error::{AuthError, Result};
use crate::token::{DeviceAuthorizationResponse, IntrospectionResponse, TokenAuthorityOps, TokenResponse};

#[derive(Debug, Clone)]
struct IssuedCode {
    principal_name: String,
    redirect_uri: String,
    code_verifier: Option<String>,
    consumed: bool,
}

#[derive(Debug, Clone)]
struct IssuedDeviceCode {
    user_code: String,
    principal_name: Option<String>,
}

/// In-memory [`TokenAuthorityOps`] for reducer and handler tests.
///
/// Tokens are opaque counter-derived strings, not real JWTs — tests that
/// need to inspect claims should go through the real `token.rs` authority
/// with a test signing key instead.
#[derive(Debug, Clone)]
pub struct MockTokenAuthority {
    codes: Arc<Mutex<HashMap<String, IssuedCode>>>,
    refresh_tokens: Arc<Mutex<HashMap<String, String>>>,
    device_codes: Arc<Mutex<HashMap<String, IssuedDeviceCode>>>,
    revoked: Arc<Mutex<HashMap<String, ()>>>,
    consents: Arc<Mutex<HashMap<(String, String, String), ()>>>,
    next_id: Arc<Mutex<u64>>,
}

impl MockTokenAuthority {
    /// Create an empty mock token authority.
    #[must_use]
    pub fn new() -> Self {
        Self {
            codes: Arc::new(Mutex::new(HashMap::new())),
            refresh_tokens: Arc::new(Mutex::new(HashMap::new())),
            device_codes: Arc::new(Mutex::new(HashMap::new())),
            revoked: Arc::new(Mutex::new(HashMap::new())),
            consents: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(Mutex::new(0)),
        }
    }

    fn next_token(&self, prefix: &str) -> Result<String> {
        let mut id = self.next_id.lock().map_err(|_| AuthError::InternalError)?;
        *id += 1;
        Ok(format!("{prefix}-{id}"))
    }

    fn token_response(&self, principal_name: &str, scope: &str, with_refresh: bool) -> Result<TokenResponse> {
        let access_token = self.next_token("access")?;
        let refresh_token = if with_refresh {
            let token = self.next_token("refresh")?;
            self.refresh_tokens
                .lock()
                .map_err(|_| AuthError::InternalError)?
                .insert(token.clone(), principal_name.to_string());
            Some(token)
        } else {
            None
        };
        let id_token = scope.split_whitespace().any(|s| s == "openid").then(|| format!("id-{access_token}"));
        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: 3600,
            refresh_token,
            id_token,
            scope: scope.to_string(),
        })
    }
}

impl Default for MockTokenAuthority {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenAuthorityOps for MockTokenAuthority {
    async fn issue_authorization_code(
        &self,
        _client_id: &str,
        principal_name: &str,
        redirect_uri: &str,
        _scope: &str,
        code_challenge: Option<String>,
        _code_challenge_method: Option<String>,
    ) -> Result<String> {
        let code = self.next_token("code")?;
        self.codes.lock().map_err(|_| AuthError::InternalError)?.insert(
            code.clone(),
            IssuedCode {
                principal_name: principal_name.to_string(),
                redirect_uri: redirect_uri.to_string(),
                code_verifier: code_challenge,
                consumed: false,
            },
        );
        Ok(code)
    }

    async fn exchange_authorization_code(
        &self,
        code: &str,
        _client_id: &str,
        redirect_uri: &str,
        code_verifier: Option<&str>,
    ) -> Result<TokenResponse> {
        let principal_name = {
            let mut codes = self.codes.lock().map_err(|_| AuthError::InternalError)?;
            let issued = codes.get_mut(code).ok_or(AuthError::OAuthCodeInvalid)?;
            if issued.consumed || issued.redirect_uri != redirect_uri {
                return Err(AuthError::OAuthCodeInvalid);
            }
            if issued.code_verifier.is_some() && issued.code_verifier.as_deref() != code_verifier {
                return Err(AuthError::OAuthCodeInvalid);
            }
            issued.consumed = true;
            issued.principal_name.clone()
        };
        self.token_response(&principal_name, "openid profile", true)
    }

    async fn exchange_refresh_token(&self, refresh_token: &str, _client_id: &str) -> Result<TokenResponse> {
        let principal_name = {
            let mut tokens = self.refresh_tokens.lock().map_err(|_| AuthError::InternalError)?;
            let principal_name = tokens.remove(refresh_token).ok_or(AuthError::InvalidRefreshToken)?;
            principal_name
        };
        self.token_response(&principal_name, "openid profile", true)
    }

    async fn client_credentials_grant(&self, client_id: &str, client_secret: &str, scope: &str) -> Result<TokenResponse> {
        if client_secret.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }
        self.token_response(client_id, scope, false)
    }

    async fn issue_device_code(
        &self,
        _client_id: &str,
        _scope: &str,
        verification_uri: &str,
    ) -> Result<DeviceAuthorizationResponse> {
        let device_code = self.next_token("device")?;
        let user_code = self.next_token("user")?;
        self.device_codes.lock().map_err(|_| AuthError::InternalError)?.insert(
            device_code.clone(),
            IssuedDeviceCode {
                user_code: user_code.clone(),
                principal_name: None,
            },
        );
        Ok(DeviceAuthorizationResponse {
            device_code,
            user_code: user_code.clone(),
            verification_uri: verification_uri.to_string(),
            verification_uri_complete: Some(format!("{verification_uri}?user_code={user_code}")),
            expires_in: 600,
            interval: 5,
        })
    }

    async fn approve_device_code(&self, user_code: &str, principal_name: &str) -> Result<()> {
        let mut codes = self.device_codes.lock().map_err(|_| AuthError::InternalError)?;
        let entry = codes
            .values_mut()
            .find(|c| c.user_code == user_code)
            .ok_or(AuthError::ResourceNotFound)?;
        entry.principal_name = Some(principal_name.to_string());
        Ok(())
    }

    async fn poll_device_token(&self, device_code: &str, _client_id: &str) -> Result<Option<TokenResponse>> {
        let principal_name = {
            let codes = self.device_codes.lock().map_err(|_| AuthError::InternalError)?;
            let entry = codes.get(device_code).ok_or(AuthError::OAuthCodeInvalid)?;
            entry.principal_name.clone()
        };
        match principal_name {
            Some(name) => {
                self.device_codes.lock().map_err(|_| AuthError::InternalError)?.remove(device_code);
                Ok(Some(self.token_response(&name, "openid profile", true)?))
            }
            None => Ok(None),
        }
    }

    async fn introspect(&self, token: &str) -> Result<IntrospectionResponse> {
        let revoked = self.revoked.lock().map_err(|_| AuthError::InternalError)?.contains_key(token);
        if revoked {
            return Ok(IntrospectionResponse {
                active: false,
                scope: None,
                client_id: None,
                sub: None,
                exp: None,
                token_type: None,
            });
        }
        let refresh_sub = self
            .refresh_tokens
            .lock()
            .map_err(|_| AuthError::InternalError)?
            .get(token)
            .cloned();
        let is_refresh = refresh_sub.is_some();
        Ok(IntrospectionResponse {
            active: true,
            scope: Some("openid profile".to_string()),
            client_id: None,
            sub: refresh_sub,
            exp: None,
            token_type: Some(if is_refresh { "refresh_token" } else { "access_token" }.to_string()),
        })
    }

    async fn revoke(&self, token: &str) -> Result<()> {
        self.revoked.lock().map_err(|_| AuthError::InternalError)?.insert(token.to_string(), ());
        self.refresh_tokens.lock().map_err(|_| AuthError::InternalError)?.remove(token);
        Ok(())
    }

    async fn has_consent(&self, client_id: &str, principal_name: &str, scope: &str) -> Result<bool> {
        Ok(self
            .consents
            .lock()
            .map_err(|_| AuthError::InternalError)?
            .contains_key(&(client_id.to_string(), principal_name.to_string(), scope.to_string())))
    }

    async fn record_consent(&self, client_id: &str, principal_name: &str, scope: &str) -> Result<()> {
        self.consents
            .lock()
            .map_err(|_| AuthError::InternalError)?
            .insert((client_id.to_string(), principal_name.to_string(), scope.to_string()), ());
        Ok(())
    }

    fn jwks(&self) -> JwkSet {
        JwkSet { keys: Vec::new() }
    }
}
