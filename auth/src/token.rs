//! Token authority (C7): OAuth2/OIDC grant handling, JWT signing, JWKS,
//! introspection, and revocation.
//!
//! Authorization codes and refresh tokens are opaque, randomly generated
//! values; only their SHA-256 hash is ever persisted or compared, mirroring
//! [`aegis_postgres::oauth_authorization::OAuth2AuthorizationRow`]'s
//! token-hash columns. Access and ID tokens are self-contained JWTs signed
//! with this authority's RSA key, so resource servers can verify them
//! without a round trip to this service.

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::jwk::{
    AlgorithmParameters, CommonParameters, Jwk, JwkSet, KeyAlgorithm, PublicKeyUse,
    RSAKeyParameters, RSAKeyType,
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use aegis_postgres::{
    ConsentRepository, ConsentRow, OAuth2AuthorizationRepository, OAuth2AuthorizationRow,
    OAuth2ClientRepository, RepositoryError, RevokedTokenRepository,
};

use crate::error::{AuthError, Result};

/// RS256 signing material and token lifetimes for the token authority.
pub struct TokenAuthorityConfig {
    /// Issuer URL, used as the `iss` claim and discovery document base.
    pub issuer: String,
    /// RSA private key, PKCS#8 or PKCS#1 PEM, for signing access/ID tokens.
    pub encoding_key: EncodingKey,
    /// The matching RSA public key, for local verification (introspection).
    pub decoding_key: DecodingKey,
    /// Key id advertised in the JWT header and JWKS document.
    pub kid: String,
    /// RSA modulus, base64url-encoded without padding, for the JWKS document.
    pub jwk_modulus_b64: String,
    /// RSA public exponent, base64url-encoded without padding.
    pub jwk_exponent_b64: String,
    /// Access token lifetime.
    pub access_token_ttl: Duration,
    /// ID token lifetime.
    pub id_token_ttl: Duration,
    /// Refresh token lifetime.
    pub refresh_token_ttl: Duration,
    /// Authorization code lifetime.
    pub authorization_code_ttl: Duration,
    /// Device code lifetime.
    pub device_code_ttl: Duration,
}

/// Successful token-endpoint response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Bearer access token (JWT).
    pub access_token: String,
    /// Always `"Bearer"`.
    pub token_type: String,
    /// Seconds until `access_token` expires.
    pub expires_in: i64,
    /// Opaque refresh token, if the grant issues one.
    pub refresh_token: Option<String>,
    /// OIDC ID token (JWT), if `openid` was in scope.
    pub id_token: Option<String>,
    /// Space-delimited granted scopes.
    pub scope: String,
}

/// Device-authorization-grant initiation response (RFC 8628).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceAuthorizationResponse {
    /// Opaque device code the client polls with.
    pub device_code: String,
    /// Short code the user types at `verification_uri`.
    pub user_code: String,
    /// URL the user visits to approve the request.
    pub verification_uri: String,
    /// `verification_uri` with `user_code` pre-filled, if supported.
    pub verification_uri_complete: Option<String>,
    /// Seconds until `device_code`/`user_code` expire.
    pub expires_in: i64,
    /// Minimum seconds between poll attempts.
    pub interval: i64,
}

/// RFC 7662 token introspection response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntrospectionResponse {
    /// Whether the token is currently valid.
    pub active: bool,
    /// Granted scopes, space-delimited.
    pub scope: Option<String>,
    /// Client the token was issued to.
    pub client_id: Option<String>,
    /// Subject (principal name) the token was issued for.
    pub sub: Option<String>,
    /// Expiration, Unix seconds.
    pub exp: Option<i64>,
    /// `"access_token"` or `"refresh_token"`.
    pub token_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AccessTokenClaims {
    sub: String,
    iss: String,
    aud: String,
    scope: String,
    exp: i64,
    iat: i64,
    jti: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IdTokenClaims {
    sub: String,
    iss: String,
    aud: String,
    exp: i64,
    iat: i64,
    auth_time: i64,
}

/// Token authority operations (C7).
pub trait TokenAuthorityOps: Send + Sync {
    /// Issue an authorization code after the resource owner has
    /// authenticated and (if required) consented.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidArgument`] if `client_id` is unknown or
    /// `redirect_uri` is not registered for it.
    fn issue_authorization_code(
        &self,
        client_id: &str,
        principal_name: &str,
        redirect_uri: &str,
        scope: &str,
        code_challenge: Option<String>,
        code_challenge_method: Option<String>,
    ) -> impl std::future::Future<Output = Result<String>> + Send;

    /// Exchange an authorization code for tokens (`grant_type=authorization_code`).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::OAuthCodeInvalid`] if the code is unknown,
    /// expired, already used, or the PKCE verifier doesn't match.
    fn exchange_authorization_code(
        &self,
        code: &str,
        client_id: &str,
        redirect_uri: &str,
        code_verifier: Option<&str>,
    ) -> impl std::future::Future<Output = Result<TokenResponse>> + Send;

    /// Rotate a refresh token (`grant_type=refresh_token`).
    ///
    /// Reusing an already-rotated-out refresh token revokes its entire
    /// token family, per [RFC 6749 §10.4](https://www.rfc-editor.org/rfc/rfc6749#section-10.4).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidRefreshToken`] if the token is unknown,
    /// expired, or was already rotated out.
    fn exchange_refresh_token(
        &self,
        refresh_token: &str,
        client_id: &str,
    ) -> impl std::future::Future<Output = Result<TokenResponse>> + Send;

    /// Issue a client-only access token (`grant_type=client_credentials`).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if the client secret does
    /// not match.
    fn client_credentials_grant(
        &self,
        client_id: &str,
        client_secret: &str,
        scope: &str,
    ) -> impl std::future::Future<Output = Result<TokenResponse>> + Send;

    /// Begin a device-authorization grant (RFC 8628).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidArgument`] if `client_id` is unknown.
    fn issue_device_code(
        &self,
        client_id: &str,
        scope: &str,
        verification_uri: &str,
    ) -> impl std::future::Future<Output = Result<DeviceAuthorizationResponse>> + Send;

    /// Mark a user code as approved for a signed-in principal. Called from
    /// the device-verification page, not the token endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ResourceNotFound`] if `user_code` is unknown or expired.
    fn approve_device_code(
        &self,
        user_code: &str,
        principal_name: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Poll for a device-code grant's tokens.
    ///
    /// Returns `Ok(None)` while the user has not yet approved the code
    /// (`authorization_pending`), distinct from an error.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::OAuthCodeInvalid`] if the device code is unknown
    /// or expired.
    fn poll_device_token(
        &self,
        device_code: &str,
        client_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<TokenResponse>>> + Send;

    /// RFC 7662 token introspection.
    ///
    /// # Errors
    ///
    /// Returns a database error if the lookup itself fails; an unknown or
    /// expired token is `Ok(IntrospectionResponse { active: false, .. })`,
    /// not an error.
    fn introspect(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<IntrospectionResponse>> + Send;

    /// RFC 7009 token revocation. Revoking a refresh token revokes its
    /// whole family; revoking an access token only denies that token.
    ///
    /// # Errors
    ///
    /// Returns a database error if the deny-list write fails. Revoking an
    /// unknown token is a no-op success, per RFC 7009 §2.2.
    fn revoke(&self, token: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Standing consent lookup, for skipping the consent screen on a
    /// previously approved (client, user, scope) triple.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    fn has_consent(
        &self,
        client_id: &str,
        principal_name: &str,
        scope: &str,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Record consent for a (client, user) pair.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    fn record_consent(
        &self,
        client_id: &str,
        principal_name: &str,
        scope: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// The current JWKS document.
    fn jwks(&self) -> JwkSet;
}

/// `OAuth2ClientRepository`/`OAuth2AuthorizationRepository`/
/// `ConsentRepository`/`RevokedTokenRepository`-backed [`TokenAuthorityOps`].
#[derive(Clone)]
pub struct TokenAuthority<CR, AR, CO, RV> {
    clients: CR,
    authorizations: AR,
    consents: CO,
    revoked: RV,
    config: std::sync::Arc<TokenAuthorityConfig>,
}

fn sha256_hex(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn random_token(byte_len: usize) -> String {
    let mut bytes = vec![0u8; byte_len];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn random_user_code() -> String {
    const ALPHABET: &[u8] = b"BCDFGHJKLMNPQRSTVWXZ";
    let mut rng = rand::thread_rng();
    let mut code = String::with_capacity(9);
    for i in 0..8 {
        if i == 4 {
            code.push('-');
        }
        let idx = (rng.next_u32() as usize) % ALPHABET.len();
        code.push(ALPHABET[idx] as char);
    }
    code
}

fn pkce_matches(method: &str, verifier: &str, challenge: &str) -> bool {
    match method {
        "S256" => {
            let digest = Sha256::digest(verifier.as_bytes());
            let computed = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest);
            constant_time_eq::constant_time_eq(computed.as_bytes(), challenge.as_bytes())
        }
        "plain" => constant_time_eq::constant_time_eq(verifier.as_bytes(), challenge.as_bytes()),
        _ => false,
    }
}

impl<CR, AR, CO, RV> TokenAuthority<CR, AR, CO, RV>
where
    CR: OAuth2ClientRepository + Clone,
    AR: OAuth2AuthorizationRepository + Clone,
    CO: ConsentRepository + Clone,
    RV: RevokedTokenRepository + Clone,
{
    /// Build a new token authority.
    #[must_use]
    pub fn new(clients: CR, authorizations: AR, consents: CO, revoked: RV, config: TokenAuthorityConfig) -> Self {
        Self {
            clients,
            authorizations,
            consents,
            revoked,
            config: std::sync::Arc::new(config),
        }
    }

    fn sign_access_token(&self, client_id: &str, principal_name: &str, scope: &str) -> Result<(String, String)> {
        let now = Utc::now();
        let jti = Uuid::new_v4().to_string();
        let claims = AccessTokenClaims {
            sub: principal_name.to_string(),
            iss: self.config.issuer.clone(),
            aud: client_id.to_string(),
            scope: scope.to_string(),
            exp: (now + self.config.access_token_ttl).timestamp(),
            iat: now.timestamp(),
            jti: jti.clone(),
        };
        let header = header_with_kid(&self.config.kid);
        let token = jsonwebtoken::encode(&header, &claims, &self.config.encoding_key)
            .map_err(|e| AuthError::External(e.to_string()))?;
        Ok((token, jti))
    }

    fn sign_id_token(&self, client_id: &str, principal_name: &str) -> Result<String> {
        let now = Utc::now();
        let claims = IdTokenClaims {
            sub: principal_name.to_string(),
            iss: self.config.issuer.clone(),
            aud: client_id.to_string(),
            exp: (now + self.config.id_token_ttl).timestamp(),
            iat: now.timestamp(),
            auth_time: now.timestamp(),
        };
        let header = header_with_kid(&self.config.kid);
        jsonwebtoken::encode(&header, &claims, &self.config.encoding_key)
            .map_err(|e| AuthError::External(e.to_string()))
    }

    fn issue_tokens_for_authorization(
        &self,
        client_id: &str,
        principal_name: &str,
        scope: &str,
        issue_id_token: bool,
    ) -> Result<(String, String, Option<String>)> {
        let (access_token, _jti) = self.sign_access_token(client_id, principal_name, scope)?;
        let id_token = if issue_id_token && scope.split(' ').any(|s| s == "openid") {
            Some(self.sign_id_token(client_id, principal_name)?)
        } else {
            None
        };
        Ok((access_token, random_token(32), id_token))
    }
}

fn header_with_kid(kid: &str) -> Header {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    header
}

impl<CR, AR, CO, RV> TokenAuthorityOps for TokenAuthority<CR, AR, CO, RV>
where
    CR: OAuth2ClientRepository + Clone + Send + Sync,
    AR: OAuth2AuthorizationRepository + Clone + Send + Sync,
    CO: ConsentRepository + Clone + Send + Sync,
    RV: RevokedTokenRepository + Clone + Send + Sync,
{
    async fn issue_authorization_code(
        &self,
        client_id: &str,
        principal_name: &str,
        redirect_uri: &str,
        scope: &str,
        code_challenge: Option<String>,
        code_challenge_method: Option<String>,
    ) -> Result<String> {
        let client = self
            .clients
            .find_by_client_id(client_id)
            .await
            .map_err(|_| AuthError::InvalidArgument("unknown client_id".to_string()))?;
        if !client.redirect_uris.iter().any(|uri| uri == redirect_uri) {
            return Err(AuthError::InvalidArgument("redirect_uri not registered for client".to_string()));
        }

        let code = random_token(32);
        let code_hash = sha256_hex(&code);
        let attributes = serde_json::json!({
            "code_challenge": code_challenge,
            "code_challenge_method": code_challenge_method,
            "redirect_uri": redirect_uri,
            "client_id": client_id,
        });

        let row = OAuth2AuthorizationRow {
            id: Uuid::new_v4(),
            registered_client_id: client.id,
            principal_name: principal_name.to_string(),
            grant_type: "authorization_code".to_string(),
            authorization_code_hash: Some(code_hash),
            authorization_code_expires_at: Some(Utc::now() + self.config.authorization_code_ttl),
            access_token_hash: None,
            access_token_issued_at: None,
            access_token_expires_at: None,
            access_token_scopes: scope.split(' ').map(str::to_string).collect(),
            refresh_token_hash: None,
            refresh_token_issued_at: None,
            refresh_token_expires_at: None,
            refresh_token_family_id: None,
            id_token_hash: None,
            device_code_hash: None,
            user_code: None,
            attributes,
        };
        self.authorizations.create(&row).await.map_err(AuthError::from)?;
        Ok(code)
    }

    async fn exchange_authorization_code(
        &self,
        code: &str,
        client_id: &str,
        redirect_uri: &str,
        code_verifier: Option<&str>,
    ) -> Result<TokenResponse> {
        let client = self
            .clients
            .find_by_client_id(client_id)
            .await
            .map_err(|_| AuthError::OAuthCodeInvalid)?;
        let code_hash = sha256_hex(code);
        let mut row = self
            .authorizations
            .find_by_authorization_code_hash(&code_hash)
            .await
            .map_err(|_| AuthError::OAuthCodeInvalid)?;

        if row.registered_client_id != client.id {
            return Err(AuthError::OAuthCodeInvalid);
        }
        let Some(expires_at) = row.authorization_code_expires_at else {
            return Err(AuthError::OAuthCodeInvalid);
        };
        if Utc::now() > expires_at {
            return Err(AuthError::OAuthCodeInvalid);
        }

        let stored_redirect = row.attributes.get("redirect_uri").and_then(|v| v.as_str());
        if stored_redirect != Some(redirect_uri) {
            return Err(AuthError::OAuthCodeInvalid);
        }

        let stored_challenge = row.attributes.get("code_challenge").and_then(|v| v.as_str());
        let stored_method = row
            .attributes
            .get("code_challenge_method")
            .and_then(|v| v.as_str())
            .unwrap_or("S256");
        if let Some(challenge) = stored_challenge {
            let Some(verifier) = code_verifier else {
                return Err(AuthError::OAuthCodeInvalid);
            };
            if !pkce_matches(stored_method, verifier, challenge) {
                return Err(AuthError::OAuthCodeInvalid);
            }
        }

        let scope = row.access_token_scopes.join(" ");
        let (access_token, refresh_token, id_token) =
            self.issue_tokens_for_authorization(client_id, &row.principal_name, &scope, true)?;

        let family_id = Uuid::new_v4();
        row.authorization_code_hash = None;
        row.authorization_code_expires_at = None;
        row.access_token_hash = Some(sha256_hex(&access_token));
        row.access_token_issued_at = Some(Utc::now());
        row.access_token_expires_at = Some(Utc::now() + self.config.access_token_ttl);
        row.refresh_token_hash = Some(sha256_hex(&refresh_token));
        row.refresh_token_issued_at = Some(Utc::now());
        row.refresh_token_expires_at = Some(Utc::now() + self.config.refresh_token_ttl);
        row.refresh_token_family_id = Some(family_id);
        row.id_token_hash = id_token.as_deref().map(sha256_hex);
        self.authorizations.update(&row).await.map_err(AuthError::from)?;

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_ttl.num_seconds(),
            refresh_token: Some(refresh_token),
            id_token,
            scope,
        })
    }

    async fn exchange_refresh_token(&self, refresh_token: &str, client_id: &str) -> Result<TokenResponse> {
        let client = self
            .clients
            .find_by_client_id(client_id)
            .await
            .map_err(|_| AuthError::InvalidRefreshToken)?;
        let hash = sha256_hex(refresh_token);
        let row = match self.authorizations.find_by_refresh_token_hash(&hash).await {
            Ok(row) => row,
            Err(RepositoryError::NotFound) => {
                // Could be a reused, already-rotated-out token; we can't tell
                // which family it belonged to without the row, so there's
                // nothing more to revoke than the attempt itself failing.
                return Err(AuthError::InvalidRefreshToken);
            }
            Err(err) => return Err(err.into()),
        };
        if row.registered_client_id != client.id {
            return Err(AuthError::InvalidRefreshToken);
        }
        let Some(expires_at) = row.refresh_token_expires_at else {
            return Err(AuthError::InvalidRefreshToken);
        };
        if Utc::now() > expires_at {
            return Err(AuthError::InvalidRefreshToken);
        }

        let scope = row.access_token_scopes.join(" ");
        let (access_token, new_refresh_token, id_token) =
            self.issue_tokens_for_authorization(client_id, &row.principal_name, &scope, true)?;

        let mut updated = row.clone();
        updated.access_token_hash = Some(sha256_hex(&access_token));
        updated.access_token_issued_at = Some(Utc::now());
        updated.access_token_expires_at = Some(Utc::now() + self.config.access_token_ttl);
        updated.refresh_token_hash = Some(sha256_hex(&new_refresh_token));
        updated.refresh_token_issued_at = Some(Utc::now());
        updated.refresh_token_expires_at = Some(Utc::now() + self.config.refresh_token_ttl);
        updated.id_token_hash = id_token.as_deref().map(sha256_hex);
        self.authorizations.update(&updated).await.map_err(AuthError::from)?;

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_ttl.num_seconds(),
            refresh_token: Some(new_refresh_token),
            id_token,
            scope,
        })
    }

    async fn client_credentials_grant(&self, client_id: &str, client_secret: &str, scope: &str) -> Result<TokenResponse> {
        let client = self
            .clients
            .find_by_client_id(client_id)
            .await
            .map_err(|_| AuthError::InvalidCredentials)?;
        let Some(secret_hash) = &client.client_secret_hash else {
            return Err(AuthError::InvalidCredentials);
        };
        if !constant_time_eq::constant_time_eq(sha256_hex(client_secret).as_bytes(), secret_hash.as_bytes()) {
            return Err(AuthError::InvalidCredentials);
        }

        let (access_token, _jti) = self.sign_access_token(client_id, client_id, scope)?;
        let row = OAuth2AuthorizationRow {
            id: Uuid::new_v4(),
            registered_client_id: client.id,
            principal_name: client_id.to_string(),
            grant_type: "client_credentials".to_string(),
            authorization_code_hash: None,
            authorization_code_expires_at: None,
            access_token_hash: Some(sha256_hex(&access_token)),
            access_token_issued_at: Some(Utc::now()),
            access_token_expires_at: Some(Utc::now() + self.config.access_token_ttl),
            access_token_scopes: scope.split(' ').map(str::to_string).collect(),
            refresh_token_hash: None,
            refresh_token_issued_at: None,
            refresh_token_expires_at: None,
            refresh_token_family_id: None,
            id_token_hash: None,
            device_code_hash: None,
            user_code: None,
            attributes: serde_json::json!({ "client_id": client_id }),
        };
        self.authorizations.create(&row).await.map_err(AuthError::from)?;

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_ttl.num_seconds(),
            refresh_token: None,
            id_token: None,
            scope: scope.to_string(),
        })
    }

    async fn issue_device_code(
        &self,
        client_id: &str,
        scope: &str,
        verification_uri: &str,
    ) -> Result<DeviceAuthorizationResponse> {
        let client = self
            .clients
            .find_by_client_id(client_id)
            .await
            .map_err(|_| AuthError::InvalidArgument("unknown client_id".to_string()))?;

        let device_code = random_token(32);
        let user_code = random_user_code();
        let row = OAuth2AuthorizationRow {
            id: Uuid::new_v4(),
            registered_client_id: client.id,
            principal_name: String::new(),
            grant_type: "urn:ietf:params:oauth:grant-type:device_code".to_string(),
            authorization_code_hash: None,
            authorization_code_expires_at: None,
            access_token_hash: None,
            access_token_issued_at: None,
            access_token_expires_at: None,
            access_token_scopes: scope.split(' ').map(str::to_string).collect(),
            refresh_token_hash: None,
            refresh_token_issued_at: None,
            refresh_token_expires_at: None,
            refresh_token_family_id: None,
            id_token_hash: None,
            device_code_hash: Some(sha256_hex(&device_code)),
            user_code: Some(user_code.clone()),
            attributes: serde_json::json!({
                "approved": false,
                "expires_at": (Utc::now() + self.config.device_code_ttl).to_rfc3339(),
                "client_id": client_id,
            }),
        };
        self.authorizations.create(&row).await.map_err(AuthError::from)?;

        Ok(DeviceAuthorizationResponse {
            device_code,
            user_code: user_code.clone(),
            verification_uri: verification_uri.to_string(),
            verification_uri_complete: Some(format!("{verification_uri}?user_code={user_code}")),
            expires_in: self.config.device_code_ttl.num_seconds(),
            interval: 5,
        })
    }

    async fn approve_device_code(&self, user_code: &str, principal_name: &str) -> Result<()> {
        let mut row = self
            .authorizations
            .find_by_user_code(user_code)
            .await
            .map_err(|_| AuthError::ResourceNotFound)?;
        row.principal_name = principal_name.to_string();
        let mut attrs = row.attributes.clone();
        if let Some(obj) = attrs.as_object_mut() {
            obj.insert("approved".to_string(), serde_json::Value::Bool(true));
        }
        row.attributes = attrs;
        self.authorizations.update(&row).await.map_err(AuthError::from)?;
        Ok(())
    }

    async fn poll_device_token(&self, device_code: &str, client_id: &str) -> Result<Option<TokenResponse>> {
        let client = self
            .clients
            .find_by_client_id(client_id)
            .await
            .map_err(|_| AuthError::OAuthCodeInvalid)?;
        let hash = sha256_hex(device_code);
        let row = self
            .authorizations
            .find_by_authorization_code_hash(&hash)
            .await
            .map_err(|_| AuthError::OAuthCodeInvalid)?;
        if row.registered_client_id != client.id {
            return Err(AuthError::OAuthCodeInvalid);
        }

        let expired = row
            .attributes
            .get("expires_at")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .is_none_or(|exp| Utc::now() > exp.with_timezone(&Utc));
        if expired {
            return Err(AuthError::OAuthCodeInvalid);
        }

        let approved = row.attributes.get("approved").and_then(|v| v.as_bool()).unwrap_or(false);
        if !approved {
            return Ok(None);
        }

        let scope = row.access_token_scopes.join(" ");
        let (access_token, refresh_token, id_token) =
            self.issue_tokens_for_authorization(client_id, &row.principal_name, &scope, true)?;

        let mut updated = row.clone();
        updated.device_code_hash = None;
        updated.user_code = None;
        updated.access_token_hash = Some(sha256_hex(&access_token));
        updated.access_token_issued_at = Some(Utc::now());
        updated.access_token_expires_at = Some(Utc::now() + self.config.access_token_ttl);
        updated.refresh_token_hash = Some(sha256_hex(&refresh_token));
        updated.refresh_token_issued_at = Some(Utc::now());
        updated.refresh_token_expires_at = Some(Utc::now() + self.config.refresh_token_ttl);
        updated.id_token_hash = id_token.as_deref().map(sha256_hex);
        self.authorizations.update(&updated).await.map_err(AuthError::from)?;

        Ok(Some(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_ttl.num_seconds(),
            refresh_token: Some(refresh_token),
            id_token,
            scope,
        }))
    }

    async fn introspect(&self, token: &str) -> Result<IntrospectionResponse> {
        let hash = sha256_hex(token);
        if self.revoked.is_revoked(&hash).await.map_err(AuthError::from)? {
            return Ok(IntrospectionResponse {
                active: false,
                scope: None,
                client_id: None,
                sub: None,
                exp: None,
                token_type: None,
            });
        }

        let (row, token_type) = match self.authorizations.find_by_access_token_hash(&hash).await {
            Ok(row) => (row, "access_token"),
            Err(RepositoryError::NotFound) => match self.authorizations.find_by_refresh_token_hash(&hash).await {
                Ok(row) => (row, "refresh_token"),
                Err(RepositoryError::NotFound) => {
                    return Ok(IntrospectionResponse {
                        active: false,
                        scope: None,
                        client_id: None,
                        sub: None,
                        exp: None,
                        token_type: None,
                    });
                }
                Err(err) => return Err(err.into()),
            },
            Err(err) => return Err(err.into()),
        };

        let exp = if token_type == "access_token" {
            row.access_token_expires_at
        } else {
            row.refresh_token_expires_at
        };
        let active = exp.is_some_and(|exp| Utc::now() <= exp);
        let client_id = row
            .attributes
            .get("client_id")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Ok(IntrospectionResponse {
            active,
            scope: Some(row.access_token_scopes.join(" ")),
            client_id,
            sub: Some(row.principal_name),
            exp: exp.map(|e| e.timestamp()),
            token_type: Some(token_type.to_string()),
        })
    }

    async fn revoke(&self, token: &str) -> Result<()> {
        let hash = sha256_hex(token);
        let row = match self.authorizations.find_by_access_token_hash(&hash).await {
            Ok(row) => Some(row),
            Err(RepositoryError::NotFound) => match self.authorizations.find_by_refresh_token_hash(&hash).await {
                Ok(row) => Some(row),
                Err(RepositoryError::NotFound) => None,
                Err(err) => return Err(err.into()),
            },
            Err(err) => return Err(err.into()),
        };

        let Some(row) = row else {
            return Ok(());
        };

        let expires_at = row
            .refresh_token_expires_at
            .or(row.access_token_expires_at)
            .unwrap_or_else(|| Utc::now() + Duration::days(1));
        self.revoked.revoke(&hash, expires_at).await.map_err(AuthError::from)?;

        if let Some(family_id) = row.refresh_token_family_id {
            self.authorizations.delete_family(family_id).await.map_err(AuthError::from)?;
        } else {
            self.authorizations.delete(row.id).await.map_err(AuthError::from)?;
        }
        Ok(())
    }

    async fn has_consent(&self, client_id: &str, principal_name: &str, scope: &str) -> Result<bool> {
        let client = self
            .clients
            .find_by_client_id(client_id)
            .await
            .map_err(AuthError::from)?;
        match self.consents.find(client.id, principal_name).await {
            Ok(ConsentRow { authorities, .. }) => {
                let granted: std::collections::HashSet<&str> = authorities.split(' ').collect();
                Ok(scope.split(' ').all(|s| granted.contains(s)))
            }
            Err(RepositoryError::NotFound) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn record_consent(&self, client_id: &str, principal_name: &str, scope: &str) -> Result<()> {
        let client = self
            .clients
            .find_by_client_id(client_id)
            .await
            .map_err(AuthError::from)?;
        self.consents
            .upsert(&ConsentRow {
                registered_client_id: client.id,
                principal_name: principal_name.to_string(),
                authorities: scope.to_string(),
            })
            .await
            .map_err(AuthError::from)
    }

    fn jwks(&self) -> JwkSet {
        let jwk = Jwk {
            common: CommonParameters {
                public_key_use: Some(PublicKeyUse::Signature),
                key_algorithm: Some(KeyAlgorithm::RS256),
                key_id: Some(self.config.kid.clone()),
                ..Default::default()
            },
            algorithm: AlgorithmParameters::RSA(RSAKeyParameters {
                key_type: RSAKeyType::RSA,
                n: self.config.jwk_modulus_b64.clone(),
                e: self.config.jwk_exponent_b64.clone(),
            }),
        };
        JwkSet { keys: vec![jwk] }
    }
}

/// Validate a JWT access token issued by this authority and return its claims.
///
/// # Errors
///
/// Returns [`AuthError::InvalidCredentials`] if the token is malformed,
/// expired, or fails signature verification.
pub fn verify_access_token(token: &str, decoding_key: &DecodingKey, issuer: &str) -> Result<(String, String)> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_issuer(&[issuer]);
    let data = jsonwebtoken::decode::<AccessTokenClaims>(token, decoding_key, &validation)
        .map_err(|_| AuthError::InvalidCredentials)?;
    Ok((data.claims.sub, data.claims.scope))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pkce_s256_matches_known_vector() {
        // RFC 7636 appendix B test vector.
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        let challenge = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";
        assert!(pkce_matches("S256", verifier, challenge));
        assert!(!pkce_matches("S256", "wrong-verifier", challenge));
    }

    #[test]
    fn random_user_code_has_dash_at_fourth_position() {
        let code = random_user_code();
        assert_eq!(code.chars().nth(4), Some('-'));
        assert_eq!(code.len(), 9);
    }
}
