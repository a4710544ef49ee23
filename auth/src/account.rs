//! Account manager (C5): user lifecycle, credential changes, and role
//! administration.
//!
//! This is the only place password policy, uniqueness checks, and the
//! failed-login/lockout bookkeeping are applied — reducers and handlers call
//! through here rather than touching `aegis-postgres` repositories directly.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use aegis_postgres::{
    DeviceFingerprintRepository, PasskeyRepository, PasskeyRow, RepositoryError, RoleRepository,
    UserRepository, UserRow,
};

use crate::domain::{EmailAddress, HashedPassword, RoleId};
use crate::error::{AuthError, Result};
use crate::providers::{PasskeyCredential, PasskeyCredentialSummary};
use crate::state::UserId;

/// A user's mutable profile fields, as presented to the account manager.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    /// `Some(None)` clears the name; `None` leaves it unchanged.
    pub given_name: Option<Option<String>>,
    pub surname: Option<Option<String>>,
    pub nickname: Option<Option<String>>,
    /// `Some(None)` clears the recovery email; `None` leaves it unchanged.
    pub recovery_email: Option<Option<String>>,
}

/// Fields needed to create a new local or federated-provisioned account.
#[derive(Debug, Clone)]
pub struct NewUserProfile {
    pub email: EmailAddress,
    pub given_name: Option<String>,
    pub surname: Option<String>,
    pub email_verified: bool,
}

/// Account manager operations (C5).
///
/// Implementations must never let a retryable optimistic-concurrency
/// conflict in [`AccountManagerOps::handle_failed_login`] propagate to the
/// caller — a login attempt must always resolve to a risk/auth decision, not
/// an internal bookkeeping failure.
pub trait AccountManagerOps: Send + Sync {
    /// Create a new local user account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Conflict`] if the primary or recovery email is
    /// already in use, or [`AuthError::InvalidArgument`] if the password
    /// fails policy.
    fn create_user(
        &self,
        profile: NewUserProfile,
        raw_password: Option<String>,
        recovery_email: Option<String>,
    ) -> impl std::future::Future<Output = Result<UserId>> + Send;

    /// Apply a profile patch. A `None` field is left unchanged; a `Some(None)`
    /// clears it. No-ops (empty diff) do not touch storage.
    fn update_user_profile(
        &self,
        user_id: UserId,
        patch: ProfilePatch,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Self-service password change: verifies `old_raw` first and rejects if
    /// `new_raw == old_raw`.
    fn change_user_password(
        &self,
        user_id: UserId,
        old_raw: &str,
        new_raw: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Admin-authority password reset. Does not require the old password.
    fn admin_change_user_password(
        &self,
        user_id: UserId,
        new_raw: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Clear a lockout and reset the failed-attempt counter.
    fn admin_unlock_user(&self, user_id: UserId) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Enable or disable an account.
    fn admin_set_user_enabled(
        &self,
        user_id: UserId,
        enabled: bool,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Grant a role to a user.
    fn append_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Revoke a role from a user.
    fn revoke_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Soft-delete a user account.
    fn delete_user_account(&self, user_id: UserId) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Verify an email/password pair for local login.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if the identifier is
    /// unknown, the account has no password set, or the password doesn't
    /// match, and [`AuthError::Locked`] if the account is currently locked
    /// out. Both are distinguished so the caller can decide whether to
    /// record a failed attempt (the former) or not (the latter, already
    /// locked).
    fn verify_login_credentials(
        &self,
        identifier: &str,
        raw_password: &str,
    ) -> impl std::future::Future<Output = Result<UserId>> + Send;

    /// Record a failed login attempt against `identifier` (email), applying
    /// the lockout rule. Never returns an error to the caller — logs and
    /// swallows any persistent failure after exhausting retries.
    fn handle_failed_login(&self, identifier: &str) -> impl std::future::Future<Output = ()> + Send;

    /// Record a successful login: reset the failure counter and, if a
    /// fingerprint hash is given, upsert the device-fingerprint row.
    fn handle_successful_login(
        &self,
        identifier: &str,
        fingerprint_hash: Option<String>,
        ip: Option<std::net::IpAddr>,
        country: Option<String>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Look up an active account by email, provisioning a new one (no
    /// password credential) if none exists yet.
    ///
    /// Used by federated login: the identity provider already vouches for
    /// the email, so there is no password to verify and no lockout to check.
    fn find_or_create_federated_user(
        &self,
        email: &str,
        given_name: Option<String>,
    ) -> impl std::future::Future<Output = Result<UserId>> + Send;

    /// Look up a user's email by ID.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ResourceNotFound`] if no such user exists.
    fn get_user_email(&self, user_id: UserId) -> impl std::future::Future<Output = Result<String>> + Send;

    /// Resolve an email to its active user ID, without verifying a password.
    ///
    /// Used by passkey login, where the credential itself is the factor.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if no active account matches.
    fn find_user_id_by_email(&self, email: &str) -> impl std::future::Future<Output = Result<UserId>> + Send;

    /// Register a new passkey credential for a user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Conflict`] if `credential_id` is already registered.
    fn create_passkey_credential(
        &self,
        user_id: UserId,
        credential_id: String,
        public_key: Vec<u8>,
        friendly_name: Option<String>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// List every passkey credential registered to a user.
    fn list_passkey_credentials(
        &self,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<Vec<PasskeyCredentialSummary>>> + Send;

    /// Fetch a credential by its ID, for assertion verification.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::PasskeyNotFound`] if no such credential exists.
    fn get_passkey_credential(
        &self,
        credential_id: &str,
    ) -> impl std::future::Future<Output = Result<PasskeyCredential>> + Send;

    /// Atomically advance a credential's stored signature counter.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SignatureCounterRegression`] if `new_count` does
    /// not exceed the stored count.
    fn update_passkey_signature_count(
        &self,
        credential_id: &str,
        new_count: u32,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Delete a passkey credential, verifying `user_id` owns it first.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::PasskeyNotFound`] if the credential doesn't exist
    /// or belongs to a different user.
    fn delete_passkey_credential(
        &self,
        user_id: UserId,
        credential_id: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Compute the HMAC-SHA256 blind index for an email's normalized form.
///
/// The same key and algorithm must be used for every lookup and every
/// write, or blind-index equality breaks silently.
#[must_use]
#[allow(clippy::expect_used)] // HMAC-SHA256 has no minimum or maximum key length
pub fn email_blind_index(key: &[u8], email: &EmailAddress) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC-SHA256 accepts any key length");
    mac.update(email.normalized().as_bytes());
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

/// Validate a raw password against the minimum policy: length and at least
/// one letter and one digit.
///
/// # Errors
///
/// Returns [`AuthError::InvalidArgument`] if the password fails policy.
fn check_password_policy(raw_password: &str) -> Result<()> {
    if raw_password.len() < 10 {
        return Err(AuthError::InvalidArgument(
            "password must be at least 10 characters".to_string(),
        ));
    }
    let has_letter = raw_password.chars().any(char::is_alphabetic);
    let has_digit = raw_password.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        return Err(AuthError::InvalidArgument(
            "password must contain at least one letter and one digit".to_string(),
        ));
    }
    Ok(())
}

/// `UserRepository`/`RoleRepository`/`DeviceFingerprintRepository`/`PasskeyRepository`-backed
/// [`AccountManagerOps`].
#[derive(Clone)]
pub struct AccountManager<UR, RR, DF, PK> {
    users: UR,
    roles: RR,
    fingerprints: DF,
    passkeys: PK,
    blind_index_key: Arc<Vec<u8>>,
    lockout_threshold: u32,
    lockout_duration: chrono::Duration,
}

impl<UR, RR, DF, PK> AccountManager<UR, RR, DF, PK>
where
    UR: UserRepository + Clone,
    RR: RoleRepository + Clone,
    DF: DeviceFingerprintRepository + Clone,
    PK: PasskeyRepository + Clone,
{
    /// Build a new account manager.
    #[must_use]
    pub fn new(
        users: UR,
        roles: RR,
        fingerprints: DF,
        passkeys: PK,
        blind_index_key: Vec<u8>,
        lockout_threshold: u32,
        lockout_duration: chrono::Duration,
    ) -> Self {
        Self {
            users,
            roles,
            fingerprints,
            passkeys,
            blind_index_key: Arc::new(blind_index_key),
            lockout_threshold,
            lockout_duration,
        }
    }

    fn blind_index(&self, email: &EmailAddress) -> String {
        email_blind_index(&self.blind_index_key, email)
    }

    async fn find_active_user_by_email(&self, identifier: &str) -> Result<UserRow> {
        let email = EmailAddress::parse(identifier)
            .map_err(|e| AuthError::InvalidArgument(e.to_string()))?;
        let blind_index = self.blind_index(&email);
        self.users
            .find_active_by_email_blind_index(&blind_index)
            .await
            .map_err(AuthError::from)
    }
}

fn passkey_row_to_summary(row: &PasskeyRow) -> PasskeyCredentialSummary {
    PasskeyCredentialSummary {
        credential_id: row.credential_id.clone(),
        friendly_name: row.friendly_name.clone(),
        last_used_at: row.last_used_at,
    }
}

fn passkey_row_to_credential(row: PasskeyRow) -> PasskeyCredential {
    PasskeyCredential {
        credential_id: row.credential_id,
        user_id: UserId(row.user_id),
        public_key: row.public_key_ciphertext,
        counter: u32::try_from(row.signature_count).unwrap_or(u32::MAX),
    }
}

impl<UR, RR, DF, PK> AccountManagerOps for AccountManager<UR, RR, DF, PK>
where
    UR: UserRepository + Clone + Send + Sync,
    RR: RoleRepository + Clone + Send + Sync,
    DF: DeviceFingerprintRepository + Clone + Send + Sync,
    PK: PasskeyRepository + Clone + Send + Sync,
{
    async fn create_user(
        &self,
        profile: NewUserProfile,
        raw_password: Option<String>,
        recovery_email: Option<String>,
    ) -> Result<UserId> {
        let blind_index = self.blind_index(&profile.email);
        if self
            .users
            .find_active_by_email_blind_index(&blind_index)
            .await
            .is_ok()
        {
            return Err(AuthError::Conflict {
                constraint: "email_unique".to_string(),
            });
        }

        let recovery_blind_index = match &recovery_email {
            Some(raw) => {
                let parsed = EmailAddress::parse(raw)
                    .map_err(|e| AuthError::InvalidArgument(e.to_string()))?;
                if parsed == profile.email {
                    return Err(AuthError::InvalidArgument(
                        "recovery email must differ from primary email".to_string(),
                    ));
                }
                let idx = self.blind_index(&parsed);
                if self
                    .users
                    .exists_by_recovery_email_blind_index(&idx)
                    .await
                    .map_err(AuthError::from)?
                {
                    return Err(AuthError::Conflict {
                        constraint: "recovery_email_unique".to_string(),
                    });
                }
                Some(idx)
            }
            None => None,
        };

        let hashed_password = match raw_password {
            Some(raw) => {
                check_password_policy(&raw)?;
                Some(
                    HashedPassword::hash(&raw)
                        .map_err(|e| AuthError::InvalidArgument(e.to_string()))?
                        .encoded()
                        .to_string(),
                )
            }
            None => None,
        };

        let user_id = UserId::new();
        let row = UserRow {
            id: user_id.0,
            external_id: user_id.0.to_string(),
            auth_server_subject_id: None,
            given_name: profile.given_name,
            middle_name: None,
            surname: profile.surname,
            nickname: None,
            email_ciphertext: Some(profile.email.display().as_bytes().to_vec()),
            email_blind_index: Some(blind_index),
            recovery_email_ciphertext: recovery_email.map(|e| e.into_bytes()),
            recovery_email_blind_index: recovery_blind_index,
            phone: None,
            hashed_password,
            email_verified: profile.email_verified,
            profile_picture_url: None,
            enabled: true,
            account_non_expired: true,
            credentials_non_expired: true,
            account_non_locked: true,
            failed_login_attempts: 0,
            lockout_expiration_time: None,
            last_login_at: None,
            last_password_change_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            created_by: None,
            last_modified_by: None,
            version: 0,
            deleted_at: None,
        };

        self.users.create(&row).await.map_err(AuthError::from)?;
        Ok(user_id)
    }

    async fn update_user_profile(&self, user_id: UserId, patch: ProfilePatch) -> Result<()> {
        if patch.given_name.is_none()
            && patch.surname.is_none()
            && patch.nickname.is_none()
            && patch.recovery_email.is_none()
        {
            return Ok(());
        }

        let mut row = self.users.find_by_id(user_id.0).await.map_err(AuthError::from)?;

        if let Some(given_name) = patch.given_name {
            row.given_name = given_name;
        }
        if let Some(surname) = patch.surname {
            row.surname = surname;
        }
        if let Some(nickname) = patch.nickname {
            row.nickname = nickname;
        }
        if let Some(recovery_email) = patch.recovery_email {
            match recovery_email {
                Some(raw) => {
                    let parsed = EmailAddress::parse(&raw)
                        .map_err(|e| AuthError::InvalidArgument(e.to_string()))?;
                    let idx = self.blind_index(&parsed);
                    if row.recovery_email_blind_index.as_deref() != Some(idx.as_str())
                        && self
                            .users
                            .exists_by_recovery_email_blind_index(&idx)
                            .await
                            .map_err(AuthError::from)?
                    {
                        return Err(AuthError::Conflict {
                            constraint: "recovery_email_unique".to_string(),
                        });
                    }
                    row.recovery_email_ciphertext = Some(raw.into_bytes());
                    row.recovery_email_blind_index = Some(idx);
                }
                None => {
                    row.recovery_email_ciphertext = None;
                    row.recovery_email_blind_index = None;
                }
            }
        }

        self.users.update(&row).await.map_err(AuthError::from)?;
        Ok(())
    }

    async fn change_user_password(&self, user_id: UserId, old_raw: &str, new_raw: &str) -> Result<()> {
        if old_raw == new_raw {
            return Err(AuthError::InvalidArgument(
                "new password must differ from the current password".to_string(),
            ));
        }
        let mut row = self.users.find_by_id(user_id.0).await.map_err(AuthError::from)?;
        let Some(encoded) = row.hashed_password.clone() else {
            return Err(AuthError::InvalidArgument(
                "account has no password credential".to_string(),
            ));
        };
        let matches = HashedPassword::from_encoded(encoded)
            .verify(old_raw)
            .map_err(|e| AuthError::InvalidArgument(e.to_string()))?;
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }
        check_password_policy(new_raw)?;
        row.hashed_password = Some(
            HashedPassword::hash(new_raw)
                .map_err(|e| AuthError::InvalidArgument(e.to_string()))?
                .encoded()
                .to_string(),
        );
        row.last_password_change_at = Some(Utc::now());
        self.users.update(&row).await.map_err(AuthError::from)?;
        Ok(())
    }

    async fn admin_change_user_password(&self, user_id: UserId, new_raw: &str) -> Result<()> {
        check_password_policy(new_raw)?;
        let mut row = self.users.find_by_id(user_id.0).await.map_err(AuthError::from)?;
        row.hashed_password = Some(
            HashedPassword::hash(new_raw)
                .map_err(|e| AuthError::InvalidArgument(e.to_string()))?
                .encoded()
                .to_string(),
        );
        row.last_password_change_at = Some(Utc::now());
        self.users.update(&row).await.map_err(AuthError::from)?;
        Ok(())
    }

    async fn admin_unlock_user(&self, user_id: UserId) -> Result<()> {
        let mut row = self.users.find_by_id(user_id.0).await.map_err(AuthError::from)?;
        row.failed_login_attempts = 0;
        row.account_non_locked = true;
        row.lockout_expiration_time = None;
        self.users.update(&row).await.map_err(AuthError::from)?;
        Ok(())
    }

    async fn admin_set_user_enabled(&self, user_id: UserId, enabled: bool) -> Result<()> {
        let mut row = self.users.find_by_id(user_id.0).await.map_err(AuthError::from)?;
        row.enabled = enabled;
        self.users.update(&row).await.map_err(AuthError::from)?;
        Ok(())
    }

    async fn append_role(&self, user_id: UserId, role_id: RoleId) -> Result<()> {
        self.roles
            .assign_to_user(user_id.0, role_id.0)
            .await
            .map_err(AuthError::from)
    }

    async fn revoke_role(&self, user_id: UserId, role_id: RoleId) -> Result<()> {
        self.roles
            .revoke_from_user(user_id.0, role_id.0)
            .await
            .map_err(AuthError::from)
    }

    async fn delete_user_account(&self, user_id: UserId) -> Result<()> {
        self.users
            .soft_delete(user_id.0, "account-manager")
            .await
            .map_err(AuthError::from)
    }

    async fn verify_login_credentials(&self, identifier: &str, raw_password: &str) -> Result<UserId> {
        let user = self
            .find_active_user_by_email(identifier)
            .await
            .map_err(|_| AuthError::InvalidCredentials)?;

        if !user.enabled {
            return Err(AuthError::InvalidCredentials);
        }

        if let Some(lock_until) = user.lockout_expiration_time {
            if Utc::now() < lock_until {
                let retry_after = (lock_until - Utc::now())
                    .to_std()
                    .unwrap_or(StdDuration::from_secs(0));
                return Err(AuthError::Locked { retry_after });
            }
        }

        let Some(hash) = &user.hashed_password else {
            return Err(AuthError::InvalidCredentials);
        };
        let hashed = crate::domain::HashedPassword::from_encoded(hash.clone());
        match hashed.verify(raw_password) {
            Ok(true) => Ok(UserId(user.id)),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn handle_failed_login(&self, identifier: &str) {
        let Ok(user) = self.find_active_user_by_email(identifier).await else {
            return;
        };

        const MAX_RETRIES: u32 = 3;
        for attempt in 0..MAX_RETRIES {
            let failed_attempts = user.failed_login_attempts as u32 + 1;
            let lock_until = if failed_attempts >= self.lockout_threshold {
                Some(Utc::now() + self.lockout_duration)
            } else {
                None
            };
            match self.users.record_failed_login(user.id, lock_until).await {
                Ok(()) => return,
                Err(RepositoryError::VersionConflict) => {
                    tokio::time::sleep(StdDuration::from_millis(50 * u64::from(attempt + 1))).await;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "failed to record failed login attempt");
                    return;
                }
            }
        }
        tracing::warn!(user_id = %user.id, "gave up recording failed login after retries");
    }

    async fn handle_successful_login(
        &self,
        identifier: &str,
        fingerprint_hash: Option<String>,
        ip: Option<std::net::IpAddr>,
        country: Option<String>,
    ) -> Result<()> {
        let user = self.find_active_user_by_email(identifier).await?;
        self.users
            .record_successful_login(user.id, Utc::now())
            .await
            .map_err(AuthError::from)?;

        if let Some(hash) = fingerprint_hash {
            let existing = self.fingerprints.find_active(user.id, &hash).await.ok();
            let row = aegis_postgres::DeviceFingerprintRow {
                id: existing.as_ref().map_or_else(uuid::Uuid::new_v4, |e| e.id),
                user_id: user.id,
                fingerprint_hash: hash,
                first_seen: existing.as_ref().map_or_else(Utc::now, |e| e.first_seen),
                last_used_at: Utc::now(),
                active: true,
                trusted: existing.as_ref().is_some_and(|e| e.trusted),
                failed_attempts: 0,
                device_name: None,
                last_known_ip: ip.map(|ip| ip.to_string()),
                last_known_country: country,
                browser_info: None,
                source: "login".to_string(),
            };
            if let Err(err) = self.fingerprints.upsert(&row).await {
                tracing::warn!(error = %err, "failed to upsert device fingerprint");
            }
        }
        Ok(())
    }

    async fn find_or_create_federated_user(&self, email: &str, given_name: Option<String>) -> Result<UserId> {
        if let Ok(user) = self.find_active_user_by_email(email).await {
            return Ok(UserId(user.id));
        }
        let parsed = EmailAddress::parse(email).map_err(|e| AuthError::InvalidArgument(e.to_string()))?;
        let profile = NewUserProfile {
            email: parsed,
            given_name,
            surname: None,
            email_verified: true,
        };
        match self.create_user(profile, None, None).await {
            Ok(user_id) => Ok(user_id),
            Err(AuthError::Conflict { .. }) => self
                .find_active_user_by_email(email)
                .await
                .map(|user| UserId(user.id))
                .map_err(|_| AuthError::InternalError),
            Err(other) => Err(other),
        }
    }

    async fn get_user_email(&self, user_id: UserId) -> Result<String> {
        let row = self.users.find_by_id(user_id.0).await.map_err(AuthError::from)?;
        let bytes = row.email_ciphertext.ok_or(AuthError::ResourceNotFound)?;
        String::from_utf8(bytes).map_err(|_| AuthError::InternalError)
    }

    async fn find_user_id_by_email(&self, email: &str) -> Result<UserId> {
        self.find_active_user_by_email(email)
            .await
            .map(|user| UserId(user.id))
            .map_err(|_| AuthError::InvalidCredentials)
    }

    async fn create_passkey_credential(
        &self,
        user_id: UserId,
        credential_id: String,
        public_key: Vec<u8>,
        friendly_name: Option<String>,
    ) -> Result<()> {
        let row = PasskeyRow {
            credential_id,
            user_id: user_id.0,
            user_handle: user_id.0.to_string(),
            public_key_ciphertext: public_key,
            signature_count: 0,
            transports: Vec::new(),
            uv_initialized: false,
            backup_eligible: false,
            backup_state: false,
            friendly_name,
            last_used_at: None,
        };
        self.passkeys.create(&row).await.map_err(AuthError::from)?;
        Ok(())
    }

    async fn list_passkey_credentials(&self, user_id: UserId) -> Result<Vec<PasskeyCredentialSummary>> {
        let rows = self.passkeys.list_for_user(user_id.0).await.map_err(AuthError::from)?;
        Ok(rows.iter().map(passkey_row_to_summary).collect())
    }

    async fn get_passkey_credential(&self, credential_id: &str) -> Result<PasskeyCredential> {
        let row = self
            .passkeys
            .find_by_credential_id(credential_id)
            .await
            .map_err(|_| AuthError::PasskeyNotFound)?;
        Ok(passkey_row_to_credential(row))
    }

    async fn update_passkey_signature_count(&self, credential_id: &str, new_count: u32) -> Result<()> {
        self.passkeys
            .update_signature_count(credential_id, i64::from(new_count), Utc::now())
            .await
            .map_err(|err| match err {
                RepositoryError::VersionConflict => AuthError::SignatureCounterRegression,
                other => AuthError::from(other),
            })
    }

    async fn delete_passkey_credential(&self, user_id: UserId, credential_id: &str) -> Result<()> {
        let row = self
            .passkeys
            .find_by_credential_id(credential_id)
            .await
            .map_err(|_| AuthError::PasskeyNotFound)?;
        if row.user_id != user_id.0 {
            return Err(AuthError::PasskeyNotFound);
        }
        self.passkeys
            .delete(credential_id)
            .await
            .map_err(|_| AuthError::PasskeyNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blind_index_is_deterministic_and_case_insensitive() {
        let key = b"test-key-material";
        let a = EmailAddress::parse("Alice@Example.com").unwrap();
        let b = EmailAddress::parse("alice@example.com").unwrap();
        assert_eq!(email_blind_index(key, &a), email_blind_index(key, &b));
    }

    #[test]
    fn blind_index_differs_across_keys() {
        let email = EmailAddress::parse("alice@example.com").unwrap();
        let idx_a = email_blind_index(b"key-one-material", &email);
        let idx_b = email_blind_index(b"key-two-material", &email);
        assert_ne!(idx_a, idx_b);
    }

    #[test]
    fn password_policy_rejects_short_passwords() {
        let err = check_password_policy("short1");
        assert!(matches!(err, Err(AuthError::InvalidArgument(_))));
    }

    #[test]
    fn password_policy_rejects_missing_digit() {
        let err = check_password_policy("onlyletters");
        assert!(matches!(err, Err(AuthError::InvalidArgument(_))));
    }

    #[test]
    fn password_policy_accepts_compliant_password() {
        let ok = check_password_policy("correct-horse1");
        assert!(ok.is_ok());
    }
}
