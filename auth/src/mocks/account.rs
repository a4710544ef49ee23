//! Mock account manager for testing.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};

use crate::account::{AccountManagerOps, NewUserProfile, ProfilePatch};
use crate::domain::{HashedPassword, RoleId};
use crate::error::{AuthError, Result};
use crate::providers::{PasskeyCredential, PasskeyCredentialSummary};
use crate::state::UserId;

#[derive(Debug, Clone)]
struct MockUser {
    id: UserId,
    email: String,
    hashed_password: Option<String>,
    enabled: bool,
    failed_attempts: u32,
    lockout_until: Option<DateTime<Utc>>,
    roles: HashSet<RoleId>,
}

#[derive(Debug, Clone)]
struct MockPasskey {
    user_id: UserId,
    public_key: Vec<u8>,
    counter: u32,
    friendly_name: Option<String>,
    last_used_at: Option<DateTime<Utc>>,
}

/// In-memory [`AccountManagerOps`] for reducer and handler tests.
///
/// Keyed by lowercased email rather than a blind index — tests don't need
/// the HMAC machinery the real [`crate::account::AccountManager`] uses.
#[derive(Debug, Clone)]
pub struct MockAccountManager {
    users: Arc<Mutex<HashMap<String, MockUser>>>,
    passkeys: Arc<Mutex<HashMap<String, MockPasskey>>>,
    lockout_threshold: u32,
    lockout_duration: chrono::Duration,
}

impl MockAccountManager {
    /// Create an empty mock account manager with a 5-attempt, 30-minute lockout policy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: Arc::new(Mutex::new(HashMap::new())),
            passkeys: Arc::new(Mutex::new(HashMap::new())),
            lockout_threshold: 5,
            lockout_duration: chrono::Duration::minutes(30),
        }
    }

    /// Seed a passkey credential directly, bypassing registration — for test setup only.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn seed_passkey(&self, credential_id: &str, user_id: UserId, public_key: Vec<u8>, counter: u32) {
        self.passkeys.lock().expect("lock poisoned").insert(
            credential_id.to_string(),
            MockPasskey { user_id, public_key, counter, friendly_name: None, last_used_at: None },
        );
    }

    /// Seed a user with a plaintext password, bypassing policy checks — for test setup only.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned or hashing fails.
    #[allow(clippy::expect_used)] // test-only setup helper
    pub fn seed_user(&self, email: &str, raw_password: &str, enabled: bool) -> UserId {
        let user_id = UserId::new();
        let hashed = HashedPassword::hash(raw_password).expect("valid password for test seed");
        self.users.lock().expect("lock poisoned").insert(
            email.to_lowercase(),
            MockUser {
                id: user_id,
                email: email.to_string(),
                hashed_password: Some(hashed.encoded().to_string()),
                enabled,
                failed_attempts: 0,
                lockout_until: None,
                roles: HashSet::new(),
            },
        );
        user_id
    }

    /// Failed-attempt counter for a seeded user, for test assertions.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    #[allow(clippy::expect_used)] // test-only assertion helper
    pub fn failed_attempts(&self, email: &str) -> u32 {
        self.users
            .lock()
            .expect("lock poisoned")
            .get(&email.to_lowercase())
            .map_or(0, |u| u.failed_attempts)
    }
}

impl Default for MockAccountManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountManagerOps for MockAccountManager {
    async fn create_user(
        &self,
        profile: NewUserProfile,
        raw_password: Option<String>,
        _recovery_email: Option<String>,
    ) -> Result<UserId> {
        let email = profile.email.normalized().to_string();
        let mut users = self.users.lock().map_err(|_| AuthError::InternalError)?;
        if users.contains_key(&email) {
            return Err(AuthError::Conflict {
                constraint: "email_unique".to_string(),
            });
        }
        let hashed_password = match raw_password {
            Some(raw) => Some(
                HashedPassword::hash(&raw)
                    .map_err(|e| AuthError::InvalidArgument(e.to_string()))?
                    .encoded()
                    .to_string(),
            ),
            None => None,
        };
        let user_id = UserId::new();
        users.insert(
            email,
            MockUser {
                id: user_id,
                email: profile.email.display().to_string(),
                hashed_password,
                enabled: true,
                failed_attempts: 0,
                lockout_until: None,
                roles: HashSet::new(),
            },
        );
        Ok(user_id)
    }

    async fn update_user_profile(&self, _user_id: UserId, _patch: ProfilePatch) -> Result<()> {
        Ok(())
    }

    async fn change_user_password(&self, user_id: UserId, old_raw: &str, new_raw: &str) -> Result<()> {
        if old_raw == new_raw {
            return Err(AuthError::InvalidArgument(
                "new password must differ from the current password".to_string(),
            ));
        }
        let mut users = self.users.lock().map_err(|_| AuthError::InternalError)?;
        let user = users
            .values_mut()
            .find(|u| u.id == user_id)
            .ok_or(AuthError::ResourceNotFound)?;
        let Some(hash) = &user.hashed_password else {
            return Err(AuthError::InvalidArgument("account has no password credential".to_string()));
        };
        if !HashedPassword::from_encoded(hash.clone())
            .verify(old_raw)
            .map_err(|e| AuthError::InvalidArgument(e.to_string()))?
        {
            return Err(AuthError::InvalidCredentials);
        }
        user.hashed_password = Some(
            HashedPassword::hash(new_raw)
                .map_err(|e| AuthError::InvalidArgument(e.to_string()))?
                .encoded()
                .to_string(),
        );
        Ok(())
    }

    async fn admin_change_user_password(&self, user_id: UserId, new_raw: &str) -> Result<()> {
        let mut users = self.users.lock().map_err(|_| AuthError::InternalError)?;
        let user = users
            .values_mut()
            .find(|u| u.id == user_id)
            .ok_or(AuthError::ResourceNotFound)?;
        user.hashed_password = Some(
            HashedPassword::hash(new_raw)
                .map_err(|e| AuthError::InvalidArgument(e.to_string()))?
                .encoded()
                .to_string(),
        );
        Ok(())
    }

    async fn admin_unlock_user(&self, user_id: UserId) -> Result<()> {
        let mut users = self.users.lock().map_err(|_| AuthError::InternalError)?;
        let user = users
            .values_mut()
            .find(|u| u.id == user_id)
            .ok_or(AuthError::ResourceNotFound)?;
        user.failed_attempts = 0;
        user.lockout_until = None;
        Ok(())
    }

    async fn admin_set_user_enabled(&self, user_id: UserId, enabled: bool) -> Result<()> {
        let mut users = self.users.lock().map_err(|_| AuthError::InternalError)?;
        let user = users
            .values_mut()
            .find(|u| u.id == user_id)
            .ok_or(AuthError::ResourceNotFound)?;
        user.enabled = enabled;
        Ok(())
    }

    async fn append_role(&self, user_id: UserId, role_id: RoleId) -> Result<()> {
        let mut users = self.users.lock().map_err(|_| AuthError::InternalError)?;
        let user = users
            .values_mut()
            .find(|u| u.id == user_id)
            .ok_or(AuthError::ResourceNotFound)?;
        user.roles.insert(role_id);
        Ok(())
    }

    async fn revoke_role(&self, user_id: UserId, role_id: RoleId) -> Result<()> {
        let mut users = self.users.lock().map_err(|_| AuthError::InternalError)?;
        let user = users
            .values_mut()
            .find(|u| u.id == user_id)
            .ok_or(AuthError::ResourceNotFound)?;
        user.roles.remove(&role_id);
        Ok(())
    }

    async fn delete_user_account(&self, user_id: UserId) -> Result<()> {
        let mut users = self.users.lock().map_err(|_| AuthError::InternalError)?;
        users.retain(|_, u| u.id != user_id);
        Ok(())
    }

    async fn verify_login_credentials(&self, identifier: &str, raw_password: &str) -> Result<UserId> {
        let users = self.users.lock().map_err(|_| AuthError::InternalError)?;
        let user = users.get(&identifier.to_lowercase()).ok_or(AuthError::InvalidCredentials)?;

        if !user.enabled {
            return Err(AuthError::InvalidCredentials);
        }
        if let Some(lock_until) = user.lockout_until {
            if Utc::now() < lock_until {
                let retry_after = (lock_until - Utc::now()).to_std().unwrap_or(StdDuration::from_secs(0));
                return Err(AuthError::Locked { retry_after });
            }
        }
        let Some(hash) = &user.hashed_password else {
            return Err(AuthError::InvalidCredentials);
        };
        match HashedPassword::from_encoded(hash.clone()).verify(raw_password) {
            Ok(true) => Ok(user.id),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn handle_failed_login(&self, identifier: &str) {
        let Ok(mut users) = self.users.lock() else { return };
        if let Some(user) = users.get_mut(&identifier.to_lowercase()) {
            user.failed_attempts += 1;
            if user.failed_attempts >= self.lockout_threshold {
                user.lockout_until = Some(Utc::now() + self.lockout_duration);
            }
        }
    }

    async fn handle_successful_login(
        &self,
        identifier: &str,
        _fingerprint_hash: Option<String>,
        _ip: Option<std::net::IpAddr>,
        _country: Option<String>,
    ) -> Result<()> {
        let mut users = self.users.lock().map_err(|_| AuthError::InternalError)?;
        if let Some(user) = users.get_mut(&identifier.to_lowercase()) {
            user.failed_attempts = 0;
            user.lockout_until = None;
        }
        Ok(())
    }

    async fn find_or_create_federated_user(&self, email: &str, _given_name: Option<String>) -> Result<UserId> {
        let key = email.to_lowercase();
        {
            let users = self.users.lock().map_err(|_| AuthError::InternalError)?;
            if let Some(user) = users.get(&key) {
                return Ok(user.id);
            }
        }
        let user_id = UserId::new();
        self.users.lock().map_err(|_| AuthError::InternalError)?.insert(
            key,
            MockUser {
                id: user_id,
                email: email.to_string(),
                hashed_password: None,
                enabled: true,
                failed_attempts: 0,
                lockout_until: None,
                roles: HashSet::new(),
            },
        );
        Ok(user_id)
    }

    async fn get_user_email(&self, user_id: UserId) -> Result<String> {
        let users = self.users.lock().map_err(|_| AuthError::InternalError)?;
        users
            .values()
            .find(|u| u.id == user_id)
            .map(|u| u.email.clone())
            .ok_or(AuthError::ResourceNotFound)
    }

    async fn find_user_id_by_email(&self, email: &str) -> Result<UserId> {
        let users = self.users.lock().map_err(|_| AuthError::InternalError)?;
        users
            .get(&email.to_lowercase())
            .map(|u| u.id)
            .ok_or(AuthError::InvalidCredentials)
    }

    async fn create_passkey_credential(
        &self,
        user_id: UserId,
        credential_id: String,
        public_key: Vec<u8>,
        friendly_name: Option<String>,
    ) -> Result<()> {
        let mut passkeys = self.passkeys.lock().map_err(|_| AuthError::InternalError)?;
        if passkeys.contains_key(&credential_id) {
            return Err(AuthError::Conflict { constraint: "credential_id_unique".to_string() });
        }
        passkeys.insert(
            credential_id,
            MockPasskey { user_id, public_key, counter: 0, friendly_name, last_used_at: None },
        );
        Ok(())
    }

    async fn list_passkey_credentials(&self, user_id: UserId) -> Result<Vec<PasskeyCredentialSummary>> {
        let passkeys = self.passkeys.lock().map_err(|_| AuthError::InternalError)?;
        Ok(passkeys
            .iter()
            .filter(|(_, p)| p.user_id == user_id)
            .map(|(credential_id, p)| PasskeyCredentialSummary {
                credential_id: credential_id.clone(),
                friendly_name: p.friendly_name.clone(),
                last_used_at: p.last_used_at,
            })
            .collect())
    }

    async fn get_passkey_credential(&self, credential_id: &str) -> Result<PasskeyCredential> {
        let passkeys = self.passkeys.lock().map_err(|_| AuthError::InternalError)?;
        let p = passkeys.get(credential_id).ok_or(AuthError::PasskeyNotFound)?;
        Ok(PasskeyCredential {
            credential_id: credential_id.to_string(),
            user_id: p.user_id,
            public_key: p.public_key.clone(),
            counter: p.counter,
        })
    }

    async fn update_passkey_signature_count(&self, credential_id: &str, new_count: u32) -> Result<()> {
        let mut passkeys = self.passkeys.lock().map_err(|_| AuthError::InternalError)?;
        let p = passkeys.get_mut(credential_id).ok_or(AuthError::PasskeyNotFound)?;
        if new_count <= p.counter {
            return Err(AuthError::SignatureCounterRegression);
        }
        p.counter = new_count;
        p.last_used_at = Some(Utc::now());
        Ok(())
    }

    async fn delete_passkey_credential(&self, user_id: UserId, credential_id: &str) -> Result<()> {
        let mut passkeys = self.passkeys.lock().map_err(|_| AuthError::InternalError)?;
        match passkeys.get(credential_id) {
            Some(p) if p.user_id == user_id => {
                passkeys.remove(credential_id);
                Ok(())
            }
            _ => Err(AuthError::PasskeyNotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn verify_login_credentials_accepts_seeded_password() {
        let manager = MockAccountManager::new();
        let user_id = manager.seed_user("alice@example.com", "correct-horse1", true);

        let verified = manager
            .verify_login_credentials("alice@example.com", "correct-horse1")
            .await
            .unwrap();
        assert_eq!(verified, user_id);
    }

    #[tokio::test]
    async fn verify_login_credentials_rejects_wrong_password() {
        let manager = MockAccountManager::new();
        manager.seed_user("alice@example.com", "correct-horse1", true);

        let err = manager
            .verify_login_credentials("alice@example.com", "wrong-password1")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn repeated_failures_trigger_lockout() {
        let manager = MockAccountManager::new();
        manager.seed_user("alice@example.com", "correct-horse1", true);

        for _ in 0..5 {
            manager.handle_failed_login("alice@example.com").await;
        }

        let err = manager
            .verify_login_credentials("alice@example.com", "correct-horse1")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Locked { .. }));
    }

    #[tokio::test]
    async fn successful_login_resets_failed_attempts() {
        let manager = MockAccountManager::new();
        manager.seed_user("alice@example.com", "correct-horse1", true);
        manager.handle_failed_login("alice@example.com").await;
        manager.handle_failed_login("alice@example.com").await;
        assert_eq!(manager.failed_attempts("alice@example.com"), 2);

        manager
            .handle_successful_login("alice@example.com", None, None, None)
            .await
            .unwrap();
        assert_eq!(manager.failed_attempts("alice@example.com"), 0);
    }

    #[tokio::test]
    async fn passkey_credential_lifecycle() {
        let manager = MockAccountManager::new();
        let user_id = manager.seed_user("alice@example.com", "correct-horse1", true);

        manager
            .create_passkey_credential(user_id, "cred-1".to_string(), vec![1, 2, 3], Some("Phone".to_string()))
            .await
            .unwrap();

        let listed = manager.list_passkey_credentials(user_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].credential_id, "cred-1");

        let fetched = manager.get_passkey_credential("cred-1").await.unwrap();
        assert_eq!(fetched.user_id, user_id);
        assert_eq!(fetched.counter, 0);

        manager.update_passkey_signature_count("cred-1", 1).await.unwrap();
        let fetched = manager.get_passkey_credential("cred-1").await.unwrap();
        assert_eq!(fetched.counter, 1);

        manager.delete_passkey_credential(user_id, "cred-1").await.unwrap();
        assert!(manager.get_passkey_credential("cred-1").await.is_err());
    }

    #[tokio::test]
    async fn passkey_signature_count_rejects_regression() {
        let manager = MockAccountManager::new();
        let user_id = manager.seed_user("alice@example.com", "correct-horse1", true);
        manager.seed_passkey("cred-1", user_id, vec![1, 2, 3], 5);

        let err = manager.update_passkey_signature_count("cred-1", 5).await.unwrap_err();
        assert!(matches!(err, AuthError::SignatureCounterRegression));
    }

    #[tokio::test]
    async fn delete_passkey_credential_rejects_wrong_owner() {
        let manager = MockAccountManager::new();
        let owner = manager.seed_user("alice@example.com", "correct-horse1", true);
        let other = manager.seed_user("bob@example.com", "correct-horse1", true);
        manager.seed_passkey("cred-1", owner, vec![1, 2, 3], 0);

        let err = manager.delete_passkey_credential(other, "cred-1").await.unwrap_err();
        assert!(matches!(err, AuthError::PasskeyNotFound));
    }

    #[tokio::test]
    async fn find_or_create_federated_user_provisions_once() {
        let manager = MockAccountManager::new();
        let first = manager
            .find_or_create_federated_user("bob@example.com", Some("Bob".to_string()))
            .await
            .unwrap();
        let second = manager
            .find_or_create_federated_user("bob@example.com", None)
            .await
            .unwrap();
        assert_eq!(first, second);
    }
}
