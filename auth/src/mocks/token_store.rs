//! Mock token store for testing.

use crate::error::{AuthError, Result};
use crate::providers::{TokenData, TokenStore};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock token store.
///
/// In-memory token store for testing with atomic single-use semantics.
#[derive(Debug, Clone)]
pub struct MockTokenStore {
    tokens: Arc<Mutex<HashMap<String, TokenData>>>,
}

impl MockTokenStore {
    /// Create a new mock token store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tokens: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Get all stored tokens (for testing).
    #[must_use]
    pub fn get_all(&self) -> HashMap<String, TokenData> {
        self.tokens.lock().unwrap().clone()
    }

    /// Clear all tokens (for testing).
    pub fn clear(&self) {
        self.tokens.lock().unwrap().clear();
    }
}

impl Default for MockTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for MockTokenStore {
    async fn store_token(&self, token_id: &str, token_data: TokenData) -> Result<()> {
        let mut tokens = self.tokens.lock().unwrap();
        tokens.insert(token_id.to_string(), token_data);
        Ok(())
    }

    async fn consume_token(&self, token_id: &str, token: &str) -> Result<Option<TokenData>> {
        let mut tokens = self.tokens.lock().unwrap();

        // Atomic check-and-delete under mutex protection
        let Some(stored_data) = tokens.get(token_id) else {
            return Ok(None);
        };

        // ⚡ SECURITY FIX (BLOCKER #5): Constant-time validation to prevent timing attacks
        //
        // VULNERABILITY: Early returns create timing side-channel
        // - Wrong token: Fast return (no time check)
        // - Expired token: Slow return (time check + token removal)
        // → Attacker can distinguish between wrong vs expired tokens
        //
        // FIX: Always perform ALL checks, regardless of early failures

        // 1. Check token match (constant-time comparison)
        let token_matches = constant_time_eq::constant_time_eq(
            token.as_bytes(),
            stored_data.token.as_bytes(),
        );

        // 2. Check expiration (always execute, even if token doesn't match)
        let now = Utc::now();
        let is_expired = now > stored_data.expires_at;

        // 3. Determine if valid (both conditions must pass)
        let is_valid = token_matches && !is_expired;

        // 4. Always remove token if expired (regardless of match)
        //    This ensures cleanup happens in constant time
        if is_expired {
            tokens.remove(token_id);
        }

        // 5. Consume token only if fully valid
        if is_valid {
            // Token is valid and not expired - consume it
            let token_data = tokens.remove(token_id).ok_or_else(|| {
                AuthError::TokenConsumed("Token was consumed by another request".to_string())
            })?;
            Ok(Some(token_data))
        } else {
            // Invalid or expired - same return path for both cases
            Ok(None)
        }
    }

    async fn delete_token(&self, token_id: &str) -> Result<()> {
        let mut tokens = self.tokens.lock().unwrap();
        tokens.remove(token_id);
        Ok(())
    }

    async fn exists(&self, token_id: &str) -> Result<bool> {
        let tokens = self.tokens.lock().unwrap();

        let Some(token_data) = tokens.get(token_id) else {
            return Ok(false);
        };

        // Check if expired
        if Utc::now() > token_data.expires_at {
            return Ok(false);
        }

        Ok(true)
    }
}
