//! Mock session store for testing.

use crate::error::{AuthError, Result};
use crate::providers::SessionStore;
use crate::state::{Session, SessionId, UserId};
use chrono::Duration;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

/// Mock session store.
///
/// Uses in-memory storage for testing.
#[derive(Debug, Clone)]
pub struct MockSessionStore {
    sessions: Arc<Mutex<HashMap<SessionId, Session>>>,
}

impl MockSessionStore {
    /// Create a new mock session store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Get count of stored sessions (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned.
    pub fn session_count(&self) -> Result<usize> {
        Ok(self.sessions.lock().map_err(|_| AuthError::InternalError)?.len())
    }
}

impl Default for MockSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MockSessionStore {
    fn create_session(&self, session: &Session, _ttl: Duration) -> impl Future<Output = Result<()>> + Send {
        let sessions = Arc::clone(&self.sessions);
        let session = session.clone();

        async move {
            let mut sessions_guard = sessions.lock().map_err(|_| AuthError::InternalError)?;

            if sessions_guard.contains_key(&session.session_id) {
                return Err(AuthError::Conflict {
                    constraint: "session_id_unique".to_string(),
                });
            }

            sessions_guard.insert(session.session_id, session);
            Ok(())
        }
    }

    fn get_session(&self, session_id: SessionId) -> impl Future<Output = Result<Session>> + Send {
        let sessions = Arc::clone(&self.sessions);

        async move {
            let mut sessions_guard = sessions.lock().map_err(|_| AuthError::InternalError)?;

            let session = sessions_guard.get_mut(&session_id).ok_or(AuthError::SessionNotFound)?;

            let now = chrono::Utc::now();

            if session.expires_at < now {
                return Err(AuthError::SessionExpired);
            }

            let idle_duration = now.signed_duration_since(session.last_active);
            if idle_duration > session.idle_timeout {
                return Err(AuthError::SessionExpired);
            }

            session.last_active = now;
            Ok(session.clone())
        }
    }

    fn update_session(&self, session: &Session) -> impl Future<Output = Result<()>> + Send {
        let sessions = Arc::clone(&self.sessions);
        let session = session.clone();

        async move {
            let mut sessions_guard = sessions.lock().map_err(|_| AuthError::InternalError)?;

            if !sessions_guard.contains_key(&session.session_id) {
                return Err(AuthError::SessionNotFound);
            }

            sessions_guard.insert(session.session_id, session);
            Ok(())
        }
    }

    fn delete_session(&self, session_id: SessionId) -> impl Future<Output = Result<()>> + Send {
        let sessions = Arc::clone(&self.sessions);

        async move {
            sessions.lock().map_err(|_| AuthError::InternalError)?.remove(&session_id);
            Ok(())
        }
    }

    fn delete_user_sessions(&self, user_id: UserId) -> impl Future<Output = Result<usize>> + Send {
        let sessions = Arc::clone(&self.sessions);

        async move {
            let mut sessions_guard = sessions.lock().map_err(|_| AuthError::InternalError)?;

            let session_ids_to_delete: Vec<SessionId> = sessions_guard
                .iter()
                .filter(|(_, s)| s.user_id == user_id)
                .map(|(id, _)| *id)
                .collect();

            let count = session_ids_to_delete.len();
            for session_id in session_ids_to_delete {
                sessions_guard.remove(&session_id);
            }

            Ok(count)
        }
    }

    fn exists(&self, session_id: SessionId) -> impl Future<Output = Result<bool>> + Send {
        let sessions = Arc::clone(&self.sessions);

        async move {
            let sessions_guard = sessions.lock().map_err(|_| AuthError::InternalError)?;
            Ok(sessions_guard
                .get(&session_id)
                .is_some_and(|s| s.expires_at >= chrono::Utc::now()))
        }
    }

    fn get_ttl(&self, session_id: SessionId) -> impl Future<Output = Result<Option<Duration>>> + Send {
        let sessions = Arc::clone(&self.sessions);

        async move {
            let sessions_guard = sessions.lock().map_err(|_| AuthError::InternalError)?;

            Ok(sessions_guard.get(&session_id).map(|session| {
                let now = chrono::Utc::now();
                if session.expires_at > now {
                    session.expires_at.signed_duration_since(now)
                } else {
                    Duration::zero()
                }
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{DeviceId, UserId};
    use std::net::{IpAddr, Ipv4Addr};

    fn sample_session() -> Session {
        Session {
            session_id: SessionId::new(),
            user_id: UserId::new(),
            device_id: DeviceId::new(),
            email: "alice@example.com".to_string(),
            created_at: chrono::Utc::now(),
            last_active: chrono::Utc::now(),
            expires_at: chrono::Utc::now() + Duration::hours(1),
            ip_address: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            user_agent: "test-agent".to_string(),
            oauth_provider: None,
            login_risk_score: 0.0,
            idle_timeout: Duration::minutes(30),
            enable_sliding_refresh: false,
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = MockSessionStore::new();
        let session = sample_session();
        store.create_session(&session, Duration::hours(1)).await.unwrap();

        let fetched = store.get_session(session.session_id).await.unwrap();
        assert_eq!(fetched.session_id, session.session_id);
    }

    #[tokio::test]
    async fn duplicate_create_conflicts() {
        let store = MockSessionStore::new();
        let session = sample_session();
        store.create_session(&session, Duration::hours(1)).await.unwrap();

        let err = store.create_session(&session, Duration::hours(1)).await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict { .. }));
    }

    #[tokio::test]
    async fn expired_session_is_rejected() {
        let store = MockSessionStore::new();
        let mut session = sample_session();
        session.expires_at = chrono::Utc::now() - Duration::minutes(1);
        store.create_session(&session, Duration::hours(1)).await.unwrap();

        let err = store.get_session(session.session_id).await.unwrap_err();
        assert!(matches!(err, AuthError::SessionExpired));
    }

    #[tokio::test]
    async fn delete_user_sessions_removes_all() {
        let store = MockSessionStore::new();
        let user_id = UserId::new();
        let mut a = sample_session();
        a.user_id = user_id;
        let mut b = sample_session();
        b.user_id = user_id;

        store.create_session(&a, Duration::hours(1)).await.unwrap();
        store.create_session(&b, Duration::hours(1)).await.unwrap();

        let deleted = store.delete_user_sessions(user_id).await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.session_count().unwrap(), 0);
    }
}
