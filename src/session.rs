//! Browser login sessions.
//!
//! The only state this process owns: a cookie-keyed record of who is signed
//! in, holding the identity service's tokens for outbound calls. Chats and
//! messages live in the external backend and are re-fetched per view, so
//! nothing conversational is stored here.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::{AuthSession, AuthUser};

/// Default session timeout (30 minutes).
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// A single signed-in browser session.
#[derive(Debug)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    /// Unique session identifier, carried in the browser cookie.
    id: String,
    /// Tokens and user identity from the external identity service.
    auth: AuthSession,
    /// Session creation time.
    created_at: DateTime<Utc>,
    /// Last activity time.
    last_activity: RwLock<DateTime<Utc>>,
}

impl Clone for Session {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Session {
    fn new(id: String, auth: AuthSession) -> Self {
        let now = Utc::now();
        Self {
            inner: Arc::new(SessionInner {
                id,
                auth,
                created_at: now,
                last_activity: RwLock::new(now),
            }),
        }
    }

    /// Get the session ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// The signed-in user.
    #[must_use]
    pub fn user(&self) -> &AuthUser {
        &self.inner.auth.user
    }

    /// Bearer token for GraphQL calls on this user's behalf.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.inner.auth.access_token
    }

    /// Refresh token, needed for the remote sign-out notice.
    #[must_use]
    pub fn refresh_token(&self) -> &str {
        &self.inner.auth.refresh_token
    }

    /// Update the last activity timestamp.
    pub fn touch(&self) {
        let mut guard = self.inner.last_activity.write().unwrap();
        *guard = Utc::now();
    }

    /// Check if the session has been inactive longer than the timeout.
    #[must_use]
    pub fn is_expired_with_timeout(&self, timeout: Duration) -> bool {
        let last = *self.inner.last_activity.read().unwrap();
        let now = Utc::now();
        if let Ok(duration) = (now - last).to_std() {
            duration > timeout
        } else {
            // Negative duration means clock skew or "last" is in future.
            false
        }
    }

    /// Get the session age.
    #[must_use]
    pub fn age(&self) -> Duration {
        let now = Utc::now();
        (now - self.inner.created_at)
            .to_std()
            .unwrap_or(Duration::from_secs(0))
    }
}

/// Thread-safe store for browser sessions.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

#[derive(Debug)]
struct SessionStoreInner {
    sessions: RwLock<HashMap<String, Session>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Create a new session store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                sessions: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Record a fresh sign-in and return its session.
    #[must_use]
    pub fn insert(&self, auth: AuthSession) -> Session {
        let id = Uuid::new_v4().to_string();
        let session = Session::new(id.clone(), auth);
        let mut guard = self.inner.sessions.write().unwrap();
        guard.insert(id, session.clone());
        session
    }

    /// Get a session by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Session> {
        let guard = self.inner.sessions.read().unwrap();
        guard.get(id).cloned()
    }

    /// Remove a session by ID.
    pub fn remove(&self, id: &str) -> Option<Session> {
        let mut guard = self.inner.sessions.write().unwrap();
        guard.remove(id)
    }

    /// Get the number of active sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.sessions.read().unwrap().len()
    }

    /// Check if there are no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove sessions that have been inactive longer than the timeout.
    ///
    /// Returns the number of sessions removed.
    pub fn cleanup_expired_with_timeout(&self, timeout: Duration) -> usize {
        let mut guard = self.inner.sessions.write().unwrap();
        let before = guard.len();
        guard.retain(|_, session| !session.is_expired_with_timeout(timeout));
        before - guard.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_auth(email: &str) -> AuthSession {
        AuthSession {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            user: AuthUser {
                id: Uuid::new_v4(),
                email: email.to_string(),
                display_name: None,
            },
        }
    }

    #[test]
    fn test_session_lifecycle() {
        let store = SessionStore::new();
        assert!(store.is_empty());

        let session = store.insert(test_auth("a@b.c"));
        assert_eq!(store.len(), 1);
        assert_eq!(session.user().email, "a@b.c");
        assert_eq!(session.access_token(), "access");

        let retrieved = store.get(session.id()).unwrap();
        assert_eq!(retrieved.id(), session.id());

        store.remove(session.id());
        assert!(store.is_empty());
    }

    #[test]
    fn test_unknown_id_is_absent() {
        let store = SessionStore::new();
        assert!(store.get("nope").is_none());
        assert!(store.remove("nope").is_none());
    }

    #[test]
    fn test_expiry_and_cleanup() {
        let store = SessionStore::new();
        let session = store.insert(test_auth("a@b.c"));

        assert!(!session.is_expired_with_timeout(DEFAULT_SESSION_TIMEOUT));

        std::thread::sleep(Duration::from_millis(20));
        assert!(session.is_expired_with_timeout(Duration::from_millis(1)));

        // Activity resets the clock.
        session.touch();
        assert!(!session.is_expired_with_timeout(Duration::from_secs(1)));

        std::thread::sleep(Duration::from_millis(20));
        let removed = store.cleanup_expired_with_timeout(Duration::from_millis(1));
        assert_eq!(removed, 1);
        assert!(store.is_empty());
    }
}
