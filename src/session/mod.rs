//! In-memory session store.
//!
//! Sessions are keyed by random opaque tokens carried as bearer credentials.
//! A session may exist before the OAuth exchange completes, in which case it
//! has no access token yet.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A single session record.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Provider access token, absent until the OAuth exchange completes
    pub access_token: Option<String>,
}

/// Shared store of live sessions.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session and return its token.
    pub fn create(&self, access_token: Option<String>) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        let mut sessions = self.inner.write().expect("session store poisoned");
        sessions.insert(token.clone(), Session { access_token });
        token
    }

    /// Look up a session by token.
    pub fn get(&self, token: &str) -> Option<Session> {
        let sessions = self.inner.read().expect("session store poisoned");
        sessions.get(token).cloned()
    }

    /// Attach an access token to an existing session. Returns false if the
    /// session is gone.
    pub fn set_access_token(&self, token: &str, access_token: String) -> bool {
        let mut sessions = self.inner.write().expect("session store poisoned");
        match sessions.get_mut(token) {
            Some(session) => {
                session.access_token = Some(access_token);
                true
            }
            None => false,
        }
    }

    /// Invalidate a session.
    pub fn destroy(&self, token: &str) {
        let mut sessions = self.inner.write().expect("session store poisoned");
        sessions.remove(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get() {
        let store = SessionStore::new();
        let token = store.create(Some("access-123".to_string()));

        let session = store.get(&token).expect("session should exist");
        assert_eq!(session.access_token.as_deref(), Some("access-123"));
    }

    #[test]
    fn test_pre_auth_session_has_no_token() {
        let store = SessionStore::new();
        let token = store.create(None);

        let session = store.get(&token).expect("session should exist");
        assert!(session.access_token.is_none());
    }

    #[test]
    fn test_destroy() {
        let store = SessionStore::new();
        let token = store.create(None);
        store.destroy(&token);

        assert!(store.get(&token).is_none());
    }

    #[test]
    fn test_set_access_token() {
        let store = SessionStore::new();
        let token = store.create(None);

        assert!(store.set_access_token(&token, "late-token".to_string()));
        let session = store.get(&token).unwrap();
        assert_eq!(session.access_token.as_deref(), Some("late-token"));

        assert!(!store.set_access_token("no-such-session", "x".to_string()));
    }
}
