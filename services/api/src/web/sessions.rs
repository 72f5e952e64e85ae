//! services/api/src/web/sessions.rs
//!
//! The in-memory session store, keyed by the opaque token carried in the
//! `session` cookie. Sessions are deliberately never persisted: they are
//! destroyed on logout, on idle-timeout expiry, and with the process.

use diet_tracker_core::domain::Session;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct SessionStore {
    inner: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the session for this token, if one exists.
    pub async fn get(&self, token: &str) -> Option<Session> {
        self.inner.read().await.get(token).cloned()
    }

    /// Stores (or replaces) the session for this token.
    pub async fn put(&self, token: &str, session: Session) {
        self.inner.write().await.insert(token.to_string(), session);
    }

    /// Destroys the session for this token.
    pub async fn remove(&self, token: &str) {
        self.inner.write().await.remove(token);
    }
}

/// Pulls the session token out of a request's `Cookie` header.
pub fn session_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
}
