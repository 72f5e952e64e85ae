//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::web::sessions::SessionStore;
use diet_tracker_core::gate::AuthGate;
use diet_tracker_core::ports::{EntryStore, Notifier};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    /// The authentication & session gate; per-caller state lives in the
    /// session store, not here.
    pub gate: AuthGate,
    pub entries: Arc<dyn EntryStore>,
    /// Absent when no SMTP configuration was provided.
    pub notifier: Option<Arc<dyn Notifier>>,
    pub sessions: SessionStore,
    pub config: Arc<Config>,
}
