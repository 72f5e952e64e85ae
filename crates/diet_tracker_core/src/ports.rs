//! crates/diet_tracker_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete external collaborators: the credential
//! store, the shared spreadsheet, and the outbound notification channel.

use async_trait::async_trait;

use crate::domain::{CredentialRecord, DietEntry};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., a file
/// store, a spreadsheet API, an SMTP server).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Malformed data: {0}")]
    Malformed(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Keyed storage of credential records, external to this process. Reads must
/// be consistent within one session; nothing else is assumed about the backend.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, username: &str) -> PortResult<CredentialRecord>;

    /// Persists a freshly provisioned one-time secret. This is the one and
    /// only mutation the gate ever performs on the credential store.
    async fn store_otp_secret(&self, username: &str, secret: &str) -> PortResult<()>;
}

/// Append-only tabular storage for daily entries. No update or delete path
/// exists; readers scan all rows and pick what they need.
#[async_trait]
pub trait EntryStore: Send + Sync {
    async fn append(&self, entry: &DietEntry) -> PortResult<()>;

    async fn read_all(&self) -> PortResult<Vec<DietEntry>>;
}

/// Fire-and-forget outbound notification. Callers must swallow and log a
/// failure; it never blocks or fails the operation that triggered it.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, subject: &str, body: &str) -> PortResult<()>;
}
