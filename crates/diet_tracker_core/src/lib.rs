pub mod domain;
pub mod gate;
pub mod ports;

pub use domain::{AuthPhase, CredentialRecord, DietEntry, Enrollment, EntryRowError, Role, Session};
pub use gate::{AuthGate, GateError, DEFAULT_IDLE_TIMEOUT_MINUTES};
pub use ports::{CredentialStore, EntryStore, Notifier, PortError, PortResult};
