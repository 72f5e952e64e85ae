//! services/api/src/adapters/secrets_credentials.rs
//!
//! The read-only secrets-file credential store, for deployments where
//! credentials live in a managed secrets bundle mounted at startup. Runtime
//! write-back is not possible there, so `store_otp_secret` refuses: accounts
//! on this backend are provisioned with their one-time secret out of band.

use async_trait::async_trait;
use diet_tracker_core::domain::{CredentialRecord, Role};
use diet_tracker_core::ports::{CredentialStore, PortError, PortResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A credential store adapter over a secrets file loaded once at startup.
pub struct SecretsCredentials {
    users: HashMap<String, CredentialRecord>,
}

#[derive(Deserialize)]
struct SecretRecord {
    password: String,
    role: String,
    #[serde(default)]
    otp_secret: Option<String>,
}

impl SecretsCredentials {
    /// Loads and validates the whole secrets file eagerly, so a malformed
    /// bundle fails the process at startup rather than the first login.
    pub fn load(path: &Path) -> Result<Self, PortError> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            PortError::Unavailable(format!("cannot read {}: {}", path.display(), e))
        })?;
        let records: HashMap<String, SecretRecord> = serde_json::from_str(&data)
            .map_err(|e| PortError::Malformed(format!("{}: {}", path.display(), e)))?;

        let mut users = HashMap::with_capacity(records.len());
        for (username, record) in records {
            let role = record.role.parse::<Role>().map_err(|e| {
                PortError::Malformed(format!("user '{}': {}", username, e))
            })?;
            users.insert(
                username.clone(),
                CredentialRecord {
                    username,
                    password_hash: record.password,
                    role,
                    otp_secret: record.otp_secret,
                },
            );
        }
        Ok(Self { users })
    }
}

//=========================================================================================
// `CredentialStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl CredentialStore for SecretsCredentials {
    async fn get(&self, username: &str) -> PortResult<CredentialRecord> {
        self.users
            .get(username)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("user '{}' not found", username)))
    }

    async fn store_otp_secret(&self, _username: &str, _secret: &str) -> PortResult<()> {
        Err(PortError::Unavailable(
            "the secrets store is read-only; provision one-time secrets out of band".to_string(),
        ))
    }
}

//=========================================================================================
// Tests
//=========================================================================================
