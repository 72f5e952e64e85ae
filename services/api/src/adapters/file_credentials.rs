//! services/api/src/adapters/file_credentials.rs
//!
//! The read-write JSON-file credential store. This is the concrete
//! implementation of the `CredentialStore` port backed by a local
//! `users_app.json` map of username to record. First-login provisioning
//! writes the one-time secret back to this file.

use async_trait::async_trait;
use diet_tracker_core::domain::{CredentialRecord, Role};
use diet_tracker_core::ports::{CredentialStore, PortError, PortResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A credential store adapter backed by a JSON file on local disk.
pub struct FileCredentials {
    path: PathBuf,
}

impl FileCredentials {
    /// Creates a new `FileCredentials` over the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> PortResult<UserFile> {
        let data = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            PortError::Unavailable(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        serde_json::from_str(&data).map_err(|e| {
            PortError::Malformed(format!("{}: {}", self.path.display(), e))
        })
    }
}

//=========================================================================================
// "Impure" File Record Structs
//=========================================================================================

// BTreeMap keeps the on-disk order stable across rewrites.
type UserFile = BTreeMap<String, UserRecord>;

#[derive(Serialize, Deserialize)]
struct UserRecord {
    /// PHC-format password hash.
    password: String,
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    otp_secret: Option<String>,
}

impl UserRecord {
    fn to_domain(&self, username: &str) -> PortResult<CredentialRecord> {
        let role = self.role.parse::<Role>().map_err(|e| {
            PortError::Malformed(format!("user '{}': {}", username, e))
        })?;
        Ok(CredentialRecord {
            username: username.to_string(),
            password_hash: self.password.clone(),
            role,
            otp_secret: self.otp_secret.clone(),
        })
    }
}

//=========================================================================================
// `CredentialStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl CredentialStore for FileCredentials {
    async fn get(&self, username: &str) -> PortResult<CredentialRecord> {
        let users = self.load().await?;
        match users.get(username) {
            Some(record) => record.to_domain(username),
            None => Err(PortError::NotFound(format!("user '{}' not found", username))),
        }
    }

    async fn store_otp_secret(&self, username: &str, secret: &str) -> PortResult<()> {
        let mut users = self.load().await?;
        let record = users
            .get_mut(username)
            .ok_or_else(|| PortError::NotFound(format!("user '{}' not found", username)))?;
        record.otp_secret = Some(secret.to_string());

        let json = serde_json::to_string_pretty(&users)
            .map_err(|e| PortError::Malformed(e.to_string()))?;
        tokio::fs::write(&self.path, json).await.map_err(|e| {
            PortError::Unavailable(format!("cannot write {}: {}", self.path.display(), e))
        })?;
        Ok(())
    }
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FIXTURE: &str = r#"{
        "alice": {
            "password": "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$u1pHKXeCzQQ5Ij2ZtAl20Q",
            "role": "patient"
        },
        "drbob": {
            "password": "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$u1pHKXeCzQQ5Ij2ZtAl20Q",
            "role": "doctor",
            "otp_secret": "JBSWY3DPEHPK3PXP"
        }
    }"#;

    fn fixture_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn reads_records_and_maps_roles() {
        let file = fixture_file();
        let store = FileCredentials::new(file.path());

        let alice = store.get("alice").await.unwrap();
        assert_eq!(alice.role, Role::Patient);
        assert!(alice.otp_secret.is_none());

        let bob = store.get("drbob").await.unwrap();
        assert_eq!(bob.role, Role::Doctor);
        assert_eq!(bob.otp_secret.as_deref(), Some("JBSWY3DPEHPK3PXP"));
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let file = fixture_file();
        let store = FileCredentials::new(file.path());
        assert!(matches!(
            store.get("mallory").await,
            Err(PortError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn secret_write_back_survives_a_reload() {
        let file = fixture_file();
        let store = FileCredentials::new(file.path());

        store
            .store_otp_secret("alice", "GEZDGNBVGY3TQOJQ")
            .await
            .unwrap();

        let reloaded = FileCredentials::new(file.path());
        let alice = reloaded.get("alice").await.unwrap();
        assert_eq!(alice.otp_secret.as_deref(), Some("GEZDGNBVGY3TQOJQ"));
        // Untouched records come through the rewrite intact.
        let bob = reloaded.get("drbob").await.unwrap();
        assert_eq!(bob.otp_secret.as_deref(), Some("JBSWY3DPEHPK3PXP"));
    }

    #[tokio::test]
    async fn missing_file_reports_unavailable() {
        let store = FileCredentials::new("/nonexistent/users_app.json");
        assert!(matches!(
            store.get("alice").await,
            Err(PortError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn garbage_file_reports_malformed() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"not json at all").unwrap();
        let store = FileCredentials::new(file.path());
        assert!(matches!(
            store.get("alice").await,
            Err(PortError::Malformed(_))
        ));
    }
}
