//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development. The credential store and the outbound
//! notifier are selected here: one gate, swappable backends.

use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which credential backend the gate runs against.
#[derive(Clone, Debug)]
pub enum CredentialBackend {
    /// Read-write JSON file; first-login provisioning writes the one-time
    /// secret back here.
    File { path: PathBuf },
    /// Read-only secrets file (managed-secrets deployment); accounts are
    /// provisioned out of band.
    Secrets { path: PathBuf },
}

/// Connection settings for the shared entry sheet.
#[derive(Clone, Debug)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub worksheet: String,
    /// OAuth bearer token for the values API. Obtaining and refreshing the
    /// token is the host environment's concern.
    pub access_token: String,
}

/// SMTP settings for the submission notification. Absent entirely when
/// `SMTP_HOST` is not set; submissions work the same either way.
#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub receiver: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub allowed_origin: String,
    pub otp_issuer: String,
    pub session_timeout_minutes: i64,
    pub credentials: CredentialBackend,
    pub sheets: SheetsConfig,
    pub email: Option<EmailConfig>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let allowed_origin = std::env::var("ALLOWED_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        // --- Load Gate Settings ---
        let otp_issuer =
            std::env::var("OTP_ISSUER").unwrap_or_else(|_| "DietTrackerApp".to_string());

        let session_timeout_str =
            std::env::var("SESSION_TIMEOUT_MINUTES").unwrap_or_else(|_| "30".to_string());
        let session_timeout_minutes = session_timeout_str.parse::<i64>().map_err(|_| {
            ConfigError::InvalidValue(
                "SESSION_TIMEOUT_MINUTES".to_string(),
                format!("'{}' is not a number of minutes", session_timeout_str),
            )
        })?;

        // --- Select the Credential Backend ---
        let backend_str =
            std::env::var("CREDENTIALS_BACKEND").unwrap_or_else(|_| "file".to_string());
        let credentials = match backend_str.as_str() {
            "file" => CredentialBackend::File {
                path: std::env::var("CREDENTIALS_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./users_app.json")),
            },
            "secrets" => CredentialBackend::Secrets {
                path: std::env::var("SECRETS_PATH")
                    .map(PathBuf::from)
                    .map_err(|_| ConfigError::MissingVar("SECRETS_PATH".to_string()))?,
            },
            other => {
                return Err(ConfigError::InvalidValue(
                    "CREDENTIALS_BACKEND".to_string(),
                    format!("'{}' is not one of 'file', 'secrets'", other),
                ))
            }
        };

        // --- Load Entry Sheet Settings ---
        let sheets = SheetsConfig {
            spreadsheet_id: std::env::var("SHEETS_SPREADSHEET_ID")
                .map_err(|_| ConfigError::MissingVar("SHEETS_SPREADSHEET_ID".to_string()))?,
            worksheet: std::env::var("SHEETS_WORKSHEET")
                .unwrap_or_else(|_| "Entries".to_string()),
            access_token: std::env::var("SHEETS_ACCESS_TOKEN")
                .map_err(|_| ConfigError::MissingVar("SHEETS_ACCESS_TOKEN".to_string()))?,
        };

        // --- Load Notification Settings (as optional) ---
        let email = match std::env::var("SMTP_HOST") {
            Ok(smtp_host) => {
                let smtp_port_str =
                    std::env::var("SMTP_PORT").unwrap_or_else(|_| "465".to_string());
                let smtp_port = smtp_port_str.parse::<u16>().map_err(|_| {
                    ConfigError::InvalidValue(
                        "SMTP_PORT".to_string(),
                        format!("'{}' is not a port number", smtp_port_str),
                    )
                })?;
                Some(EmailConfig {
                    smtp_host,
                    smtp_port,
                    username: std::env::var("EMAIL_USER")
                        .map_err(|_| ConfigError::MissingVar("EMAIL_USER".to_string()))?,
                    password: std::env::var("EMAIL_PASSWORD")
                        .map_err(|_| ConfigError::MissingVar("EMAIL_PASSWORD".to_string()))?,
                    receiver: std::env::var("RECEIVER_EMAIL")
                        .map_err(|_| ConfigError::MissingVar("RECEIVER_EMAIL".to_string()))?,
                })
            }
            Err(_) => None,
        };

        Ok(Self {
            bind_address,
            log_level,
            allowed_origin,
            otp_issuer,
            session_timeout_minutes,
            credentials,
            sheets,
            email,
        })
    }
}
