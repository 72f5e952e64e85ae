pub mod file_credentials;
pub mod secrets_credentials;
pub mod sheets;
pub mod smtp;

pub use file_credentials::FileCredentials;
pub use secrets_credentials::SecretsCredentials;
pub use sheets::SheetsEntryStore;
pub use smtp::SmtpNotifier;
