//! services/api/src/adapters/smtp.rs
//!
//! The outbound notification adapter over an async SMTP transport. The
//! submit handler fires it after a successful append and swallows any
//! failure; nothing here may block or fail a submission.

use async_trait::async_trait;
use diet_tracker_core::ports::{Notifier, PortError, PortResult};
use lettre::{
    message::header::ContentType,
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A notifier that emails a fixed receiver through one SMTP account.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: String,
    receiver: String,
}

impl SmtpNotifier {
    /// Creates a new `SmtpNotifier`.
    pub fn new(
        host: &str,
        port: u16,
        username: String,
        password: String,
        receiver: String,
    ) -> Result<Self, PortError> {
        let tls_params = TlsParameters::new(host.to_string())
            .map_err(|e| PortError::Unavailable(format!("TLS configuration error: {}", e)))?;

        // Port 465 uses implicit TLS (SMTPS), other ports use STARTTLS
        let builder = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|e| PortError::Unavailable(format!("SMTP relay error: {}", e)))?
                .port(port)
                .tls(Tls::Wrapper(tls_params))
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| PortError::Unavailable(format!("SMTP relay error: {}", e)))?
                .port(port)
                .tls(Tls::Required(tls_params))
        };

        let sender = username.clone();
        let transport = builder
            .credentials(Credentials::new(username, password))
            .build();

        Ok(Self {
            transport,
            sender,
            receiver,
        })
    }
}

//=========================================================================================
// `Notifier` Trait Implementation
//=========================================================================================

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, subject: &str, body: &str) -> PortResult<()> {
        let message = Message::builder()
            .from(self.sender.parse().map_err(|e| {
                PortError::Malformed(format!("invalid sender address: {}", e))
            })?)
            .to(self.receiver.parse().map_err(|e| {
                PortError::Malformed(format!("invalid receiver address: {}", e))
            })?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| PortError::Malformed(format!("failed to build email: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| PortError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builds_an_implicit_tls_transport_on_465() {
        let notifier = SmtpNotifier::new(
            "smtp.gmail.com",
            465,
            "sender@example.com".to_string(),
            "app_password".to_string(),
            "doctor@example.com".to_string(),
        );
        assert!(notifier.is_ok());
    }

    #[tokio::test]
    async fn builds_a_starttls_transport_elsewhere() {
        let notifier = SmtpNotifier::new(
            "localhost",
            587,
            "sender@example.com".to_string(),
            "app_password".to_string(),
            "doctor@example.com".to_string(),
        );
        assert!(notifier.is_ok());
    }
}
