//! Outbound email: verification links and payment receipts.

mod code;
#[cfg(feature = "email-resend")]
mod resend;
#[cfg(feature = "email-smtp")]
mod smtp;
pub mod templates;

pub use code::generate_verification_code;
pub use templates::EmailContent;

use std::sync::Arc;
use std::time::Duration;

use crate::config::{EmailConfig, EmailProviderConfig};
use async_trait::async_trait;
use thiserror::Error;

/// Email sending error
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[allow(dead_code)] // Constructed when a provider feature is compiled out
    #[error("Provider not available: {0}")]
    ProviderNotAvailable(String),

    #[error("Email provider timed out")]
    Timeout,
}

/// A transport that delivers one rendered message. `from` is a formatted mailbox.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(&self, from: &str, to: &str, content: &EmailContent) -> Result<(), EmailError>;
}

/// `Name <address>`, or the bare address.
pub fn mailbox(address: &str, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("{} <{}>", name, address),
        None => address.to_string(),
    }
}

/// Create an email provider from configuration
pub fn create_provider(config: &EmailConfig) -> Result<Box<dyn EmailProvider>, EmailError> {
    match &config.provider {
        #[cfg(feature = "email-resend")]
        EmailProviderConfig::Resend { api_key } => {
            Ok(Box::new(resend::ResendProvider::new(api_key)))
        }
        #[cfg(not(feature = "email-resend"))]
        EmailProviderConfig::Resend { .. } => Err(EmailError::ProviderNotAvailable(
            "Resend support not compiled in. Enable the 'email-resend' feature.".to_string(),
        )),
        #[cfg(feature = "email-smtp")]
        EmailProviderConfig::Smtp {
            host,
            port,
            username,
            password,
            use_tls,
        } => {
            let provider = smtp::SmtpProvider::new(
                host,
                *port,
                username.clone(),
                password.clone(),
                *use_tls,
            )?;
            Ok(Box::new(provider))
        }
        #[cfg(not(feature = "email-smtp"))]
        EmailProviderConfig::Smtp { .. } => Err(EmailError::ProviderNotAvailable(
            "SMTP support not compiled in. Enable the 'email-smtp' feature.".to_string(),
        )),
    }
}

/// A provider bound to a sender identity and an outbound deadline.
pub struct Mailer {
    provider: Arc<dyn EmailProvider>,
    from: String,
    timeout: Duration,
}

impl Mailer {
    pub fn new(
        provider: Arc<dyn EmailProvider>,
        from_address: String,
        from_name: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            from: mailbox(&from_address, from_name.as_deref()),
            timeout,
        }
    }

    pub fn from_config(config: &EmailConfig, timeout: Duration) -> Result<Self, EmailError> {
        let provider: Arc<dyn EmailProvider> = Arc::from(create_provider(config)?);
        Ok(Self::new(
            provider,
            config.from_address.clone(),
            config.from_name.clone(),
            timeout,
        ))
    }

    pub async fn send(&self, to: &str, content: &EmailContent) -> Result<(), EmailError> {
        let send = self.provider.send(&self.from, to, content);
        let result = match tokio::time::timeout(self.timeout, send).await {
            Ok(result) => result,
            Err(_) => Err(EmailError::Timeout),
        };
        if result.is_ok() {
            tracing::debug!(to, kind = content.kind.as_str(), "Email sent");
        }
        result
    }
}
