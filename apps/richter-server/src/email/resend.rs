//! Resend HTTP API transport.

use async_trait::async_trait;
use resend_rs::{
    types::{CreateEmailBaseOptions, Tag},
    Resend,
};

use super::{EmailContent, EmailError, EmailProvider};

pub struct ResendProvider {
    client: Resend,
}

impl ResendProvider {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Resend::new(api_key),
        }
    }
}

/// Request body for one message, tagged with its flow so the Resend dashboard can
/// tell verification mail from receipts.
fn options(from: &str, to: &str, content: &EmailContent) -> CreateEmailBaseOptions {
    CreateEmailBaseOptions::new(from, [to], content.subject.as_str())
        .with_text(&content.text)
        .with_html(&content.html)
        .with_tag(Tag::new("category", content.kind.as_str()))
}

#[async_trait]
impl EmailProvider for ResendProvider {
    async fn send(&self, from: &str, to: &str, content: &EmailContent) -> Result<(), EmailError> {
        self.client
            .emails
            .send(options(from, to, content))
            .await
            .map_err(|e| {
                EmailError::SendFailed(format!("resend {}: {}", content.kind.as_str(), e))
            })?;
        tracing::debug!(kind = content.kind.as_str(), "Resend accepted email");
        Ok(())
    }
}
