//! SMTP transport (lettre).

use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
        AsyncSmtpTransportBuilder,
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use super::{EmailContent, EmailError, EmailProvider};

/// How the connection to the relay is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Security {
    /// TLS from the first byte (SMTPS, port 465).
    Implicit,
    StartTls,
    /// Local relays and test servers only.
    Plain,
}

impl Security {
    fn choose(use_tls: bool, port: u16) -> Self {
        match (use_tls, port) {
            (false, _) => Security::Plain,
            (true, 465) => Security::Implicit,
            (true, _) => Security::StartTls,
        }
    }
}

pub struct SmtpProvider {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpProvider {
    pub fn new(
        host: &str,
        port: u16,
        username: Option<String>,
        password: Option<String>,
        use_tls: bool,
    ) -> Result<Self, EmailError> {
        let credentials = match (username, password) {
            (Some(user), Some(pass)) => Some(Credentials::new(user, pass)),
            (None, None) => None,
            _ => {
                return Err(EmailError::InvalidConfig(
                    "SMTP_USERNAME and SMTP_PASSWORD must be set together".into(),
                ))
            }
        };

        let mut builder = relay(host, Security::choose(use_tls, port))?.port(port);
        if let Some(credentials) = credentials {
            builder = builder.credentials(credentials);
        }

        Ok(Self {
            transport: builder.build(),
        })
    }
}

fn relay(
    host: &str,
    security: Security,
) -> Result<AsyncSmtpTransportBuilder, EmailError> {
    let relay_error = |e: lettre::transport::smtp::Error| {
        EmailError::InvalidConfig(format!("SMTP relay {}: {}", host, e))
    };
    let tls = || {
        TlsParameters::new(host.to_string())
            .map_err(|e| EmailError::InvalidConfig(format!("TLS for {}: {}", host, e)))
    };

    Ok(match security {
        Security::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(relay_error)?
            .tls(Tls::Wrapper(tls()?)),
        Security::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(relay_error)?
            .tls(Tls::Required(tls()?)),
        Security::Plain => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host),
    })
}

/// Build the multipart/alternative message for `content`.
fn compose(from: &str, to: &str, content: &EmailContent) -> Result<Message, EmailError> {
    let from: Mailbox = from
        .parse()
        .map_err(|e| EmailError::InvalidConfig(format!("sender {:?}: {}", from, e)))?;
    let to: Mailbox = to
        .parse()
        .map_err(|e| EmailError::InvalidRecipient(format!("{}: {}", to, e)))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(content.subject.as_str())
        .multipart(MultiPart::alternative_plain_html(
            content.text.clone(),
            content.html.clone(),
        ))
        .map_err(|e| EmailError::SendFailed(format!("{} email: {}", content.kind.as_str(), e)))
}

#[async_trait]
impl EmailProvider for SmtpProvider {
    async fn send(&self, from: &str, to: &str, content: &EmailContent) -> Result<(), EmailError> {
        let message = compose(from, to, content)?;
        match self.transport.send(message).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_timeout() => Err(EmailError::Timeout),
            Err(e) => Err(EmailError::SendFailed(e.to_string())),
        }
    }
}
