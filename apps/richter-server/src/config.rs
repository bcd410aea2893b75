//! Server configuration.
//!
//! Everything except the database location and listen address comes from the
//! environment:
//!
//! ```bash
//! # Session tokens
//! ACCESS_TOKEN_SECRET=...            # required
//! ACCESS_TOKEN_TTL_SECS=3600          # at most 30 days
//!
//! # Links and outbound calls
//! RICHTER_PUBLIC_URL=https://api.richter.example
//! RICHTER_OUTBOUND_TIMEOUT_SECS=10
//!
//! # Provider: Resend
//! RICHTER_EMAIL_PROVIDER=resend
//! RESEND_API_KEY=re_...
//!
//! # Provider: SMTP
//! RICHTER_EMAIL_PROVIDER=smtp
//! SMTP_HOST=smtp.gmail.com
//! SMTP_PORT=587
//! SMTP_USERNAME=user@example.com
//! SMTP_PASSWORD=app_password
//! SMTP_USE_TLS=true
//!
//! # Sender config
//! RICHTER_EMAIL_FROM=noreply@richter.example
//! RICHTER_EMAIL_FROM_NAME="Richter Restaurant"
//!
//! # Identity provider mirroring (both or neither)
//! IDENTITY_PROVIDER_URL=https://identitytoolkit.googleapis.com/v1/projects/richter
//! IDENTITY_PROVIDER_TOKEN=...
//!
//! # Payments
//! STRIPE_SECRET_KEY=sk_live_...      # absent: mock processor
//! PAYMENT_CURRENCY=usd
//! ```

use std::env;
use std::time::Duration;

use richter_payments::PaymentConfig;
use thiserror::Error;
use url::Url;

const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;
const MAX_TOKEN_TTL_SECS: u64 = 30 * 24 * 3600;
const DEFAULT_PUBLIC_URL: &str = "http://localhost:5000";
const DEFAULT_OUTBOUND_TIMEOUT_SECS: u64 = 10;

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    pub token: TokenConfig,
    /// Base URL embedded in verification links
    pub public_url: Url,
    /// Upper bound for every email, identity-provider and payment call
    pub outbound_timeout: Duration,
    pub email: Option<EmailConfig>,
    pub identity: Option<IdentityConfig>,
    pub payments: PaymentConfig,
}

/// Session token signing configuration
#[derive(Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub ttl: Duration,
}

/// Email configuration for verification and receipts
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// Email provider configuration
    pub provider: EmailProviderConfig,
    /// From email address
    pub from_address: String,
    /// Optional from name
    pub from_name: Option<String>,
}

/// Email provider configuration
#[derive(Debug, Clone)]
pub enum EmailProviderConfig {
    /// Resend email provider
    Resend {
        /// Resend API key
        #[allow(dead_code)] // Used when email-resend feature is enabled
        api_key: String,
    },
    /// SMTP email provider
    Smtp {
        host: String,
        port: u16,
        username: Option<String>,
        password: Option<String>,
        use_tls: bool,
    },
}

/// Remote identity provider the verification state is mirrored to
#[derive(Clone)]
pub struct IdentityConfig {
    pub base_url: Url,
    pub token: String,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("Invalid email provider: {0}. Expected 'resend' or 'smtp'")]
    InvalidProvider(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),

    #[error("Missing from address: RICHTER_EMAIL_FROM is required when email is configured")]
    MissingFromAddress,

    #[error("SMTP provider requires SMTP_HOST")]
    SmtpMissingHost,

    #[error("IDENTITY_PROVIDER_URL and IDENTITY_PROVIDER_TOKEN must be set together")]
    IncompleteIdentityProvider,

    #[error("Payment configuration: {0}")]
    Payment(String),
}

/// Read a variable, treating empty and whitespace-only values as unset.
fn var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn flag(name: &str, default: bool) -> bool {
    var(name)
        .map(|v| v.to_lowercase() == "true" || v == "1")
        .unwrap_or(default)
}

/// Whole seconds in `1..=max`.
fn secs(name: &'static str, default: u64, max: u64) -> Result<Duration, ConfigError> {
    match var(name) {
        None => Ok(Duration::from_secs(default)),
        Some(v) => v
            .parse::<u64>()
            .ok()
            .filter(|n| (1..=max).contains(n))
            .map(Duration::from_secs)
            .ok_or(ConfigError::InvalidValue { name, value: v }),
    }
}

fn url(name: &'static str, value: String) -> Result<Url, ConfigError> {
    Url::parse(&value).map_err(|_| ConfigError::InvalidValue { name, value })
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let secret = var("ACCESS_TOKEN_SECRET")
            .ok_or_else(|| ConfigError::MissingEnvVar("ACCESS_TOKEN_SECRET".to_string()))?;
        let token = TokenConfig {
            secret,
            ttl: secs(
                "ACCESS_TOKEN_TTL_SECS",
                DEFAULT_TOKEN_TTL_SECS,
                MAX_TOKEN_TTL_SECS,
            )?,
        };

        let public_url = url(
            "RICHTER_PUBLIC_URL",
            var("RICHTER_PUBLIC_URL").unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_string()),
        )?;
        let outbound_timeout = secs(
            "RICHTER_OUTBOUND_TIMEOUT_SECS",
            DEFAULT_OUTBOUND_TIMEOUT_SECS,
            u64::from(u32::MAX),
        )?;

        let identity = match (var("IDENTITY_PROVIDER_URL"), var("IDENTITY_PROVIDER_TOKEN")) {
            (Some(base_url), Some(token)) => Some(IdentityConfig {
                base_url: url("IDENTITY_PROVIDER_URL", base_url)?,
                token,
            }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteIdentityProvider),
        };

        let payments =
            PaymentConfig::from_env().map_err(|e| ConfigError::Payment(e.to_string()))?;

        Ok(Self {
            token,
            public_url,
            outbound_timeout,
            email: Self::email_from_env()?,
            identity,
            payments,
        })
    }

    fn email_from_env() -> Result<Option<EmailConfig>, ConfigError> {
        // No provider configured: email is disabled
        let Some(provider_type) = var("RICHTER_EMAIL_PROVIDER") else {
            return Ok(None);
        };

        let provider = match provider_type.to_lowercase().as_str() {
            "resend" => {
                let api_key = var("RESEND_API_KEY")
                    .ok_or_else(|| ConfigError::MissingEnvVar("RESEND_API_KEY".to_string()))?;
                EmailProviderConfig::Resend { api_key }
            }
            "smtp" => {
                let host = var("SMTP_HOST").ok_or(ConfigError::SmtpMissingHost)?;
                let port = match var("SMTP_PORT") {
                    None => 587,
                    Some(p) => p.parse::<u16>().map_err(|_| ConfigError::InvalidPort(p))?,
                };
                EmailProviderConfig::Smtp {
                    host,
                    port,
                    username: var("SMTP_USERNAME"),
                    password: var("SMTP_PASSWORD"),
                    use_tls: flag("SMTP_USE_TLS", true), // TLS by default
                }
            }
            other => return Err(ConfigError::InvalidProvider(other.to_string())),
        };

        let from_address = var("RICHTER_EMAIL_FROM").ok_or(ConfigError::MissingFromAddress)?;
        let from_name = var("RICHTER_EMAIL_FROM_NAME");

        Ok(Some(EmailConfig {
            provider,
            from_address,
            from_name,
        }))
    }
}
