//! richter-payments - Payment processor integration for richter
//!
//! The server only ever needs one thing from the processor: a payment intent for an
//! amount, whose client secret the browser uses to confirm the card payment.
//!
//! - [`StripePaymentProcessor`]: Stripe's payment-intents API over HTTPS
//! - [`MockPaymentProcessor`]: deterministic fake for development and tests

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

mod stripe;
pub use stripe::StripePaymentProcessor;

/// Payment processor errors
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment provider error: {0}")]
    Provider(String),

    #[error("Payment provider timed out")]
    Timeout,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Configuration for the payment processor
#[derive(Clone)]
pub struct PaymentConfig {
    /// Secret API key; `None` selects the mock processor
    pub secret_key: Option<String>,

    /// ISO currency code for every intent (default: usd)
    pub currency: String,
}

impl PaymentConfig {
    /// Load the payment configuration from environment variables
    pub fn from_env() -> Result<Self, PaymentError> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let currency = std::env::var("PAYMENT_CURRENCY")
            .unwrap_or_else(|_| "usd".to_string())
            .trim()
            .to_lowercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(PaymentError::Config(format!(
                "Invalid PAYMENT_CURRENCY value '{}': expected a 3-letter ISO code",
                currency
            )));
        }

        Ok(Self {
            secret_key,
            currency,
        })
    }

    /// Create a test configuration (for development/testing)
    pub fn test() -> Self {
        Self {
            secret_key: None,
            currency: "usd".into(),
        }
    }
}

/// A created payment intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub id: String,
    /// Secret handed to the client to confirm the payment
    pub client_secret: String,
}

/// Payment processor trait for dependency injection
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Create a card payment intent for `amount_minor` units of `currency` (cents for usd)
    async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
    ) -> Result<PaymentIntent, PaymentError>;
}

/// Build the processor selected by configuration.
pub fn create_processor(
    config: &PaymentConfig,
    timeout: Duration,
) -> Result<Box<dyn PaymentProcessor>, PaymentError> {
    match &config.secret_key {
        Some(key) => Ok(Box::new(StripePaymentProcessor::new(key.clone(), timeout)?)),
        None => {
            tracing::warn!("STRIPE_SECRET_KEY not set, using mock payment processor");
            Ok(Box::new(MockPaymentProcessor))
        }
    }
}

/// Convert a decimal price into minor currency units.
///
/// Rounds to the nearest unit so that e.g. 19.99 becomes 1999 rather than 1998.
pub fn to_minor_units(price: f64) -> Result<i64, PaymentError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(PaymentError::InvalidAmount(format!(
            "price must be a positive number, got {}",
            price
        )));
    }
    let minor = (price * 100.0).round();
    if minor < 1.0 || minor > i64::MAX as f64 {
        return Err(PaymentError::InvalidAmount(format!(
            "price {} is out of range",
            price
        )));
    }
    Ok(minor as i64)
}

/// Mock payment processor for development and testing
pub struct MockPaymentProcessor;

#[async_trait]
impl PaymentProcessor for MockPaymentProcessor {
    async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
    ) -> Result<PaymentIntent, PaymentError> {
        if amount_minor <= 0 {
            return Err(PaymentError::InvalidAmount(amount_minor.to_string()));
        }

        let id = format!("pi_mock_{}", uuid::Uuid::new_v4().simple());
        let client_secret = format!("{}_secret_mock", id);

        tracing::info!(amount_minor, currency, "Mock payment intent created");

        Ok(PaymentIntent { id, client_secret })
    }
}
