//! Stripe payment-intents client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{PaymentError, PaymentIntent, PaymentProcessor};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

#[derive(Debug, Deserialize)]
struct StripePaymentIntent {
    id: String,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

/// Stripe payment processor.
pub struct StripePaymentProcessor {
    client: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl StripePaymentProcessor {
    /// Create a new Stripe processor with the given secret key.
    pub fn new(secret_key: String, timeout: Duration) -> Result<Self, PaymentError> {
        Self::with_base_url(secret_key, timeout, STRIPE_API_BASE.to_string())
    }

    /// Point the processor at a different API host (stripe-mock, proxies).
    pub fn with_base_url(
        secret_key: String,
        timeout: Duration,
        base_url: String,
    ) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("richter-server/0.1")
            .build()
            .map_err(|e| PaymentError::Config(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            client,
            secret_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PaymentProcessor for StripePaymentProcessor {
    async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
    ) -> Result<PaymentIntent, PaymentError> {
        let amount = amount_minor.to_string();
        let form = [
            ("amount", amount.as_str()),
            ("currency", currency),
            ("payment_method_types[]", "card"),
        ];

        let resp = self
            .client
            .post(format!("{}/payment_intents", self.base_url))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PaymentError::Timeout
                } else {
                    PaymentError::Provider(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<StripeErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(PaymentError::Provider(format!(
                "Stripe returned {}: {}",
                status, message
            )));
        }

        let intent: StripePaymentIntent = resp
            .json()
            .await
            .map_err(|e| PaymentError::Provider(format!("Invalid Stripe response: {}", e)))?;

        let client_secret = intent.client_secret.ok_or_else(|| {
            PaymentError::Provider("Stripe response missing client_secret".to_string())
        })?;

        Ok(PaymentIntent {
            id: intent.id,
            client_secret,
        })
    }
}
