//! Remote identity provider: mirrors email verification and account deletion.
//!
//! The HTTP implementation speaks the Identity Toolkit REST dialect
//! (`accounts:lookup`, `accounts:update`, `accounts:delete`) with a bearer token.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use url::Url;

use crate::config::IdentityConfig;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity provider request failed: {0}")]
    Request(String),

    #[error("identity provider returned {0}")]
    Status(u16),

    #[error("no remote user for {0}")]
    UnknownUser(String),

    #[error("identity provider timed out")]
    Timeout,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Mark the remote record `uid` as having a verified email.
    async fn mark_email_verified(&self, uid: &str) -> Result<(), IdentityError>;

    /// Delete the remote record registered under `email`.
    async fn delete_user_by_email(&self, email: &str) -> Result<(), IdentityError>;
}

pub struct IdentityToolkitProvider {
    client: reqwest::Client,
    base_url: Url,
    token: String,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<RemoteUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteUser {
    local_id: String,
}

impl IdentityToolkitProvider {
    pub fn new(config: &IdentityConfig, timeout: Duration) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            token: config.token.clone(),
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/accounts:{}",
            self.base_url.as_str().trim_end_matches('/'),
            method
        )
    }

    async fn call(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, IdentityError> {
        let resp = self
            .client
            .post(self.endpoint(method))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    IdentityError::Timeout
                } else {
                    IdentityError::Request(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            return Err(IdentityError::Status(resp.status().as_u16()));
        }
        Ok(resp)
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitProvider {
    async fn mark_email_verified(&self, uid: &str) -> Result<(), IdentityError> {
        self.call("update", json!({ "localId": uid, "emailVerified": true }))
            .await?;
        Ok(())
    }

    async fn delete_user_by_email(&self, email: &str) -> Result<(), IdentityError> {
        let lookup: LookupResponse = self
            .call("lookup", json!({ "email": [email] }))
            .await?
            .json()
            .await
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        let user = lookup
            .users
            .into_iter()
            .next()
            .ok_or_else(|| IdentityError::UnknownUser(email.to_string()))?;

        self.call("delete", json!({ "localId": user.local_id }))
            .await?;
        Ok(())
    }
}
