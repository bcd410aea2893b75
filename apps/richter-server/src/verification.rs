//! Account registration and email verification workflow.
//!
//! Accounts move one way, `Pending` (`verified = false`) to `Verified`, and only through
//! a matching code redemption. The store's unique index on email is the authority on
//! duplicates; the lookup done first only spares a pointless insert.

use std::sync::Arc;
use std::time::Duration;

use richter_storage::{
    Account, AccountId, CreateAccountParams, Store, StoreError, VerificationCode,
};
use subtle::ConstantTimeEq;
use thiserror::Error;
use url::Url;

use crate::email::{generate_verification_code, EmailContent, Mailer};
use crate::identity::{IdentityError, IdentityProvider};

/// Fresh codes drawn before giving up on a collision streak.
const CODE_ATTEMPTS: usize = 5;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{0}")]
    InvalidEmail(String),

    #[error("could not allocate a unique verification code")]
    CodeSpaceExhausted,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// New-account data as submitted by the client. Unauthenticated until redeemed.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub email: String,
    pub name: Option<String>,
    pub photo_url: Option<String>,
    pub external_ref: Option<String>,
}

/// What happened to the verification email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Sent,
    Failed(String),
    Disabled,
}

#[derive(Debug)]
pub enum Registered {
    Created {
        account: Account,
        notification: Notification,
    },
    /// The identity was already taken; nothing was written.
    AlreadyExists(Account),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resent {
    Sent,
    NotFound,
    AlreadyVerified,
    Disabled,
    Failed(String),
}

#[derive(Debug)]
pub enum Redeemed {
    Verified(Account),
    NotFound,
}

/// Trim and lowercase an email, rejecting values that cannot be one.
pub fn normalize_email(raw: &str) -> Result<String, WorkflowError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(WorkflowError::InvalidEmail("email is required".into()));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(WorkflowError::InvalidEmail(format!(
            "invalid email address: {}",
            email
        ))),
    }
}

pub struct VerificationService {
    store: Arc<dyn Store>,
    mailer: Option<Arc<Mailer>>,
    identity: Option<Arc<dyn IdentityProvider>>,
    public_url: Url,
    timeout: Duration,
}

impl VerificationService {
    pub fn new(
        store: Arc<dyn Store>,
        mailer: Option<Arc<Mailer>>,
        identity: Option<Arc<dyn IdentityProvider>>,
        public_url: Url,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            mailer,
            identity,
            public_url,
            timeout,
        }
    }

    /// `{public_url}/verify/{code}?uid={external_ref}`
    pub fn verification_link(&self, code: VerificationCode, external_ref: Option<&str>) -> String {
        let mut url = self.public_url.clone();
        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{}/verify/{}", base, code));
        url.set_query(None);
        if let Some(uid) = external_ref {
            url.query_pairs_mut().append_pair("uid", uid);
        }
        url.to_string()
    }

    // ───────────────────────────────────── Register ───────────────────────────────────────

    pub async fn register(&self, registration: Registration) -> Result<Registered, WorkflowError> {
        let email = normalize_email(&registration.email)?;

        match self.store.get_account_by_email(&email).await {
            Ok(existing) => return Ok(Registered::AlreadyExists(existing)),
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let mut params = CreateAccountParams {
            email: email.clone(),
            name: registration.name,
            photo_url: registration.photo_url,
            external_ref: registration.external_ref,
            verification_code: generate_verification_code(),
        };

        let mut created = None;
        for attempt in 1..=CODE_ATTEMPTS {
            match self.store.create_account(&params).await {
                Ok(account) => {
                    created = Some(account);
                    break;
                }
                // Lost a race with a concurrent registration of the same email.
                Err(StoreError::AlreadyExists) => {
                    let existing = self.store.get_account_by_email(&email).await?;
                    return Ok(Registered::AlreadyExists(existing));
                }
                Err(StoreError::Conflict) => {
                    tracing::debug!(attempt, "Verification code collision, drawing another");
                    params.verification_code = generate_verification_code();
                }
                Err(e) => return Err(e.into()),
            }
        }
        let account = created.ok_or(WorkflowError::CodeSpaceExhausted)?;

        tracing::info!(account_id = %account.id, email = %account.email, "Account registered");

        let notification = self.notify(&account).await;
        if let Notification::Failed(reason) = &notification {
            tracing::warn!(
                email = %account.email,
                error = %reason,
                "Verification email failed; account kept pending"
            );
        }

        Ok(Registered::Created {
            account,
            notification,
        })
    }

    async fn notify(&self, account: &Account) -> Notification {
        let Some(mailer) = &self.mailer else {
            return Notification::Disabled;
        };

        let link =
            self.verification_link(account.verification_code, account.external_ref.as_deref());
        match mailer
            .send(&account.email, &EmailContent::verification(&link))
            .await
        {
            Ok(()) => Notification::Sent,
            Err(e) => Notification::Failed(e.to_string()),
        }
    }

    // ───────────────────────────────────── Resend ─────────────────────────────────────────

    /// Re-send the link for a pending account with its stored code.
    pub async fn resend(&self, email: &str) -> Result<Resent, WorkflowError> {
        let email = normalize_email(email)?;
        let account = match self.store.get_account_by_email(&email).await {
            Ok(account) => account,
            Err(StoreError::NotFound) => return Ok(Resent::NotFound),
            Err(e) => return Err(e.into()),
        };

        if account.verified {
            return Ok(Resent::AlreadyVerified);
        }

        Ok(match self.notify(&account).await {
            Notification::Sent => Resent::Sent,
            Notification::Disabled => Resent::Disabled,
            Notification::Failed(reason) => {
                tracing::warn!(email = %account.email, error = %reason, "Resend failed");
                Resent::Failed(reason)
            }
        })
    }

    // ───────────────────────────────────── Redeem ─────────────────────────────────────────

    /// Redeem a code. Redeeming an already verified account's code again succeeds
    /// without side effects.
    pub async fn redeem(
        &self,
        code: VerificationCode,
        external_ref: Option<&str>,
    ) -> Result<Redeemed, WorkflowError> {
        let mut account = match self.store.get_account_by_code(code).await {
            Ok(account) => account,
            Err(StoreError::NotFound) => return Ok(Redeemed::NotFound),
            Err(e) => return Err(e.into()),
        };

        let stored = account.verification_code.value();
        if !bool::from(stored.ct_eq(&code.value())) {
            return Ok(Redeemed::NotFound);
        }

        let first_transition = self.store.mark_account_verified(&account.id).await?;
        account.verified = true;

        if first_transition {
            tracing::info!(account_id = %account.id, email = %account.email, "Account verified");
            let uid = external_ref.or(account.external_ref.as_deref());
            if let Some(uid) = uid {
                self.mirror_verified(uid).await;
            }
        }

        Ok(Redeemed::Verified(account))
    }

    async fn mirror_verified(&self, uid: &str) {
        let Some(identity) = &self.identity else {
            return;
        };
        let result = tokio::time::timeout(self.timeout, identity.mark_email_verified(uid))
            .await
            .unwrap_or(Err(IdentityError::Timeout));
        if let Err(e) = result {
            tracing::warn!(uid, error = %e, "Could not mirror verification to identity provider");
        }
    }

    // ───────────────────────────────────── Queries ────────────────────────────────────────

    pub async fn check_valid(&self, email: &str) -> Result<Option<Account>, WorkflowError> {
        let email = normalize_email(email)?;
        match self.store.get_account_by_email(&email).await {
            Ok(account) => Ok(Some(account)),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // ───────────────────────────────────── Delete ─────────────────────────────────────────

    /// Delete an account, removing the remote identity record first.
    ///
    /// The remote record is looked up by `email_hint` or else the stored email. A remote
    /// failure leaves an orphaned remote record and does not block the local delete.
    pub async fn delete_account(
        &self,
        account_id: &AccountId,
        email_hint: Option<&str>,
    ) -> Result<u64, WorkflowError> {
        let email = match email_hint {
            Some(hint) => Some(normalize_email(hint)?),
            None => match self.store.get_account_by_id(account_id).await {
                Ok(account) => Some(account.email),
                Err(StoreError::NotFound) => None,
                Err(e) => return Err(e.into()),
            },
        };

        if let (Some(identity), Some(email)) = (&self.identity, email.as_deref()) {
            let result = tokio::time::timeout(self.timeout, identity.delete_user_by_email(email))
                .await
                .unwrap_or(Err(IdentityError::Timeout));
            if let Err(e) = result {
                tracing::warn!(email, error = %e, "Remote identity deletion failed; continuing");
            }
        }

        let deleted = self.store.delete_account(account_id).await?;
        tracing::info!(account_id = %account_id, deleted, "Account deleted");
        Ok(deleted)
    }
}
