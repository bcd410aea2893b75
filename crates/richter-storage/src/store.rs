//! The Store trait that backends implement.

use crate::types::*;
use crate::StoreError;

/// The storage trait the server depends on.
///
/// Every method is a single logical unit of work; backends must enforce account
/// email uniqueness themselves and report a violation as [`StoreError::AlreadyExists`].
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    // ───────────────────────────────────── Lifecycle ──────────────────────────────────────

    /// Cheap round-trip used by readiness probes.
    async fn ping(&self) -> Result<(), StoreError>;

    // ───────────────────────────────────── Accounts ───────────────────────────────────────

    /// Insert a pending account. Fails with `AlreadyExists` when the email is taken and
    /// with `Conflict` when the verification code collides with another account.
    async fn create_account(&self, params: &CreateAccountParams) -> Result<Account, StoreError>;

    /// Get account by (normalized) email.
    async fn get_account_by_email(&self, email: &str) -> Result<Account, StoreError>;

    /// Get account by ID.
    async fn get_account_by_id(&self, account_id: &AccountId) -> Result<Account, StoreError>;

    /// Get the account holding this verification code.
    async fn get_account_by_code(&self, code: VerificationCode) -> Result<Account, StoreError>;

    /// List all accounts, oldest first.
    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError>;

    /// Set the role of an account. Leaves every other field untouched.
    async fn set_account_role(
        &self,
        account_id: &AccountId,
        role: Role,
    ) -> Result<UpdateOutcome, StoreError>;

    /// Flip `verified` to true. Returns `true` only on the first transition.
    async fn mark_account_verified(&self, account_id: &AccountId) -> Result<bool, StoreError>;

    /// Flip `verified` to true for the account with this email.
    async fn mark_email_verified(&self, email: &str) -> Result<UpdateOutcome, StoreError>;

    /// Delete an account. Returns the number of deleted rows.
    async fn delete_account(&self, account_id: &AccountId) -> Result<u64, StoreError>;

    // ───────────────────────────────────── Menu ───────────────────────────────────────────

    async fn list_menu_items(&self) -> Result<Vec<MenuItem>, StoreError>;

    async fn get_menu_item(&self, item_id: &MenuItemId) -> Result<MenuItem, StoreError>;

    async fn create_menu_item(&self, params: &CreateMenuItemParams)
        -> Result<MenuItem, StoreError>;

    async fn update_menu_item(
        &self,
        item_id: &MenuItemId,
        params: &UpdateMenuItemParams,
    ) -> Result<UpdateOutcome, StoreError>;

    async fn delete_menu_item(&self, item_id: &MenuItemId) -> Result<u64, StoreError>;

    // ───────────────────────────────────── Reviews ────────────────────────────────────────

    async fn list_reviews(&self) -> Result<Vec<Review>, StoreError>;

    async fn create_review(&self, params: &CreateReviewParams) -> Result<Review, StoreError>;

    // ───────────────────────────────────── Carts ──────────────────────────────────────────

    /// List the cart of one email.
    async fn list_cart_items(&self, email: &str) -> Result<Vec<CartItem>, StoreError>;

    async fn create_cart_item(&self, params: &CreateCartItemParams)
        -> Result<CartItem, StoreError>;

    async fn delete_cart_item(&self, item_id: &CartItemId) -> Result<u64, StoreError>;

    /// Delete every cart item whose id is in `item_ids`.
    async fn delete_cart_items(&self, item_ids: &[CartItemId]) -> Result<u64, StoreError>;

    // ───────────────────────────────────── Payments ───────────────────────────────────────

    async fn create_payment(&self, params: &CreatePaymentParams) -> Result<Payment, StoreError>;

    async fn get_payment(&self, payment_id: &PaymentId) -> Result<Payment, StoreError>;

    /// List payments of one email, optionally restricted to a kind.
    async fn list_payments(
        &self,
        email: &str,
        kind: Option<PaymentKind>,
    ) -> Result<Vec<Payment>, StoreError>;

    /// Record whether the cart cleanup that follows a payment is still outstanding.
    async fn set_payment_cleanup_pending(
        &self,
        payment_id: &PaymentId,
        pending: bool,
    ) -> Result<(), StoreError>;

    // ───────────────────────────────────── Statistics ─────────────────────────────────────

    async fn admin_stats(&self) -> Result<AdminStats, StoreError>;

    async fn user_stats(&self, email: &str) -> Result<UserStats, StoreError>;
}
