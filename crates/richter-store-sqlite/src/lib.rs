use std::time::Duration;

use chrono::{DateTime, Utc};
use richter_storage::*;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use uuid::Uuid;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::open("sqlite::memory:").await
    }

    pub async fn open(url: &str) -> Result<Self, StoreError> {
        Self::open_with(url, 1, Duration::from_secs(10)).await
    }

    /// Open a pool with an explicit size and a bound on how long a request may wait for
    /// a connection.
    pub async fn open_with(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, StoreError> {
        // Every connection to `sqlite::memory:` is its own database.
        let max_connections = if url.contains(":memory:") {
            1
        } else {
            max_connections.max(1)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(backend)?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { pool })
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Map a write error, distinguishing a duplicate account email from other constraint hits.
fn write_error(e: sqlx::Error) -> StoreError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            return if db.message().contains("accounts.email") {
                StoreError::AlreadyExists
            } else {
                StoreError::Conflict
            };
        }
    }
    backend(e)
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn ts(millis: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StoreError::Backend(format!("invalid timestamp: {}", millis)))
}

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    Uuid::try_parse(s).map_err(|e| StoreError::Backend(e.to_string()))
}

// ───────────────────────────────────── Rows ─────────────────────────────────────

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: String,
    email: String,
    name: Option<String>,
    photo_url: Option<String>,
    role: String,
    verified: bool,
    verification_code: i64,
    external_ref: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let verification_code = u32::try_from(row.verification_code)
            .ok()
            .and_then(VerificationCode::new)
            .ok_or_else(|| StoreError::Backend("corrupt verification code".into()))?;
        Ok(Account {
            id: AccountId(parse_uuid(&row.id)?),
            email: row.email,
            name: row.name,
            photo_url: row.photo_url,
            role: row.role.parse().map_err(StoreError::Backend)?,
            verified: row.verified,
            verification_code,
            external_ref: row.external_ref,
            created_at: ts(row.created_at)?,
            updated_at: ts(row.updated_at)?,
        })
    }
}

const ACCOUNT_COLUMNS: &str = "id, email, name, photo_url, role, verified, verification_code, \
                               external_ref, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct MenuItemRow {
    id: String,
    name: String,
    category: String,
    price: f64,
    recipe: Option<String>,
    image: Option<String>,
    created_at: i64,
}

impl TryFrom<MenuItemRow> for MenuItem {
    type Error = StoreError;

    fn try_from(row: MenuItemRow) -> Result<Self, Self::Error> {
        Ok(MenuItem {
            id: MenuItemId(parse_uuid(&row.id)?),
            name: row.name,
            category: row.category,
            price: row.price,
            recipe: row.recipe,
            image: row.image,
            created_at: ts(row.created_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: String,
    name: String,
    email: String,
    details: String,
    rating: f64,
    created_at: i64,
}

impl TryFrom<ReviewRow> for Review {
    type Error = StoreError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        Ok(Review {
            id: ReviewId(parse_uuid(&row.id)?),
            name: row.name,
            email: row.email,
            details: row.details,
            rating: row.rating,
            created_at: ts(row.created_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CartItemRow {
    id: String,
    email: String,
    menu_id: String,
    name: String,
    image: Option<String>,
    price: f64,
    created_at: i64,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = StoreError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        Ok(CartItem {
            id: CartItemId(parse_uuid(&row.id)?),
            email: row.email,
            menu_id: row.menu_id,
            name: row.name,
            image: row.image,
            price: row.price,
            created_at: ts(row.created_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: String,
    email: String,
    price: f64,
    transaction_id: String,
    date: i64,
    cart_ids: String,
    menu_item_ids: String,
    status: String,
    kind: String,
    cart_cleanup_pending: bool,
    created_at: i64,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = StoreError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let cart_ids: Vec<CartItemId> = serde_json::from_str(&row.cart_ids)
            .map_err(|e| StoreError::Backend(format!("corrupt cart_ids: {}", e)))?;
        let menu_item_ids: Vec<String> = serde_json::from_str(&row.menu_item_ids)
            .map_err(|e| StoreError::Backend(format!("corrupt menu_item_ids: {}", e)))?;
        Ok(Payment {
            id: PaymentId(parse_uuid(&row.id)?),
            email: row.email,
            price: row.price,
            transaction_id: row.transaction_id,
            date: ts(row.date)?,
            cart_ids,
            menu_item_ids,
            status: row.status,
            kind: row.kind.parse().map_err(StoreError::Backend)?,
            cart_cleanup_pending: row.cart_cleanup_pending,
            created_at: ts(row.created_at)?,
        })
    }
}

const PAYMENT_COLUMNS: &str = "id, email, price, transaction_id, date, cart_ids, menu_item_ids, \
                               status, kind, cart_cleanup_pending, created_at";

fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

#[async_trait::async_trait]
impl Store for SqliteStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    // ───────────────────────────── Accounts ─────────────────────────────

    async fn create_account(&self, params: &CreateAccountParams) -> Result<Account, StoreError> {
        let id = AccountId::generate();
        let now = now_millis();

        sqlx::query(
            "INSERT INTO accounts(id, email, name, photo_url, role, verified, verification_code,
                                  external_ref, created_at, updated_at)
             VALUES(?, ?, ?, ?, ?, 0, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&params.email)
        .bind(&params.name)
        .bind(&params.photo_url)
        .bind(Role::Standard.as_str())
        .bind(params.verification_code.value() as i64)
        .bind(&params.external_ref)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        self.get_account_by_id(&id).await
    }

    async fn get_account_by_email(&self, email: &str) -> Result<Account, StoreError> {
        let sql = format!("SELECT {} FROM accounts WHERE email = ?", ACCOUNT_COLUMNS);
        sqlx::query_as::<_, AccountRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(StoreError::NotFound)?
            .try_into()
    }

    async fn get_account_by_id(&self, account_id: &AccountId) -> Result<Account, StoreError> {
        let sql = format!("SELECT {} FROM accounts WHERE id = ?", ACCOUNT_COLUMNS);
        sqlx::query_as::<_, AccountRow>(&sql)
            .bind(account_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(StoreError::NotFound)?
            .try_into()
    }

    async fn get_account_by_code(&self, code: VerificationCode) -> Result<Account, StoreError> {
        let sql = format!(
            "SELECT {} FROM accounts WHERE verification_code = ?",
            ACCOUNT_COLUMNS
        );
        sqlx::query_as::<_, AccountRow>(&sql)
            .bind(code.value() as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(StoreError::NotFound)?
            .try_into()
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let sql = format!(
            "SELECT {} FROM accounts ORDER BY created_at, id",
            ACCOUNT_COLUMNS
        );
        let rows = sqlx::query_as::<_, AccountRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        collect(rows)
    }

    async fn set_account_role(
        &self,
        account_id: &AccountId,
        role: Role,
    ) -> Result<UpdateOutcome, StoreError> {
        let modified = sqlx::query("UPDATE accounts SET role = ?, updated_at = ? WHERE id = ? AND role <> ?")
            .bind(role.as_str())
            .bind(now_millis())
            .bind(account_id.to_string())
            .bind(role.as_str())
            .execute(&self.pool)
            .await
            .map_err(backend)?
            .rows_affected();

        let matched = if modified > 0 {
            modified
        } else {
            self.count_where("accounts", "id", &account_id.to_string())
                .await?
        };

        Ok(UpdateOutcome { matched, modified })
    }

    async fn mark_account_verified(&self, account_id: &AccountId) -> Result<bool, StoreError> {
        let result =
            sqlx::query("UPDATE accounts SET verified = 1, updated_at = ? WHERE id = ? AND verified = 0")
                .bind(now_millis())
                .bind(account_id.to_string())
                .execute(&self.pool)
                .await
                .map_err(backend)?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_email_verified(&self, email: &str) -> Result<UpdateOutcome, StoreError> {
        let modified = sqlx::query(
            "UPDATE accounts SET verified = 1, updated_at = ? WHERE email = ? AND verified = 0",
        )
        .bind(now_millis())
        .bind(email)
        .execute(&self.pool)
        .await
        .map_err(backend)?
        .rows_affected();

        let matched = if modified > 0 {
            modified
        } else {
            self.count_where("accounts", "email", email).await?
        };

        Ok(UpdateOutcome { matched, modified })
    }

    async fn delete_account(&self, account_id: &AccountId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(account_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected())
    }

    // ───────────────────────────── Menu ─────────────────────────────

    async fn list_menu_items(&self) -> Result<Vec<MenuItem>, StoreError> {
        let rows = sqlx::query_as::<_, MenuItemRow>(
            "SELECT id, name, category, price, recipe, image, created_at
             FROM menu_items ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        collect(rows)
    }

    async fn get_menu_item(&self, item_id: &MenuItemId) -> Result<MenuItem, StoreError> {
        sqlx::query_as::<_, MenuItemRow>(
            "SELECT id, name, category, price, recipe, image, created_at
             FROM menu_items WHERE id = ?",
        )
        .bind(item_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .ok_or(StoreError::NotFound)?
        .try_into()
    }

    async fn create_menu_item(
        &self,
        params: &CreateMenuItemParams,
    ) -> Result<MenuItem, StoreError> {
        let id = MenuItemId::generate();
        sqlx::query(
            "INSERT INTO menu_items(id, name, category, price, recipe, image, created_at)
             VALUES(?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&params.name)
        .bind(&params.category)
        .bind(params.price)
        .bind(&params.recipe)
        .bind(&params.image)
        .bind(now_millis())
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        self.get_menu_item(&id).await
    }

    async fn update_menu_item(
        &self,
        item_id: &MenuItemId,
        params: &UpdateMenuItemParams,
    ) -> Result<UpdateOutcome, StoreError> {
        let matched = self
            .count_where("menu_items", "id", &item_id.to_string())
            .await?;
        if matched == 0 || params.is_empty() {
            return Ok(UpdateOutcome {
                matched,
                modified: 0,
            });
        }

        let modified = sqlx::query(
            "UPDATE menu_items SET
                 name = COALESCE(?, name),
                 category = COALESCE(?, category),
                 price = COALESCE(?, price),
                 recipe = COALESCE(?, recipe),
                 image = COALESCE(?, image)
             WHERE id = ?",
        )
        .bind(&params.name)
        .bind(&params.category)
        .bind(params.price)
        .bind(&params.recipe)
        .bind(&params.image)
        .bind(item_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(backend)?
        .rows_affected();

        Ok(UpdateOutcome { matched, modified })
    }

    async fn delete_menu_item(&self, item_id: &MenuItemId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM menu_items WHERE id = ?")
            .bind(item_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected())
    }

    // ───────────────────────────── Reviews ─────────────────────────────

    async fn list_reviews(&self) -> Result<Vec<Review>, StoreError> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            "SELECT id, name, email, details, rating, created_at FROM reviews ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        collect(rows)
    }

    async fn create_review(&self, params: &CreateReviewParams) -> Result<Review, StoreError> {
        let id = ReviewId::generate();
        let now = now_millis();
        sqlx::query(
            "INSERT INTO reviews(id, name, email, details, rating, created_at) VALUES(?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&params.name)
        .bind(&params.email)
        .bind(&params.details)
        .bind(params.rating)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        Ok(Review {
            id,
            name: params.name.clone(),
            email: params.email.clone(),
            details: params.details.clone(),
            rating: params.rating,
            created_at: ts(now)?,
        })
    }

    // ───────────────────────────── Carts ─────────────────────────────

    async fn list_cart_items(&self, email: &str) -> Result<Vec<CartItem>, StoreError> {
        let rows = sqlx::query_as::<_, CartItemRow>(
            "SELECT id, email, menu_id, name, image, price, created_at
             FROM cart_items WHERE email = ? ORDER BY created_at, id",
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        collect(rows)
    }

    async fn create_cart_item(
        &self,
        params: &CreateCartItemParams,
    ) -> Result<CartItem, StoreError> {
        let id = CartItemId::generate();
        let now = now_millis();
        sqlx::query(
            "INSERT INTO cart_items(id, email, menu_id, name, image, price, created_at)
             VALUES(?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(&params.email)
        .bind(&params.menu_id)
        .bind(&params.name)
        .bind(&params.image)
        .bind(params.price)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        Ok(CartItem {
            id,
            email: params.email.clone(),
            menu_id: params.menu_id.clone(),
            name: params.name.clone(),
            image: params.image.clone(),
            price: params.price,
            created_at: ts(now)?,
        })
    }

    async fn delete_cart_item(&self, item_id: &CartItemId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = ?")
            .bind(item_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected())
    }

    async fn delete_cart_items(&self, item_ids: &[CartItemId]) -> Result<u64, StoreError> {
        if item_ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; item_ids.len()].join(",");
        let sql = format!("DELETE FROM cart_items WHERE id IN ({})", placeholders);
        let mut query = sqlx::query(&sql);
        for id in item_ids {
            query = query.bind(id.to_string());
        }
        let result = query.execute(&self.pool).await.map_err(backend)?;
        Ok(result.rows_affected())
    }

    // ───────────────────────────── Payments ─────────────────────────────

    async fn create_payment(&self, params: &CreatePaymentParams) -> Result<Payment, StoreError> {
        let id = PaymentId::generate();
        let cart_ids = serde_json::to_string(&params.cart_ids)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let menu_item_ids = serde_json::to_string(&params.menu_item_ids)
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        sqlx::query(
            "INSERT INTO payments(id, email, price, transaction_id, date, cart_ids, menu_item_ids,
                                  status, kind, cart_cleanup_pending, created_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(id.to_string())
        .bind(&params.email)
        .bind(params.price)
        .bind(&params.transaction_id)
        .bind(params.date.timestamp_millis())
        .bind(cart_ids)
        .bind(menu_item_ids)
        .bind(&params.status)
        .bind(params.kind.as_str())
        .bind(now_millis())
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        self.get_payment(&id).await
    }

    async fn get_payment(&self, payment_id: &PaymentId) -> Result<Payment, StoreError> {
        let sql = format!("SELECT {} FROM payments WHERE id = ?", PAYMENT_COLUMNS);
        sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(payment_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or(StoreError::NotFound)?
            .try_into()
    }

    async fn list_payments(
        &self,
        email: &str,
        kind: Option<PaymentKind>,
    ) -> Result<Vec<Payment>, StoreError> {
        let rows = match kind {
            Some(kind) => {
                let sql = format!(
                    "SELECT {} FROM payments WHERE email = ? AND kind = ? ORDER BY date, id",
                    PAYMENT_COLUMNS
                );
                sqlx::query_as::<_, PaymentRow>(&sql)
                    .bind(email)
                    .bind(kind.as_str())
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM payments WHERE email = ? ORDER BY date, id",
                    PAYMENT_COLUMNS
                );
                sqlx::query_as::<_, PaymentRow>(&sql)
                    .bind(email)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(backend)?;
        collect(rows)
    }

    async fn set_payment_cleanup_pending(
        &self,
        payment_id: &PaymentId,
        pending: bool,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE payments SET cart_cleanup_pending = ? WHERE id = ?")
            .bind(pending)
            .bind(payment_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ───────────────────────────── Statistics ─────────────────────────────

    async fn admin_stats(&self) -> Result<AdminStats, StoreError> {
        let (users, menu_items, orders, revenue) = sqlx::query_as::<_, (i64, i64, i64, f64)>(
            "SELECT (SELECT COUNT(*) FROM accounts),
                    (SELECT COUNT(*) FROM menu_items),
                    (SELECT COUNT(*) FROM payments),
                    (SELECT COALESCE(SUM(price), 0.0) FROM payments)",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        Ok(AdminStats {
            users: users as u64,
            menu_items: menu_items as u64,
            orders: orders as u64,
            revenue,
        })
    }

    async fn user_stats(&self, email: &str) -> Result<UserStats, StoreError> {
        let (orders, reservations, cart_items, reviews, total_spent) =
            sqlx::query_as::<_, (i64, i64, i64, i64, f64)>(
                "SELECT (SELECT COUNT(*) FROM payments WHERE email = ?1 AND kind = 'order'),
                        (SELECT COUNT(*) FROM payments WHERE email = ?1 AND kind = 'reservation'),
                        (SELECT COUNT(*) FROM cart_items WHERE email = ?1),
                        (SELECT COUNT(*) FROM reviews WHERE email = ?1),
                        (SELECT COALESCE(SUM(price), 0.0) FROM payments WHERE email = ?1)",
            )
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;

        Ok(UserStats {
            orders: orders as u64,
            reservations: reservations as u64,
            cart_items: cart_items as u64,
            reviews: reviews as u64,
            total_spent,
        })
    }
}

impl SqliteStore {
    /// `SELECT COUNT(*) FROM {table} WHERE {column} = ?` for the fixed tables above.
    async fn count_where(&self, table: &str, column: &str, value: &str) -> Result<u64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE {} = ?", table, column);
        let (count,) = sqlx::query_as::<_, (i64,)>(&sql)
            .bind(value)
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        Ok(count as u64)
    }
}
