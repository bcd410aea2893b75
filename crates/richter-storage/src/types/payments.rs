//! Payment types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CartItemId, PaymentId};

/// What a payment was for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    #[default]
    Order,
    Reservation,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::Order => "order",
            PaymentKind::Reservation => "reservation",
        }
    }
}

impl fmt::Display for PaymentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order" => Ok(PaymentKind::Order),
            "reservation" => Ok(PaymentKind::Reservation),
            other => Err(format!("Unknown payment kind: {}", other)),
        }
    }
}

/// Payment record
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(rename = "_id")]
    pub id: PaymentId,
    pub email: String,
    pub price: f64,
    pub transaction_id: String,
    pub date: DateTime<Utc>,
    pub cart_ids: Vec<CartItemId>,
    pub menu_item_ids: Vec<String>,
    pub status: String,
    pub kind: PaymentKind,
    /// Set while the cart items paid for have not been removed yet.
    pub cart_cleanup_pending: bool,
    pub created_at: DateTime<Utc>,
}

/// Parameters for recording a payment
#[derive(Clone, Debug)]
pub struct CreatePaymentParams {
    pub email: String,
    pub price: f64,
    pub transaction_id: String,
    pub date: DateTime<Utc>,
    pub cart_ids: Vec<CartItemId>,
    pub menu_item_ids: Vec<String>,
    pub status: String,
    pub kind: PaymentKind,
}
