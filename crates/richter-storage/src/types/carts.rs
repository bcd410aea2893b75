//! Cart types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::CartItemId;

/// Cart line item record
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(rename = "_id")]
    pub id: CartItemId,
    pub email: String,
    pub menu_id: String,
    pub name: String,
    pub image: Option<String>,
    pub price: f64,
    pub created_at: DateTime<Utc>,
}

/// Parameters for adding a cart line item
#[derive(Clone, Debug)]
pub struct CreateCartItemParams {
    pub email: String,
    pub menu_id: String,
    pub name: String,
    pub image: Option<String>,
    pub price: f64,
}
