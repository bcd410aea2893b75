//! Aggregate statistics.

use serde::Serialize;

/// Restaurant-wide counts and revenue.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub users: u64,
    pub menu_items: u64,
    pub orders: u64,
    pub revenue: f64,
}

/// Counts for a single email.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub orders: u64,
    pub reservations: u64,
    pub cart_items: u64,
    pub reviews: u64,
    pub total_spent: f64,
}
