//! Review types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ReviewId;

/// Review record
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: ReviewId,
    pub name: String,
    pub email: String, // Author identity, taken from the session claim
    pub details: String,
    pub rating: f64,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating a review
#[derive(Clone, Debug)]
pub struct CreateReviewParams {
    pub name: String,
    pub email: String,
    pub details: String,
    pub rating: f64,
}
