//! Type definitions for richter storage.

mod accounts;
mod carts;
mod ids;
mod menu;
mod payments;
mod reviews;
mod stats;

// Re-export all types from submodules
pub use accounts::*;
pub use carts::*;
pub use ids::*;
pub use menu::*;
pub use payments::*;
pub use reviews::*;
pub use stats::*;

use serde::Serialize;

/// Result of a partial update: how many rows matched the filter and how many changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UpdateOutcome {
    #[serde(rename = "matchedCount")]
    pub matched: u64,
    #[serde(rename = "modifiedCount")]
    pub modified: u64,
}
