//! Storage abstraction for richter.
//!
//! Backend crates (e.g. richter-store-sqlite) implement [`Store`] so the server never
//! depends on a specific database engine or schema details.

mod store;
mod types;

pub use store::*;
pub use types::*;

use thiserror::Error;

/// Uniform error type for all storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    /// A record with the same identity (account email) already exists.
    #[error("already exists")]
    AlreadyExists,
    /// Any other uniqueness violation (e.g. a verification code collision).
    #[error("conflict")]
    Conflict,
    #[error("backend error: {0}")]
    Backend(String),
}
