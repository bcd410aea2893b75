//! HTTP handlers, one module per resource.

pub mod carts;
pub mod menu;
pub mod payments;
pub mod reviews;
pub mod stats;
pub mod tokens;
pub mod users;
pub mod verification;

use std::str::FromStr;

use crate::error::ApiError;
use crate::token::Claims;
use crate::verification::normalize_email;

/// Parse a path identifier, reporting a malformed one as a validation error.
pub(crate) fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::Validation(format!("invalid {} id: {}", what, raw)))
}

/// Normalize `email` and require it to be the caller's own identity.
pub(crate) fn ensure_self(
    claims: &Claims,
    email: &str,
    denied: &'static str,
) -> Result<String, ApiError> {
    let email = normalize_email(email)?;
    if email != claims.email.to_lowercase() {
        tracing::info!(caller = %claims.email, requested = %email, "Identity mismatch");
        return Err(ApiError::Forbidden(denied));
    }
    Ok(email)
}
