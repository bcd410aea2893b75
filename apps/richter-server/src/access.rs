//! Access control middleware.
//!
//! `require_auth` validates the bearer token and attaches its [`Claims`] to the request.
//! `require_admin` additionally checks the caller's stored role and must always be
//! layered inside `require_auth`.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use richter_storage::StoreError;

use crate::error::{ApiError, FORBIDDEN};
use crate::server::AppState;
use crate::token::Claims;

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively; anything else yields `None`.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, rest) = raw.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = rest.trim();
    (!token.is_empty()).then_some(token)
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if req.headers().get(AUTHORIZATION).is_none() {
        return Err(ApiError::AuthMissing);
    }
    let token = extract_bearer_token(req.headers()).ok_or(ApiError::AuthInvalid)?;

    let claims = state.tokens.verify(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected session token");
        ApiError::AuthInvalid
    })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // Never evaluate the role without a verified claim.
    let email = req
        .extensions()
        .get::<Claims>()
        .map(|c| c.email.clone())
        .ok_or(ApiError::AuthMissing)?;

    match state.store.get_account_by_email(&email).await {
        Ok(account) if account.role.is_admin() => Ok(next.run(req).await),
        Ok(_) | Err(StoreError::NotFound) => {
            tracing::info!(email = %email, "Admin route denied");
            Err(ApiError::Forbidden(FORBIDDEN))
        }
        Err(e) => Err(e.into()),
    }
}
