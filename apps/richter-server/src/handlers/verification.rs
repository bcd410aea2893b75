use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use richter_storage::VerificationCode;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::server::AppState;
use crate::verification::{Redeemed, Resent};

#[derive(Debug, Deserialize)]
pub struct RedeemQuery {
    pub uid: Option<String>,
}

/// `GET /verify/{code}?uid=`
pub async fn redeem(
    State(state): State<AppState>,
    Path(code): Path<String>,
    query: Result<Query<RedeemQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    let code: VerificationCode = code
        .parse()
        .map_err(|e: richter_storage::InvalidCode| ApiError::Validation(e.to_string()))?;
    let uid = query.uid.as_deref().map(str::trim).filter(|u| !u.is_empty());

    Ok(Json(match state.verification.redeem(code, uid).await? {
        Redeemed::Verified(account) => json!({ "verified": true, "email": account.email }),
        Redeemed::NotFound => json!({
            "verified": false,
            "message": "invalid verification code",
        }),
    }))
}

/// `GET /sendMail/{email}`
pub async fn resend(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let message = match state.verification.resend(&email).await? {
        Resent::Sent => return Ok(Json(json!({ "sent": true }))),
        Resent::NotFound => "user not found",
        Resent::AlreadyVerified => "user already verified",
        Resent::Disabled => "email delivery is not configured",
        Resent::Failed(_) => "verification email could not be sent",
    };
    Ok(Json(json!({ "sent": false, "message": message })))
}

/// `GET /checkValid/{email}`
pub async fn check_valid(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(match state.verification.check_valid(&email).await? {
        Some(account) => json!({
            "email": account.email,
            "verified": account.verified,
            "role": account.role,
        }),
        None => json!({ "message": "user not found" }),
    }))
}
