use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde_json::{json, Map, Value};

use crate::error::ApiError;
use crate::server::AppState;

/// `POST /jwt`: sign the submitted identity payload.
pub async fn issue(
    State(state): State<AppState>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = payload?;
    let token = state
        .tokens
        .issue(payload)
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    Ok(Json(json!({ "token": token })))
}
