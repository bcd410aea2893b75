use axum::{
    extract::{Path, State},
    Json,
};
use richter_storage::{AdminStats, UserStats};

use crate::error::ApiError;
use crate::server::AppState;
use crate::verification::normalize_email;

/// `GET /admin-stats`
pub async fn admin(State(state): State<AppState>) -> Result<Json<AdminStats>, ApiError> {
    Ok(Json(state.store.admin_stats().await?))
}

/// `GET /user-stats/{email}`
pub async fn user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<UserStats>, ApiError> {
    let email = normalize_email(&email)?;
    Ok(Json(state.store.user_stats(&email).await?))
}
