use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use richter_storage::{CreateReviewParams, Review};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::server::AppState;
use crate::token::Claims;

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub name: String,
    pub details: String,
    pub rating: f64,
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Review>>, ApiError> {
    Ok(Json(state.store.list_reviews().await?))
}

/// `POST /reviews`: the author is always the caller.
pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<CreateReviewRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body?;
    if !(0.0..=5.0).contains(&body.rating) {
        return Err(ApiError::Validation(
            "rating must be between 0 and 5".into(),
        ));
    }
    if body.details.trim().is_empty() {
        return Err(ApiError::Validation("details must not be empty".into()));
    }

    let review = state
        .store
        .create_review(&CreateReviewParams {
            name: body.name.trim().to_string(),
            email: claims.email,
            details: body.details,
            rating: body.rating,
        })
        .await?;
    Ok(Json(json!({ "insertedId": review.id })))
}
