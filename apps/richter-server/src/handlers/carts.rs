use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use richter_storage::{CartItem, CartItemId, CreateCartItemParams};
use serde::Deserialize;
use serde_json::{json, Value};

use super::parse_id;
use crate::error::ApiError;
use crate::server::AppState;
use crate::verification::normalize_email;

#[derive(Debug, Deserialize)]
pub struct CartQuery {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCartItemRequest {
    pub email: String,
    pub menu_id: String,
    pub name: String,
    pub image: Option<String>,
    pub price: f64,
}

/// `GET /carts?email=`
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<CartQuery>, QueryRejection>,
) -> Result<Json<Vec<CartItem>>, ApiError> {
    let Query(query) = query?;
    let email = query
        .email
        .ok_or_else(|| ApiError::Validation("email query parameter is required".into()))?;
    let email = normalize_email(&email)?;
    Ok(Json(state.store.list_cart_items(&email).await?))
}

pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<CreateCartItemRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body?;
    if !body.price.is_finite() || body.price < 0.0 {
        return Err(ApiError::Validation(
            "price must be a non-negative number".into(),
        ));
    }

    let item = state
        .store
        .create_cart_item(&CreateCartItemParams {
            email: normalize_email(&body.email)?,
            menu_id: body.menu_id,
            name: body.name,
            image: body.image,
            price: body.price,
        })
        .await?;
    Ok(Json(json!({ "insertedId": item.id })))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let item_id: CartItemId = parse_id(&id, "cart item")?;
    let deleted = state.store.delete_cart_item(&item_id).await?;
    Ok(Json(json!({ "deletedCount": deleted })))
}
