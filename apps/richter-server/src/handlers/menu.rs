use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use richter_storage::{
    CreateMenuItemParams, MenuItem, MenuItemId, StoreError, UpdateMenuItemParams, UpdateOutcome,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::parse_id;
use crate::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateMenuItemRequest {
    pub name: String,
    pub category: String,
    pub price: f64,
    pub recipe: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateMenuItemRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub recipe: Option<String>,
    pub image: Option<String>,
}

fn check_price(price: f64) -> Result<f64, ApiError> {
    if price.is_finite() && price >= 0.0 {
        Ok(price)
    } else {
        Err(ApiError::Validation(
            "price must be a non-negative number".into(),
        ))
    }
}

fn check_name(field: &str, value: String) -> Result<String, ApiError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(ApiError::Validation(format!("{} must not be empty", field)));
    }
    Ok(value)
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<MenuItem>>, ApiError> {
    Ok(Json(state.store.list_menu_items().await?))
}

/// `GET /menu/{id}`: the item, or `null` when there is none.
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Option<MenuItem>>, ApiError> {
    let item_id: MenuItemId = parse_id(&id, "menu item")?;
    match state.store.get_menu_item(&item_id).await {
        Ok(item) => Ok(Json(Some(item))),
        Err(StoreError::NotFound) => Ok(Json(None)),
        Err(e) => Err(e.into()),
    }
}

pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<CreateMenuItemRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body?;
    let params = CreateMenuItemParams {
        name: check_name("name", body.name)?,
        category: check_name("category", body.category)?,
        price: check_price(body.price)?,
        recipe: body.recipe,
        image: body.image,
    };

    let item = state.store.create_menu_item(&params).await?;
    tracing::info!(item_id = %item.id, name = %item.name, "Menu item created");
    Ok(Json(json!({ "insertedId": item.id })))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateMenuItemRequest>, JsonRejection>,
) -> Result<Json<UpdateOutcome>, ApiError> {
    let Json(body) = body?;
    let item_id: MenuItemId = parse_id(&id, "menu item")?;

    let params = UpdateMenuItemParams {
        name: body.name.map(|v| check_name("name", v)).transpose()?,
        category: body.category.map(|v| check_name("category", v)).transpose()?,
        price: body.price.map(check_price).transpose()?,
        recipe: body.recipe,
        image: body.image,
    };
    if params.is_empty() {
        return Err(ApiError::Validation("no fields to update".into()));
    }

    Ok(Json(state.store.update_menu_item(&item_id, &params).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let item_id: MenuItemId = parse_id(&id, "menu item")?;
    let deleted = state.store.delete_menu_item(&item_id).await?;
    Ok(Json(json!({ "deletedCount": deleted })))
}
