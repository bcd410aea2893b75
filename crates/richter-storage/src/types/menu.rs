//! Menu types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::MenuItemId;

/// Menu item record
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    #[serde(rename = "_id")]
    pub id: MenuItemId,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub recipe: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Parameters for creating a menu item
#[derive(Clone, Debug)]
pub struct CreateMenuItemParams {
    pub name: String,
    pub category: String,
    pub price: f64,
    pub recipe: Option<String>,
    pub image: Option<String>,
}

/// Partial update of a menu item; `None` leaves a field unchanged.
#[derive(Clone, Debug, Default)]
pub struct UpdateMenuItemParams {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub recipe: Option<String>,
    pub image: Option<String>,
}

impl UpdateMenuItemParams {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.price.is_none()
            && self.recipe.is_none()
            && self.image.is_none()
    }
}
