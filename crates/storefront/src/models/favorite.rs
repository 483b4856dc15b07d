//! Favorite products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pizzeria_core::ProductId;

use super::MenuItem;

/// A favorited product snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub product_id: ProductId,
    pub name: String,
    #[serde(alias = "price")]
    pub unit_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub added_at: DateTime<Utc>,
}

impl Favorite {
    /// Snapshot a menu item as a favorite added now.
    #[must_use]
    pub fn from_menu_item(item: &MenuItem) -> Self {
        Self {
            product_id: item.id,
            name: item.name.clone(),
            unit_price: item.unit_price,
            image_url: item.image_url.clone(),
            added_at: Utc::now(),
        }
    }
}
