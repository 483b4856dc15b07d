//! Menu items.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pizzeria_core::ProductId;

/// A product on the menu.
///
/// The backend calls the price field `price`; it is renamed to `unit_price`
/// on decode so the rest of the engine uses one name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: ProductId,
    pub name: String,
    #[serde(alias = "price")]
    pub unit_price: Decimal,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub sold_out: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}
