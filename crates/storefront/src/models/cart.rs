//! Cart line item.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pizzeria_core::ProductId;

/// One product line in the cart or in a frozen order snapshot.
///
/// `total_price == quantity * unit_price` is maintained by the cart ledger;
/// lines built with [`CartLine::new`] start consistent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl CartLine {
    /// Create a line with `total_price` derived from quantity and unit price.
    #[must_use]
    pub fn new(
        product_id: ProductId,
        name: impl Into<String>,
        quantity: u32,
        unit_price: Decimal,
    ) -> Self {
        Self {
            product_id,
            name: name.into(),
            quantity,
            unit_price,
            total_price: unit_price * Decimal::from(quantity),
            image: None,
        }
    }

    /// Attach a product image URL.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Recompute `total_price` from `quantity` and `unit_price`.
    pub(crate) fn reprice(&mut self) {
        self.total_price = self.unit_price * Decimal::from(self.quantity);
    }
}
