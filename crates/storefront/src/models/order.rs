//! Order records.
//!
//! An order is created once at checkout. Its line items and prices are a
//! frozen snapshot of the cart at that moment; later cart changes never touch
//! a placed order. Status transitions come from the backend.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use pizzeria_core::{Bucket, OrderId, OrderStatus};

use super::CartLine;

/// Priority surcharge as a fraction of the order price.
pub const PRIORITY_SURCHARGE: Decimal = Decimal::from_parts(20, 0, 0, false, 2);

/// Delivery contact for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub name: String,
    pub phone: String,
    pub address: String,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    #[serde(rename = "cart")]
    pub cart_snapshot: Vec<CartLine>,
    pub order_price: Decimal,
    #[serde(default)]
    pub priority_price: Decimal,
    #[serde(default)]
    pub priority: bool,
    pub estimated_delivery: DateTime<Utc>,
    pub customer: Customer,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Amount the customer pays on delivery.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.order_price + self.priority_price
    }

    /// Lifecycle bucket of the current status.
    #[must_use]
    pub fn bucket(&self) -> Bucket {
        self.status.bucket()
    }

    /// Time left until the estimated delivery, or `None` once it has passed.
    #[must_use]
    pub fn time_remaining(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        let remaining = self.estimated_delivery - now;
        (remaining > chrono::Duration::zero()).then_some(remaining)
    }
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub customer: Customer,
    pub cart: Vec<CartLine>,
    pub order_price: Decimal,
    pub priority_price: Decimal,
    pub priority: bool,
}

impl NewOrder {
    /// Freeze a cart snapshot into an order request.
    #[must_use]
    pub fn from_snapshot(customer: Customer, cart: Vec<CartLine>, priority: bool) -> Self {
        let order_price: Decimal = cart.iter().map(|line| line.total_price).sum();
        let priority_price = if priority {
            priority_price_for(order_price)
        } else {
            Decimal::ZERO
        };

        Self {
            customer,
            cart,
            order_price,
            priority_price,
            priority,
        }
    }
}

/// Body of `PATCH /orders/:id`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<bool>,
}

/// Priority surcharge for an order price, rounded to cents.
#[must_use]
pub fn priority_price_for(order_price: Decimal) -> Decimal {
    (order_price * PRIORITY_SURCHARGE)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
