//! Operator ledger over every order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pizzeria_core::{Bucket, OrderId};

use crate::models::Order;

/// Aggregate counters over the orders in an [`AdminLedger`].
///
/// `total_revenue` is the sum of `order_price + priority_price` over present
/// orders. Orders in the exceptional or unknown buckets count toward
/// `total_orders` only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_orders: usize,
    pub total_revenue: Decimal,
    pub active_orders: usize,
    pub completed_orders: usize,
}

impl AdminStats {
    /// Recompute from scratch.
    #[must_use]
    pub fn from_orders(orders: &[Order]) -> Self {
        let mut stats = Self::default();
        for order in orders {
            stats.add(order);
        }
        stats
    }

    fn add(&mut self, order: &Order) {
        self.total_orders += 1;
        self.total_revenue += order.total_price();
        match order.bucket() {
            Bucket::Active => self.active_orders += 1,
            Bucket::Completed => self.completed_orders += 1,
            Bucket::Exceptional | Bucket::Unknown => {}
        }
    }

    fn subtract(&mut self, order: &Order) {
        self.total_orders = self.total_orders.saturating_sub(1);
        self.total_revenue -= order.total_price();
        match order.bucket() {
            Bucket::Active => self.active_orders = self.active_orders.saturating_sub(1),
            Bucket::Completed => {
                self.completed_orders = self.completed_orders.saturating_sub(1);
            }
            Bucket::Exceptional | Bucket::Unknown => {}
        }
    }
}

/// Persisted shape of the ledger. Stats are written for readers of the raw
/// document but never trusted on load.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdminData {
    orders: Vec<Order>,
    #[serde(default)]
    stats: Option<AdminStats>,
}

/// Every order, unique by id, with incrementally maintained stats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AdminData", into = "AdminData")]
pub struct AdminLedger {
    orders: Vec<Order>,
    stats: AdminStats,
}

impl From<AdminData> for AdminLedger {
    fn from(data: AdminData) -> Self {
        let mut ledger = Self::default();
        ledger.set_orders_admin(data.orders);
        ledger
    }
}

impl From<AdminLedger> for AdminData {
    fn from(ledger: AdminLedger) -> Self {
        Self {
            orders: ledger.orders,
            stats: Some(ledger.stats),
        }
    }
}

impl AdminLedger {
    /// Add an order unless one with the same id is present.
    ///
    /// Returns whether the order was inserted.
    pub fn insert(&mut self, order: Order) -> bool {
        if self.position(&order.id).is_some() {
            return false;
        }
        self.stats.add(&order);
        self.orders.push(order);
        true
    }

    /// Replace the order with the same id.
    ///
    /// Moves the bucket counters if the status changed and adjusts revenue
    /// by the difference in totals. Returns `false` when the id is absent.
    pub fn update(&mut self, order: Order) -> bool {
        let Some(index) = self.position(&order.id) else {
            return false;
        };
        let Some(entry) = self.orders.get_mut(index) else {
            return false;
        };
        self.stats.subtract(entry);
        self.stats.add(&order);
        *entry = order;
        true
    }

    /// Remove an order, reversing its contribution to the stats.
    pub fn delete(&mut self, id: &OrderId) -> Option<Order> {
        let index = self.position(id)?;
        let order = self.orders.remove(index);
        self.stats.subtract(&order);
        Some(order)
    }

    /// Replace every order and recompute the stats.
    ///
    /// Later duplicates of an id are dropped.
    pub fn set_orders_admin(&mut self, orders: Vec<Order>) {
        self.orders.clear();
        self.stats = AdminStats::default();
        for order in orders {
            self.insert(order);
        }
    }

    fn position(&self, id: &OrderId) -> Option<usize> {
        self.orders.iter().position(|order| &order.id == id)
    }

    /// Current stats.
    #[must_use]
    pub const fn stats(&self) -> &AdminStats {
        &self.stats
    }

    /// Orders in insertion order.
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Order by id.
    #[must_use]
    pub fn get(&self, id: &OrderId) -> Option<&Order> {
        self.orders.iter().find(|order| &order.id == id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pizzeria_core::OrderStatus;

    use super::*;
    use crate::orders::history::tests::order;

    fn assert_invariants(ledger: &AdminLedger) {
        let stats = ledger.stats();
        assert_eq!(*stats, AdminStats::from_orders(ledger.orders()));
        assert!(stats.active_orders + stats.completed_orders <= stats.total_orders);
    }

    #[test]
    fn test_insert_is_guarded_by_id() {
        let mut ledger = AdminLedger::default();
        assert!(ledger.insert(order("A", 1, OrderStatus::Preparing, 20)));
        assert!(!ledger.insert(order("A", 1, OrderStatus::Preparing, 99)));

        assert_eq!(ledger.stats().total_orders, 1);
        assert_eq!(ledger.stats().total_revenue, Decimal::new(20, 0));
        assert_invariants(&ledger);
    }

    #[test]
    fn test_status_transition_moves_buckets_only() {
        let mut ledger = AdminLedger::default();
        ledger.insert(order("O1", 1, OrderStatus::Preparing, 20));
        let before = ledger.stats().clone();

        assert!(ledger.update(order("O1", 1, OrderStatus::Delivered, 20)));

        let after = ledger.stats();
        assert_eq!(after.active_orders, before.active_orders - 1);
        assert_eq!(after.completed_orders, before.completed_orders + 1);
        assert_eq!(after.total_orders, before.total_orders);
        assert_eq!(after.total_revenue, before.total_revenue);
        assert_invariants(&ledger);
    }

    #[test]
    fn test_priority_upgrade_adjusts_revenue_by_delta() {
        let mut ledger = AdminLedger::default();
        ledger.insert(order("O1", 1, OrderStatus::Preparing, 20));

        let mut upgraded = order("O1", 1, OrderStatus::Preparing, 20);
        upgraded.priority = true;
        upgraded.priority_price = Decimal::new(4, 0);
        ledger.update(upgraded);

        assert_eq!(ledger.stats().total_revenue, Decimal::new(24, 0));
        assert_invariants(&ledger);
    }

    #[test]
    fn test_update_missing_order_is_rejected() {
        let mut ledger = AdminLedger::default();
        assert!(!ledger.update(order("O1", 1, OrderStatus::Delivered, 20)));
        assert_eq!(ledger.stats().total_orders, 0);
    }

    #[test]
    fn test_delete_reverses_contribution() {
        let mut ledger = AdminLedger::default();
        ledger.insert(order("A", 1, OrderStatus::Delivered, 20));
        ledger.insert(order("B", 2, OrderStatus::Cancelled, 15));

        let removed = ledger.delete(&OrderId::from("A")).unwrap();
        assert_eq!(removed.id, OrderId::from("A"));
        assert_eq!(ledger.stats().completed_orders, 0);
        assert_eq!(ledger.stats().total_revenue, Decimal::new(15, 0));
        assert!(ledger.delete(&OrderId::from("A")).is_none());
        assert_invariants(&ledger);
    }

    #[test]
    fn test_revenue_tracks_sum_over_mixed_sequence() {
        let statuses = [
            OrderStatus::Placed,
            OrderStatus::Delivering,
            OrderStatus::Delivered,
            OrderStatus::Refunded,
            OrderStatus::Unknown("teleported".to_string()),
        ];
        let mut ledger = AdminLedger::default();

        for step in 0_i64..60 {
            let id = format!("O{}", step % 7);
            let status = statuses[usize::try_from(step).unwrap() % statuses.len()].clone();
            let price = 10 + step % 5;
            match step % 3 {
                0 => {
                    ledger.insert(order(&id, step, status, price));
                }
                1 => {
                    ledger.update(order(&id, step, status, price));
                }
                _ => {
                    ledger.delete(&OrderId::from(id.as_str()));
                }
            }
            assert_invariants(&ledger);
        }

        let expected: Decimal = ledger.orders().iter().map(Order::total_price).sum();
        assert_eq!(ledger.stats().total_revenue, expected);
    }

    #[test]
    fn test_set_orders_admin_recomputes() {
        let mut ledger = AdminLedger::default();
        ledger.insert(order("X", 1, OrderStatus::Preparing, 99));

        ledger.set_orders_admin(vec![
            order("A", 1, OrderStatus::Preparing, 10),
            order("B", 2, OrderStatus::PickedUp, 15),
            order("A", 1, OrderStatus::Preparing, 10),
        ]);

        assert_eq!(ledger.orders().len(), 2);
        assert_eq!(
            *ledger.stats(),
            AdminStats {
                total_orders: 2,
                total_revenue: Decimal::new(25, 0),
                active_orders: 1,
                completed_orders: 1,
            }
        );
    }

    #[test]
    fn test_persisted_stats_are_recomputed_on_load() {
        let mut ledger = AdminLedger::default();
        ledger.insert(order("A", 1, OrderStatus::Preparing, 10));

        let mut json = serde_json::to_value(&ledger).unwrap();
        json["stats"]["totalRevenue"] = serde_json::json!("999");
        json["stats"]["totalOrders"] = serde_json::json!(42);

        let restored: AdminLedger = serde_json::from_value(json).unwrap();
        assert_eq!(restored, ledger);
    }
}
