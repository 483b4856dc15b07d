//! Bounded order history.

use std::collections::HashSet;

use pizzeria_core::OrderId;

use crate::config::DEFAULT_HISTORY_LIMIT;
use crate::models::Order;

/// The most recent orders, newest first.
///
/// An order placed locally is prepended without checking for an existing
/// entry, so until the next authoritative [`Self::set_orders`] the same id
/// may appear twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryLedger {
    limit: usize,
    orders: Vec<Order>,
}

impl Default for HistoryLedger {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl HistoryLedger {
    /// An empty ledger keeping at most `limit` orders (at least one).
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            orders: Vec::new(),
        }
    }

    /// Replace the list with an authoritative fetch.
    ///
    /// Sorted newest first by creation time and de-duplicated by id,
    /// keeping the newest occurrence, then truncated to the bound.
    pub fn set_orders(&mut self, mut orders: Vec<Order>) {
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut seen: HashSet<OrderId> = HashSet::with_capacity(orders.len());
        orders.retain(|order| seen.insert(order.id.clone()));
        orders.truncate(self.limit);

        self.orders = orders;
    }

    /// Prepend a just-placed order and truncate to the bound.
    pub fn add_local(&mut self, order: Order) {
        self.orders.insert(0, order);
        self.orders.truncate(self.limit);
    }

    /// Replace every entry with `order`'s id in place.
    ///
    /// Returns `false` (and adds nothing) when the id is not in the history.
    pub fn upsert(&mut self, order: &Order) -> bool {
        let mut found = false;
        for entry in self.orders.iter_mut().filter(|entry| entry.id == order.id) {
            entry.clone_from(order);
            found = true;
        }
        found
    }

    /// Orders, newest first.
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// First entry with the given id.
    #[must_use]
    pub fn get(&self, id: &OrderId) -> Option<&Order> {
        self.orders.iter().find(|order| &order.id == id)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Whether the history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Configured bound.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }
}
