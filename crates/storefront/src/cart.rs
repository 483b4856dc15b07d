//! Cart ledger.
//!
//! In-memory mapping from product to line item. Every line satisfies
//! `total_price == quantity * unit_price` and `quantity >= 1`; a line whose
//! quantity would reach zero is removed instead.
//!
//! Mutations are synchronous and never touch the backend. Operating on a
//! product that is not in the cart is a no-op. The cart is memory-only and is
//! not written to local storage.

use std::sync::{Arc, Mutex, PoisonError};

use rust_decimal::Decimal;

use pizzeria_core::ProductId;

use crate::models::CartLine;

/// The cart ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Add a line, merging quantities with an existing line for the same product.
    ///
    /// A merged line keeps its original unit price. A line with quantity 0 is
    /// ignored.
    pub fn add_item(&mut self, mut line: CartLine) {
        if line.quantity == 0 {
            return;
        }

        if let Some(existing) = self.line_mut(line.product_id) {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
            existing.reprice();
        } else {
            line.reprice();
            self.lines.push(line);
        }
    }

    /// Increment the quantity of a line by one.
    pub fn increase(&mut self, product_id: ProductId) {
        if let Some(line) = self.line_mut(product_id) {
            line.quantity = line.quantity.saturating_add(1);
            line.reprice();
        }
    }

    /// Decrement the quantity of a line by one, removing it at zero.
    pub fn decrease(&mut self, product_id: ProductId) {
        self.subtract(product_id, 1);
    }

    /// Remove a line entirely.
    pub fn delete(&mut self, product_id: ProductId) {
        self.lines.retain(|line| line.product_id != product_id);
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Take out what a completed checkout consumed.
    ///
    /// Subtracts each snapshot line's quantity from the current cart. Lines
    /// added (or topped up) after the snapshot was taken survive.
    pub fn settle(&mut self, snapshot: &[CartLine]) {
        for consumed in snapshot {
            self.subtract(consumed.product_id, consumed.quantity);
        }
    }

    fn subtract(&mut self, product_id: ProductId, quantity: u32) {
        let Some(index) = self
            .lines
            .iter()
            .position(|line| line.product_id == product_id)
        else {
            return;
        };

        let remove = match self.lines.get_mut(index) {
            Some(line) if line.quantity > quantity => {
                line.quantity -= quantity;
                line.reprice();
                false
            }
            Some(_) => true,
            None => false,
        };

        if remove {
            self.lines.remove(index);
        }
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| line.product_id == product_id)
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of all line quantities.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.lines.iter().map(|line| line.total_price).sum()
    }

    /// Quantity of one product, 0 when absent.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.lines
            .iter()
            .find(|line| line.product_id == product_id)
            .map_or(0, |line| line.quantity)
    }
}

/// Cloneable handle to a cart shared between callers and async handlers.
///
/// Async handlers must read the cart through this handle after every await
/// point instead of holding on to an earlier snapshot.
#[derive(Debug, Clone, Default)]
pub struct SharedCart {
    inner: Arc<Mutex<Cart>>,
}

impl SharedCart {
    /// A shared empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a mutation atomically.
    pub fn update<R>(&self, f: impl FnOnce(&mut Cart) -> R) -> R {
        let mut cart = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut cart)
    }

    /// Read the cart atomically.
    pub fn read<R>(&self, f: impl FnOnce(&Cart) -> R) -> R {
        let cart = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&cart)
    }

    /// Copy of the current cart.
    #[must_use]
    pub fn snapshot(&self) -> Cart {
        self.read(Cart::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pizza(id: i32, quantity: u32, price: i64) -> CartLine {
        CartLine::new(
            ProductId::new(id),
            format!("Pizza {id}"),
            quantity,
            Decimal::new(price, 0),
        )
    }

    fn assert_consistent(cart: &Cart) {
        for line in cart.lines() {
            assert!(line.quantity >= 1, "line {} has zero quantity", line.product_id);
            assert_eq!(
                line.total_price,
                line.unit_price * Decimal::from(line.quantity),
                "line {} total out of sync",
                line.product_id
            );
        }
    }

    #[test]
    fn test_add_item_merges_existing_line() {
        let mut cart = Cart::new();
        cart.add_item(pizza(1, 2, 10));
        cart.add_item(pizza(1, 1, 10));

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.quantity_of(ProductId::new(1)), 3);
        assert_eq!(cart.total_price(), Decimal::new(30, 0));
    }

    #[test]
    fn test_merged_line_keeps_original_unit_price() {
        let mut cart = Cart::new();
        cart.add_item(pizza(1, 1, 10));
        cart.add_item(pizza(1, 1, 99));

        assert_eq!(cart.total_price(), Decimal::new(20, 0));
        assert_consistent(&cart);
    }

    #[test]
    fn test_add_item_recomputes_inconsistent_total() {
        let mut line = pizza(1, 2, 10);
        line.total_price = Decimal::new(1, 0);

        let mut cart = Cart::new();
        cart.add_item(line);
        assert_consistent(&cart);
    }

    #[test]
    fn test_zero_quantity_line_is_ignored() {
        let mut cart = Cart::new();
        cart.add_item(pizza(1, 0, 10));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_decrease_twice_empties_cart() {
        let mut cart = Cart::new();
        cart.add_item(pizza(1, 2, 10));

        cart.decrease(ProductId::new(1));
        assert_eq!(cart.total_price(), Decimal::new(10, 0));
        cart.decrease(ProductId::new(1));

        assert!(cart.is_empty());
        assert_eq!(cart.total_quantity(), 0);
    }

    #[test]
    fn test_missing_product_is_noop() {
        let mut cart = Cart::new();
        cart.add_item(pizza(1, 1, 10));
        let before = cart.clone();

        cart.increase(ProductId::new(2));
        cart.decrease(ProductId::new(2));
        cart.delete(ProductId::new(2));

        assert_eq!(cart, before);
    }

    #[test]
    fn test_invariants_hold_over_mixed_sequences() {
        let mut cart = Cart::new();
        // Deterministic pseudo-random walk over three products.
        let mut seed: u32 = 17;
        for _ in 0..500 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let product = i32::try_from(seed % 3).unwrap_or(0);
            match (seed >> 8) % 4 {
                0 => cart.add_item(pizza(product, (seed >> 4) % 3, i64::from(product) + 8)),
                1 => cart.increase(ProductId::new(product)),
                2 | 3 => cart.decrease(ProductId::new(product)),
                _ => unreachable!(),
            }
            assert_consistent(&cart);
        }
    }

    #[test]
    fn test_settle_keeps_items_added_after_snapshot() {
        let mut cart = Cart::new();
        cart.add_item(pizza(1, 2, 10));
        let snapshot = cart.lines().to_vec();

        // Customer keeps shopping while the order is in flight.
        cart.add_item(pizza(1, 1, 10));
        cart.add_item(pizza(2, 1, 12));

        cart.settle(&snapshot);

        assert_eq!(cart.quantity_of(ProductId::new(1)), 1);
        assert_eq!(cart.quantity_of(ProductId::new(2)), 1);
        assert_consistent(&cart);
    }

    #[test]
    fn test_settle_tolerates_lines_removed_meanwhile() {
        let mut cart = Cart::new();
        cart.add_item(pizza(1, 2, 10));
        let snapshot = cart.lines().to_vec();

        cart.decrease(ProductId::new(1));
        cart.settle(&snapshot);

        assert!(cart.is_empty());
    }

    #[test]
    fn test_shared_cart_clones_see_same_ledger() {
        let cart = SharedCart::new();
        let other = cart.clone();

        cart.update(|c| c.add_item(pizza(1, 1, 10)));
        assert_eq!(other.read(Cart::total_quantity), 1);
        assert_eq!(other.snapshot().lines().len(), 1);
    }
}
