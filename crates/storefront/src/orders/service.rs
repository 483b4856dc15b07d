//! Order lifecycle against the backend.

use std::sync::{Arc, Mutex, PoisonError};

use secrecy::SecretString;
use tracing::instrument;

use pizzeria_core::{OrderId, OrderStatus};

use super::admin::{AdminLedger, AdminStats};
use super::history::HistoryLedger;
use crate::api::{OrderScope, StoreApi};
use crate::cart::SharedCart;
use crate::error::{Result, SyncError};
use crate::models::{Customer, NewOrder, Order, OrderUpdate};
use crate::session::{Identity, Owner};
use crate::storage::{Namespace, Storage, Store};

/// Places, refreshes and administers orders.
///
/// Every handler applies its result to the ledgers as they are when the
/// backend answers; ledgers are never held across an await. The history
/// belongs to one owner and is reset on every identity switch.
pub struct OrderService<A> {
    api: Arc<A>,
    history: Mutex<OwnedHistory>,
    admin: Mutex<AdminLedger>,
    admin_store: Store<(), AdminLedger>,
}

struct OwnedHistory {
    owner: Owner,
    ledger: HistoryLedger,
}

impl<A: StoreApi> OrderService<A> {
    /// Create the service, restoring the admin ledger from `adminData`.
    ///
    /// The history starts empty and belongs to `identity`.
    #[must_use]
    pub fn new(api: Arc<A>, storage: &Storage, history_limit: usize, identity: &Identity) -> Self {
        let admin_store: Store<(), AdminLedger> = Store::new(storage.clone(), Namespace::AdminData);
        let admin = admin_store.load(&()).unwrap_or_default();

        Self {
            api,
            history: Mutex::new(OwnedHistory {
                owner: identity.owner(),
                ledger: HistoryLedger::new(history_limit),
            }),
            admin: Mutex::new(admin),
            admin_store,
        }
    }

    /// Check out the cart.
    ///
    /// The cart is snapshotted before the request. Once the backend accepts
    /// the order, the snapshot's quantities are settled against the cart as
    /// it is then, so items added meanwhile stay in the cart.
    ///
    /// # Errors
    ///
    /// - `SyncError::Validation` for an empty cart or incomplete customer
    /// - `SyncError` from the backend; the cart is untouched in that case
    #[instrument(skip(self, identity, cart, customer))]
    pub async fn place_order(
        &self,
        identity: &Identity,
        cart: &SharedCart,
        customer: Customer,
        priority: bool,
    ) -> Result<Order> {
        validate_customer(&customer)?;
        let snapshot = cart.read(|c| c.lines().to_vec());
        if snapshot.is_empty() {
            return Err(SyncError::Validation("cart is empty".to_string()));
        }

        let request = NewOrder::from_snapshot(customer, snapshot, priority);
        let order = self.api.create_order(identity.token(), &request).await?;

        {
            let mut history = self.lock_history();
            if history.owner == identity.owner() {
                history.ledger.add_local(order.clone());
            }
        }
        self.with_admin(|admin| admin.insert(order.clone()));
        cart.update(|c| c.settle(&request.cart));

        tracing::info!(order_id = %order.id, total = %order.total_price(), "Order placed");
        Ok(order)
    }

    /// Fetch one order and refresh any ledger entry for it.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::NotFound` for an unknown id, or the backend error.
    #[instrument(skip(self, identity), fields(order_id = %id))]
    pub async fn fetch_order(&self, identity: &Identity, id: &OrderId) -> Result<Order> {
        let order = self.api.fetch_order(identity.token(), id).await?;
        self.refresh(&order);
        Ok(order)
    }

    /// Mark an order as priority.
    ///
    /// # Errors
    ///
    /// Returns the backend error; ledgers are unchanged in that case.
    #[instrument(skip(self, identity), fields(order_id = %id))]
    pub async fn upgrade_priority(&self, identity: &Identity, id: &OrderId) -> Result<Order> {
        let update = OrderUpdate {
            priority: Some(true),
            ..OrderUpdate::default()
        };
        let order = self.api.update_order(identity.token(), id, &update).await?;
        self.refresh(&order);
        Ok(order)
    }

    /// Replace the history with the signed-in user's orders.
    ///
    /// A guest has no backend history; the local ledger is returned as is.
    /// Orders that arrive after the identity changed are returned to the
    /// caller but not recorded.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the history is unchanged in that case.
    #[instrument(skip(self, identity))]
    pub async fn fetch_history(&self, identity: &Identity) -> Result<Vec<Order>> {
        let Some(token) = identity.token() else {
            return Ok(self.history());
        };

        let orders = self.api.fetch_orders(token, OrderScope::Mine).await?;

        let mut history = self.lock_history();
        if history.owner == identity.owner() {
            history.ledger.set_orders(orders);
            return Ok(history.ledger.orders().to_vec());
        }
        let mut detached = HistoryLedger::new(history.ledger.limit());
        drop(history);

        tracing::debug!("History fetched for a previous identity, not recorded");
        detached.set_orders(orders);
        Ok(detached.orders().to_vec())
    }

    /// Empty the history and hand it to `identity`.
    pub fn reset_history(&self, identity: &Identity) {
        let mut history = self.lock_history();
        let limit = history.ledger.limit();
        history.owner = identity.owner();
        history.ledger = HistoryLedger::new(limit);
    }

    /// Replace the admin ledger with every order.
    ///
    /// # Errors
    ///
    /// - `SyncError::Forbidden` unless the identity is an operator
    /// - the backend error; the ledger is unchanged in that case
    #[instrument(skip(self, identity))]
    pub async fn fetch_admin(&self, identity: &Identity) -> Result<AdminStats> {
        let token = operator_token(identity)?;
        let orders = self.api.fetch_orders(token, OrderScope::All).await?;
        Ok(self.with_admin(|admin| {
            admin.set_orders_admin(orders);
            admin.stats().clone()
        }))
    }

    /// Set an order's status as an operator.
    ///
    /// # Errors
    ///
    /// - `SyncError::Forbidden` unless the identity is an operator
    /// - the backend error; the ledgers are unchanged in that case
    #[instrument(skip(self, identity), fields(order_id = %id))]
    pub async fn update_status_admin(
        &self,
        identity: &Identity,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<Order> {
        let token = operator_token(identity)?;
        let update = OrderUpdate {
            status: Some(status),
            ..OrderUpdate::default()
        };
        let order = self.api.update_order(Some(token), id, &update).await?;

        self.lock_history().ledger.upsert(&order);
        self.with_admin(|admin| {
            if !admin.update(order.clone()) {
                admin.insert(order.clone());
            }
        });
        Ok(order)
    }

    /// Delete an order as an operator.
    ///
    /// # Errors
    ///
    /// - `SyncError::Forbidden` unless the identity is an operator
    /// - the backend error; the ledger is unchanged in that case
    #[instrument(skip(self, identity), fields(order_id = %id))]
    pub async fn delete_admin(&self, identity: &Identity, id: &OrderId) -> Result<()> {
        let token = operator_token(identity)?;
        self.api.delete_order(token, id).await?;
        self.with_admin(|admin| admin.delete(id));
        tracing::info!(order_id = %id, "Order deleted");
        Ok(())
    }

    /// Copy of the history, newest first.
    #[must_use]
    pub fn history(&self) -> Vec<Order> {
        self.lock_history().ledger.orders().to_vec()
    }

    /// Copy of the admin ledger.
    #[must_use]
    pub fn admin(&self) -> AdminLedger {
        self.admin
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current admin stats.
    #[must_use]
    pub fn admin_stats(&self) -> AdminStats {
        self.admin
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stats()
            .clone()
    }

    fn refresh(&self, order: &Order) {
        self.lock_history().ledger.upsert(order);
        self.with_admin(|admin| admin.update(order.clone()));
    }

    fn lock_history(&self) -> std::sync::MutexGuard<'_, OwnedHistory> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutate the admin ledger and persist it.
    fn with_admin<R>(&self, f: impl FnOnce(&mut AdminLedger) -> R) -> R {
        let mut admin = self.admin.lock().unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut admin);
        self.admin_store.save(&(), &admin);
        result
    }
}

fn operator_token(identity: &Identity) -> Result<&SecretString> {
    match identity.token() {
        Some(token) if identity.is_admin() => Ok(token),
        _ => Err(SyncError::Forbidden(
            "operator privileges required".to_string(),
        )),
    }
}

fn validate_customer(customer: &Customer) -> Result<()> {
    for (field, value) in [
        ("name", &customer.name),
        ("phone", &customer.phone),
        ("address", &customer.address),
    ] {
        if value.trim().is_empty() {
            return Err(SyncError::Validation(format!("customer {field} is required")));
        }
    }
    Ok(())
}
