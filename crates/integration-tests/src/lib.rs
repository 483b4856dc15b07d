//! Integration tests for the Pizzeria storefront engine.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p pizzeria-integration-tests
//! ```
//!
//! # Fake backend
//!
//! [`FakeApi`] implements [`StoreApi`] in memory. Tests script it:
//!
//! - seed menu, orders, favorites and rating aggregates
//! - [`FakeApi::fail`] makes an endpoint answer HTTP 500
//! - [`FakeApi::reject_token`] makes every call with a token answer HTTP 401
//! - [`FakeApi::pause`] holds the next call to an endpoint until the
//!   returned [`Gate`] is released. The response is computed when the call
//!   arrives, so a paused call returns the state as it was then.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::oneshot;

use pizzeria_core::{OrderId, OrderStatus, ProductId, UserId};
use pizzeria_storefront::models::order::priority_price_for;
use pizzeria_storefront::models::{
    CurrentUser, Customer, Favorite, MenuItem, NewOrder, Order, OrderUpdate, RatingSubmission,
    RatingSummary,
};
use pizzeria_storefront::{
    ApiError, OrderScope, Storage, StoreApi, Storefront, StorefrontConfig,
};

/// Backend endpoints, for scripting failures and pauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Menu,
    CreateOrder,
    FetchOrder,
    UpdateOrder,
    FetchOrders,
    DeleteOrder,
    FetchFavorites,
    AddFavorite,
    RemoveFavorite,
    FetchRatings,
    SubmitRating,
}

/// Holds one paused call until released.
pub struct Gate {
    release: oneshot::Sender<()>,
}

impl Gate {
    /// Let the paused call return.
    pub fn release(self) {
        let _ = self.release.send(());
    }
}

#[derive(Default)]
struct FakeState {
    menu: Vec<MenuItem>,
    orders: Vec<(Order, Option<String>)>,
    next_order: u32,
    favorites: HashMap<String, Vec<Favorite>>,
    ratings: HashMap<ProductId, RatingSummary>,
    submissions: Vec<RatingSubmission>,
    rejected_tokens: HashSet<String>,
    failing: HashSet<Endpoint>,
    failing_products: HashSet<ProductId>,
    gates: HashMap<Endpoint, VecDeque<oneshot::Receiver<()>>>,
    calls: Vec<Endpoint>,
}

type Pending<T> = (Result<T, ApiError>, Option<oneshot::Receiver<()>>);

/// In-memory backend.
#[derive(Clone, Default)]
pub struct FakeApi {
    state: Arc<Mutex<FakeState>>,
}

impl FakeApi {
    /// An empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the menu.
    pub fn set_menu(&self, menu: Vec<MenuItem>) {
        self.lock().menu = menu;
    }

    /// Replace the favorites stored for `token`.
    pub fn set_favorites(&self, token: &str, favorites: Vec<Favorite>) {
        self.lock().favorites.insert(token.to_string(), favorites);
    }

    /// Favorites stored for `token`.
    #[must_use]
    pub fn favorites_of(&self, token: &str) -> Vec<Favorite> {
        self.lock().favorites.get(token).cloned().unwrap_or_default()
    }

    /// Set the aggregate `GET /ratings` reports for a product.
    pub fn set_rating_summary(&self, product_id: ProductId, average: f64, count: u32) {
        self.lock()
            .ratings
            .insert(product_id, RatingSummary { average, count });
    }

    /// Ratings received through `POST /ratings`.
    #[must_use]
    pub fn submissions(&self) -> Vec<RatingSubmission> {
        self.lock().submissions.clone()
    }

    /// Add an order owned by `owner_token`.
    pub fn insert_order(&self, order: Order, owner_token: Option<&str>) {
        self.lock()
            .orders
            .push((order, owner_token.map(str::to_string)));
    }

    /// Answer HTTP 401 to every call carrying `token`.
    pub fn reject_token(&self, token: &str) {
        self.lock().rejected_tokens.insert(token.to_string());
    }

    /// Answer HTTP 500 on `endpoint`.
    pub fn fail(&self, endpoint: Endpoint) {
        self.lock().failing.insert(endpoint);
    }

    /// Answer HTTP 500 to favorite removals of `product_id` only.
    pub fn fail_removal_of(&self, product_id: ProductId) {
        self.lock().failing_products.insert(product_id);
    }

    /// Hold the next call to `endpoint` until the gate is released.
    #[must_use]
    pub fn pause(&self, endpoint: Endpoint) -> Gate {
        let (release, wait) = oneshot::channel();
        self.lock()
            .gates
            .entry(endpoint)
            .or_default()
            .push_back(wait);
        Gate { release }
    }

    /// Number of calls made to `endpoint`.
    #[must_use]
    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.lock().calls.iter().filter(|&&e| e == endpoint).count()
    }

    fn handle<T>(
        &self,
        endpoint: Endpoint,
        token: Option<&SecretString>,
        respond: impl FnOnce(&mut FakeState) -> Result<T, ApiError>,
    ) -> Pending<T> {
        let mut state = self.lock();
        state.calls.push(endpoint);
        let gate = state
            .gates
            .get_mut(&endpoint)
            .and_then(VecDeque::pop_front);

        let rejected = token.is_some_and(|t| state.rejected_tokens.contains(t.expose_secret()));
        let result = if rejected {
            Err(ApiError::Unauthorized)
        } else if state.failing.contains(&endpoint) {
            Err(ApiError::Api {
                status: 500,
                message: format!("{endpoint:?} unavailable"),
            })
        } else {
            respond(&mut state)
        };

        (result, gate)
    }
}

async fn finish<T>((result, gate): Pending<T>) -> Result<T, ApiError> {
    if let Some(gate) = gate {
        let _ = gate.await;
    }
    result
}

fn owner(token: Option<&SecretString>) -> Option<String> {
    token.map(|t| t.expose_secret().to_string())
}

fn order_not_found(id: &OrderId) -> ApiError {
    ApiError::NotFound(format!("order {id}"))
}

impl StoreApi for FakeApi {
    async fn fetch_menu(&self) -> Result<Vec<MenuItem>, ApiError> {
        finish(self.handle(Endpoint::Menu, None, |s| Ok(s.menu.clone()))).await
    }

    async fn create_order(
        &self,
        token: Option<&SecretString>,
        order: &NewOrder,
    ) -> Result<Order, ApiError> {
        let pending = self.handle(Endpoint::CreateOrder, token, |s| {
            s.next_order += 1;
            let now = Utc::now();
            let created = Order {
                id: OrderId::new(format!("ORD{:03}", s.next_order)),
                status: OrderStatus::Placed,
                cart_snapshot: order.cart.clone(),
                order_price: order.order_price,
                priority_price: order.priority_price,
                priority: order.priority,
                estimated_delivery: now + Duration::minutes(30),
                customer: order.customer.clone(),
                created_at: now,
            };
            s.orders.push((created.clone(), owner(token)));
            Ok(created)
        });
        finish(pending).await
    }

    async fn fetch_order(
        &self,
        token: Option<&SecretString>,
        id: &OrderId,
    ) -> Result<Order, ApiError> {
        let pending = self.handle(Endpoint::FetchOrder, token, |s| {
            s.orders
                .iter()
                .find(|(order, _)| &order.id == id)
                .map(|(order, _)| order.clone())
                .ok_or_else(|| order_not_found(id))
        });
        finish(pending).await
    }

    async fn update_order(
        &self,
        token: Option<&SecretString>,
        id: &OrderId,
        update: &OrderUpdate,
    ) -> Result<Order, ApiError> {
        let pending = self.handle(Endpoint::UpdateOrder, token, |s| {
            let (order, _) = s
                .orders
                .iter_mut()
                .find(|(order, _)| &order.id == id)
                .ok_or_else(|| order_not_found(id))?;
            if let Some(status) = &update.status {
                order.status = status.clone();
            }
            if update.priority == Some(true) && !order.priority {
                order.priority = true;
                order.priority_price = priority_price_for(order.order_price);
            }
            Ok(order.clone())
        });
        finish(pending).await
    }

    async fn fetch_orders(
        &self,
        token: &SecretString,
        scope: OrderScope,
    ) -> Result<Vec<Order>, ApiError> {
        let pending = self.handle(Endpoint::FetchOrders, Some(token), |s| {
            let mine = token.expose_secret();
            Ok(s.orders
                .iter()
                .filter(|(_, owner)| scope == OrderScope::All || owner.as_deref() == Some(mine))
                .map(|(order, _)| order.clone())
                .collect())
        });
        finish(pending).await
    }

    async fn delete_order(&self, token: &SecretString, id: &OrderId) -> Result<(), ApiError> {
        let pending = self.handle(Endpoint::DeleteOrder, Some(token), |s| {
            let before = s.orders.len();
            s.orders.retain(|(order, _)| &order.id != id);
            if s.orders.len() == before {
                Err(order_not_found(id))
            } else {
                Ok(())
            }
        });
        finish(pending).await
    }

    async fn fetch_favorites(&self, token: &SecretString) -> Result<Vec<Favorite>, ApiError> {
        let pending = self.handle(Endpoint::FetchFavorites, Some(token), |s| {
            Ok(s.favorites
                .get(token.expose_secret())
                .cloned()
                .unwrap_or_default())
        });
        finish(pending).await
    }

    async fn add_favorite(&self, token: &SecretString, favorite: &Favorite) -> Result<(), ApiError> {
        let pending = self.handle(Endpoint::AddFavorite, Some(token), |s| {
            let list = s
                .favorites
                .entry(token.expose_secret().to_string())
                .or_default();
            if !list.iter().any(|f| f.product_id == favorite.product_id) {
                list.push(favorite.clone());
            }
            Ok(())
        });
        finish(pending).await
    }

    async fn remove_favorite(
        &self,
        token: &SecretString,
        product_id: ProductId,
    ) -> Result<(), ApiError> {
        let pending = self.handle(Endpoint::RemoveFavorite, Some(token), |s| {
            if s.failing_products.contains(&product_id) {
                return Err(ApiError::Api {
                    status: 500,
                    message: format!("favorite {product_id} is stuck"),
                });
            }
            if let Some(list) = s.favorites.get_mut(token.expose_secret()) {
                list.retain(|f| f.product_id != product_id);
            }
            Ok(())
        });
        finish(pending).await
    }

    async fn fetch_ratings(&self) -> Result<HashMap<ProductId, RatingSummary>, ApiError> {
        finish(self.handle(Endpoint::FetchRatings, None, |s| Ok(s.ratings.clone()))).await
    }

    async fn submit_rating(
        &self,
        token: &SecretString,
        submission: &RatingSubmission,
    ) -> Result<(), ApiError> {
        let pending = self.handle(Endpoint::SubmitRating, Some(token), |s| {
            s.submissions.push(submission.clone());
            Ok(())
        });
        finish(pending).await
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// A storefront over `api` with in-memory local storage.
#[must_use]
pub fn storefront(api: &FakeApi) -> Storefront<FakeApi> {
    storefront_with_storage(api, Storage::memory())
}

/// A storefront over `api` with the given local storage.
///
/// # Panics
///
/// Panics if the built-in test base URL fails to parse.
#[must_use]
pub fn storefront_with_storage(api: &FakeApi, storage: Storage) -> Storefront<FakeApi> {
    let config = StorefrontConfig::with_base_url("http://pizzeria.test/api/")
        .unwrap_or_else(|e| panic!("test config: {e}"));
    Storefront::new(config, api.clone(), storage)
}

/// A menu item priced in whole euros.
#[must_use]
pub fn menu_item(id: i32, name: &str, price: i64) -> MenuItem {
    MenuItem {
        id: ProductId::new(id),
        name: name.to_string(),
        unit_price: Decimal::new(price, 0),
        ingredients: Vec::new(),
        sold_out: false,
        image_url: None,
    }
}

/// A favorite snapshot of a menu item.
#[must_use]
pub fn favorite(id: i32, name: &str) -> Favorite {
    Favorite::from_menu_item(&menu_item(id, name, 12))
}

/// A signed-in user.
#[must_use]
pub fn user(id: i32, is_admin: bool) -> CurrentUser {
    CurrentUser {
        id: UserId::new(id),
        username: format!("user{id}"),
        is_admin,
    }
}

/// A delivery contact.
#[must_use]
pub fn customer() -> Customer {
    Customer {
        name: "Jonas".to_string(),
        phone: "555-0100".to_string(),
        address: "Via Roma 1".to_string(),
    }
}

/// A bearer token.
#[must_use]
pub fn token(raw: &str) -> SecretString {
    SecretString::from(raw)
}

/// A backend order with no line items, created now.
#[must_use]
pub fn order(id: &str, status: OrderStatus, price: i64) -> Order {
    let now = Utc::now();
    Order {
        id: OrderId::from(id),
        status,
        cart_snapshot: Vec::new(),
        order_price: Decimal::new(price, 0),
        priority_price: Decimal::ZERO,
        priority: false,
        estimated_delivery: now + Duration::minutes(30),
        customer: customer(),
        created_at: now,
    }
}

/// Yield until `endpoint` has been called `count` times.
pub async fn wait_for_calls(api: &FakeApi, endpoint: Endpoint, count: usize) {
    while api.calls(endpoint) < count {
        tokio::task::yield_now().await;
    }
}
