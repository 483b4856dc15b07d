//! Engine state shared across callers.

use std::sync::Arc;

use secrecy::SecretString;

use pizzeria_core::{OrderId, OrderStatus, ProductId};

use crate::api::{ApiClient, ApiError, StoreApi};
use crate::cart::SharedCart;
use crate::config::StorefrontConfig;
use crate::error::{Result, SyncError};
use crate::favorites::{FavoritesStore, Toggled};
use crate::menu::{MenuSort, sort_menu};
use crate::models::{CurrentUser, Customer, Favorite, MenuItem, Order};
use crate::orders::{AdminStats, OrderService};
use crate::ratings::{RatingService, SubmittedRating};
use crate::session::{Identity, SessionStore};
use crate::storage::{FileStorage, Storage, StorageError};

/// Error building a [`Storefront`] from configuration.
#[derive(Debug, thiserror::Error)]
pub enum StorefrontInitError {
    #[error("api client: {0}")]
    Api(#[from] ApiError),
    #[error("local storage: {0}")]
    Storage(#[from] StorageError),
}

/// The synchronization engine.
///
/// This struct is cheaply cloneable via `Arc`; clones share every ledger.
/// Each operation reads the current [`Identity`] from the session at call
/// time. A backend rejection of the session token (HTTP 401) tears the
/// session down before the error is returned, unless the session has moved
/// on to another token while the call was in flight.
pub struct Storefront<A = ApiClient> {
    inner: Arc<StorefrontInner<A>>,
}

impl<A> Clone for Storefront<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct StorefrontInner<A> {
    config: StorefrontConfig,
    api: Arc<A>,
    storage: Storage,
    session: SessionStore,
    cart: SharedCart,
    ratings: RatingService<A>,
    favorites: FavoritesStore<A>,
    orders: OrderService<A>,
}

impl Storefront<ApiClient> {
    /// Build the engine over HTTP with the configured local storage tier.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the storage
    /// directory cannot be created.
    pub fn from_config(config: StorefrontConfig) -> std::result::Result<Self, StorefrontInitError> {
        let api = ApiClient::new(&config.api)?;
        let storage = match &config.storage_dir {
            Some(dir) => Storage::new(FileStorage::open(dir)?),
            None => Storage::memory(),
        };
        Ok(Self::new(config, api, storage))
    }
}

impl<A: StoreApi> Storefront<A> {
    /// Assemble the engine, restoring the persisted session and the local
    /// data belonging to it.
    #[must_use]
    pub fn new(config: StorefrontConfig, api: A, storage: Storage) -> Self {
        let api = Arc::new(api);
        let session = SessionStore::restore(&storage);
        let identity = session.identity();

        let ratings = RatingService::new(Arc::clone(&api), storage.clone(), &identity);
        let favorites = FavoritesStore::new(Arc::clone(&api), storage.clone(), &identity);
        let orders = OrderService::new(
            Arc::clone(&api),
            &storage,
            config.history_limit,
            &identity,
        );

        Self {
            inner: Arc::new(StorefrontInner {
                config,
                api,
                storage,
                session,
                cart: SharedCart::new(),
                ratings,
                favorites,
                orders,
            }),
        }
    }

    /// Get a reference to the engine configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the backend API.
    #[must_use]
    pub fn api(&self) -> &A {
        &self.inner.api
    }

    /// Get a reference to the local storage tier.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.inner.storage
    }

    /// Get a reference to the session store.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    /// Current identity.
    #[must_use]
    pub fn identity(&self) -> Identity {
        self.inner.session.identity()
    }

    /// Get a reference to the cart.
    #[must_use]
    pub fn cart(&self) -> &SharedCart {
        &self.inner.cart
    }

    /// Get a reference to the rating service.
    #[must_use]
    pub fn ratings(&self) -> &RatingService<A> {
        &self.inner.ratings
    }

    /// Get a reference to the favorites store.
    #[must_use]
    pub fn favorites(&self) -> &FavoritesStore<A> {
        &self.inner.favorites
    }

    /// Get a reference to the order service.
    #[must_use]
    pub fn orders(&self) -> &OrderService<A> {
        &self.inner.orders
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Switch to a signed-in identity.
    ///
    /// Reloads the user's own ratings, empties the order history and
    /// replaces favorites with the backend's list. Guest favorites and
    /// ratings are not carried over.
    ///
    /// # Errors
    ///
    /// Returns the favorites fetch error. The session stays signed in unless
    /// the backend rejected the token.
    pub async fn sign_in(&self, token: SecretString, user: CurrentUser) -> Result<()> {
        let identity = self.inner.session.sign_in(token, user);
        self.reload_local(&identity);
        let result = self.inner.favorites.fetch(&identity).await;
        self.guard(&identity, result)
    }

    /// Switch back to a guest identity.
    pub fn sign_out(&self) {
        let identity = self.inner.session.sign_out();
        self.reload_local(&identity);
    }

    fn reload_local(&self, identity: &Identity) {
        self.inner.ratings.reload_for_identity(identity);
        self.inner.favorites.reset(identity);
        self.inner.orders.reset_history(identity);
    }

    /// Tear the session down if the backend rejected the token the call was
    /// issued with and that token is still the session's.
    fn guard<T>(&self, issued_as: &Identity, result: Result<T>) -> Result<T> {
        if let Err(SyncError::Unauthorized) = &result
            && let Some(token) = issued_as.token()
            && self.inner.session.expire(token)
        {
            self.reload_local(&Identity::guest());
        }
        result
    }

    // =========================================================================
    // Menu & ratings
    // =========================================================================

    /// Fetch the menu and order it.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the backend call fails.
    pub async fn fetch_menu(&self, sort: MenuSort) -> Result<Vec<MenuItem>> {
        let mut menu = self.inner.api.fetch_menu().await?;
        sort_menu(&mut menu, sort, |id| self.inner.ratings.average(id));
        Ok(menu)
    }

    /// Merge the backend's rating aggregates.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the backend call fails.
    pub async fn fetch_ratings(&self) -> Result<()> {
        self.inner.ratings.fetch().await
    }

    /// Rate a product as the current identity.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Validation` for a rating outside `1..=5`.
    pub fn rate(&self, product_id: ProductId, rating: u8, review: &str) -> Result<SubmittedRating> {
        self.inner
            .ratings
            .submit(&self.identity(), product_id, rating, review)
    }

    /// Withdraw the current identity's rating of a product.
    pub fn unrate(&self, product_id: ProductId) -> bool {
        self.inner.ratings.remove(&self.identity(), product_id)
    }

    // =========================================================================
    // Favorites
    // =========================================================================

    /// Replace favorites with the current tier's list.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the backend call fails.
    pub async fn fetch_favorites(&self) -> Result<()> {
        let identity = self.identity();
        let result = self.inner.favorites.fetch(&identity).await;
        self.guard(&identity, result)
    }

    /// Add or remove a favorite.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the backend rejects the change.
    pub async fn toggle_favorite(&self, favorite: Favorite) -> Result<Toggled> {
        let identity = self.identity();
        let result = self.inner.favorites.toggle(&identity, favorite).await;
        self.guard(&identity, result)
    }

    /// Remove every favorite.
    ///
    /// # Errors
    ///
    /// Returns the first removal failure.
    pub async fn clear_favorites(&self) -> Result<()> {
        let identity = self.identity();
        let result = self.inner.favorites.clear(&identity).await;
        self.guard(&identity, result)
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Check out the shared cart.
    ///
    /// # Errors
    ///
    /// See [`OrderService::place_order`].
    pub async fn place_order(&self, customer: Customer, priority: bool) -> Result<Order> {
        let identity = self.identity();
        let result = self
            .inner
            .orders
            .place_order(&identity, &self.inner.cart, customer, priority)
            .await;
        self.guard(&identity, result)
    }

    /// Fetch one order.
    ///
    /// # Errors
    ///
    /// See [`OrderService::fetch_order`].
    pub async fn fetch_order(&self, id: &OrderId) -> Result<Order> {
        let identity = self.identity();
        let result = self.inner.orders.fetch_order(&identity, id).await;
        self.guard(&identity, result)
    }

    /// Mark an order as priority.
    ///
    /// # Errors
    ///
    /// See [`OrderService::upgrade_priority`].
    pub async fn upgrade_priority(&self, id: &OrderId) -> Result<Order> {
        let identity = self.identity();
        let result = self.inner.orders.upgrade_priority(&identity, id).await;
        self.guard(&identity, result)
    }

    /// Refresh the order history.
    ///
    /// # Errors
    ///
    /// See [`OrderService::fetch_history`].
    pub async fn fetch_history(&self) -> Result<Vec<Order>> {
        let identity = self.identity();
        let result = self.inner.orders.fetch_history(&identity).await;
        self.guard(&identity, result)
    }

    /// Refresh the admin ledger.
    ///
    /// # Errors
    ///
    /// See [`OrderService::fetch_admin`].
    pub async fn fetch_admin(&self) -> Result<AdminStats> {
        let identity = self.identity();
        let result = self.inner.orders.fetch_admin(&identity).await;
        self.guard(&identity, result)
    }

    /// Set an order's status as an operator.
    ///
    /// # Errors
    ///
    /// See [`OrderService::update_status_admin`].
    pub async fn update_status_admin(&self, id: &OrderId, status: OrderStatus) -> Result<Order> {
        let identity = self.identity();
        let result = self
            .inner
            .orders
            .update_status_admin(&identity, id, status)
            .await;
        self.guard(&identity, result)
    }

    /// Delete an order as an operator.
    ///
    /// # Errors
    ///
    /// See [`OrderService::delete_admin`].
    pub async fn delete_admin(&self, id: &OrderId) -> Result<()> {
        let identity = self.identity();
        let result = self.inner.orders.delete_admin(&identity, id).await;
        self.guard(&identity, result)
    }
}
