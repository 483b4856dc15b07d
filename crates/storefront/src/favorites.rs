//! Favorites with dual persistence.
//!
//! Guests keep favorites in local storage under `favorites`; signed-in users
//! keep them on the backend. The tier is chosen per operation from the
//! [`Identity`]. Remote mutations await the backend and then apply to the
//! list as it is at that moment, so overlapping operations never restore a
//! stale snapshot. The list remembers which owner it was loaded for; a result
//! that lands after an identity switch is dropped.

use std::collections::HashSet;
use std::future::{Future, ready};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::join_all;

use pizzeria_core::ProductId;

use crate::api::StoreApi;
use crate::error::{Result, SyncError};
use crate::models::Favorite;
use crate::session::{Identity, Owner};
use crate::storage::{Namespace, Storage, Store};
use crate::tier::{LocalTier, RemoteTier, Tier};

/// Persistence for one identity's favorites.
pub trait FavoritesBackend: Send + Sync {
    /// Read the full list.
    fn load(&self) -> impl Future<Output = Result<Vec<Favorite>>> + Send;

    /// Persist one added favorite.
    fn add(&self, favorite: &Favorite) -> impl Future<Output = Result<()>> + Send;

    /// Persist one removal.
    fn remove(&self, product_id: ProductId) -> impl Future<Output = Result<()>> + Send;
}

impl LocalTier {
    fn favorites(&self) -> Store<(), Vec<Favorite>> {
        Store::new(self.storage.clone(), Namespace::Favorites)
    }
}

// Local writes are synchronous; the futures are ready immediately.
impl FavoritesBackend for LocalTier {
    fn load(&self) -> impl Future<Output = Result<Vec<Favorite>>> + Send {
        ready(Ok(self.favorites().load(&()).unwrap_or_default()))
    }

    fn add(&self, favorite: &Favorite) -> impl Future<Output = Result<()>> + Send {
        let store = self.favorites();
        let mut list = store.load(&()).unwrap_or_default();
        if !list.iter().any(|f| f.product_id == favorite.product_id) {
            list.push(favorite.clone());
            store.save(&(), &list);
        }
        ready(Ok(()))
    }

    fn remove(&self, product_id: ProductId) -> impl Future<Output = Result<()>> + Send {
        let store = self.favorites();
        let mut list = store.load(&()).unwrap_or_default();
        list.retain(|f| f.product_id != product_id);
        store.save(&(), &list);
        ready(Ok(()))
    }
}

impl<A: StoreApi> FavoritesBackend for RemoteTier<A> {
    async fn load(&self) -> Result<Vec<Favorite>> {
        Ok(self.api.fetch_favorites(&self.token).await?)
    }

    async fn add(&self, favorite: &Favorite) -> Result<()> {
        Ok(self.api.add_favorite(&self.token, favorite).await?)
    }

    async fn remove(&self, product_id: ProductId) -> Result<()> {
        Ok(self.api.remove_favorite(&self.token, product_id).await?)
    }
}

impl<A: StoreApi> FavoritesBackend for Tier<A> {
    async fn load(&self) -> Result<Vec<Favorite>> {
        match self {
            Self::Local(local) => local.load().await,
            Self::Remote(remote) => remote.load().await,
        }
    }

    async fn add(&self, favorite: &Favorite) -> Result<()> {
        match self {
            Self::Local(local) => local.add(favorite).await,
            Self::Remote(remote) => remote.add(favorite).await,
        }
    }

    async fn remove(&self, product_id: ProductId) -> Result<()> {
        match self {
            Self::Local(local) => local.remove(product_id).await,
            Self::Remote(remote) => remote.remove(product_id).await,
        }
    }
}

/// What [`FavoritesStore::toggle`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggled {
    Added,
    Removed,
}

/// In-memory favorites list for the current identity.
pub struct FavoritesStore<A> {
    api: Arc<A>,
    storage: Storage,
    loaded: Mutex<Loaded>,
}

struct Loaded {
    owner: Owner,
    items: Vec<Favorite>,
}

impl<A: StoreApi> FavoritesStore<A> {
    /// Create the store, loading guest favorites from local storage.
    ///
    /// Signed-in identities start empty until [`Self::fetch`] completes.
    #[must_use]
    pub fn new(api: Arc<A>, storage: Storage, identity: &Identity) -> Self {
        let store = Self {
            api,
            storage,
            loaded: Mutex::new(Loaded {
                owner: Owner::Guest,
                items: Vec::new(),
            }),
        };
        store.reset(identity);
        store
    }

    /// Drop the in-memory list and reload what is available without a
    /// backend call: guest favorites from local storage, nothing otherwise.
    pub fn reset(&self, identity: &Identity) {
        let items = if identity.is_authenticated() {
            Vec::new()
        } else {
            Store::<(), Vec<Favorite>>::new(self.storage.clone(), Namespace::Favorites)
                .load(&())
                .unwrap_or_default()
        };
        *self.lock() = Loaded {
            owner: identity.owner(),
            items,
        };
    }

    fn tier(&self, identity: &Identity) -> Tier<A> {
        Tier::select(identity, &self.storage, &self.api)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Loaded> {
        self.loaded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` to the list if it still belongs to `identity`.
    fn apply(&self, identity: &Identity, f: impl FnOnce(&mut Vec<Favorite>)) {
        let mut loaded = self.lock();
        if loaded.owner == identity.owner() {
            f(&mut loaded.items);
        } else {
            tracing::debug!("Dropping favorites result for a previous identity");
        }
    }

    /// Replace the list with the tier's copy.
    ///
    /// Overlapping fetches are not cancelled; whichever completes last wins.
    /// A fetch that completes after the identity changed is discarded.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the backend call fails; the list is unchanged.
    pub async fn fetch(&self, identity: &Identity) -> Result<()> {
        let list = self.tier(identity).load().await?;
        tracing::debug!(count = list.len(), "Favorites fetched");
        self.apply(identity, |items| *items = list);
        Ok(())
    }

    /// Add `favorite` if absent, remove it if present.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the backend rejects the change; the list is
    /// unchanged in that case.
    pub async fn toggle(&self, identity: &Identity, favorite: Favorite) -> Result<Toggled> {
        let product_id = favorite.product_id;
        let tier = self.tier(identity);

        if self.contains(product_id) {
            tier.remove(product_id).await?;
            self.apply(identity, |items| items.retain(|f| f.product_id != product_id));
            Ok(Toggled::Removed)
        } else {
            tier.add(&favorite).await?;
            self.apply(identity, |items| {
                if !items.iter().any(|f| f.product_id == product_id) {
                    items.push(favorite);
                }
            });
            Ok(Toggled::Added)
        }
    }

    /// Remove every favorite.
    ///
    /// Removals are issued concurrently. Those that succeed leave the list;
    /// the first failure (if any) is returned and nothing is rolled back.
    ///
    /// # Errors
    ///
    /// Returns the first `SyncError` among the removals.
    pub async fn clear(&self, identity: &Identity) -> Result<()> {
        let tier = self.tier(identity);
        let ids: Vec<ProductId> = self.list().iter().map(|f| f.product_id).collect();

        let results = join_all(ids.iter().map(|&id| {
            let tier = &tier;
            async move { (id, tier.remove(id).await) }
        }))
        .await;

        let mut removed = HashSet::new();
        let mut first_error: Option<SyncError> = None;
        for (id, result) in results {
            match result {
                Ok(()) => {
                    removed.insert(id);
                }
                Err(e) => {
                    tracing::warn!(error = %e, product_id = %id, "Favorite removal failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        self.apply(identity, |items| {
            items.retain(|f| !removed.contains(&f.product_id));
        });

        first_error.map_or(Ok(()), Err)
    }

    /// Copy of the current list.
    #[must_use]
    pub fn list(&self) -> Vec<Favorite> {
        self.lock().items.clone()
    }

    /// Whether a product is a favorite.
    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.lock()
            .items
            .iter()
            .any(|f| f.product_id == product_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;
    use crate::api::ApiClient;
    use crate::config::StorefrontConfig;

    fn store(storage: &Storage) -> FavoritesStore<ApiClient> {
        let config = StorefrontConfig::with_base_url("http://127.0.0.1:9/").unwrap();
        let api = Arc::new(ApiClient::new(&config.api).unwrap());
        FavoritesStore::new(api, storage.clone(), &Identity::guest())
    }

    fn favorite(id: i32) -> Favorite {
        Favorite {
            product_id: ProductId::new(id),
            name: format!("Pizza {id}"),
            unit_price: Decimal::new(12, 0),
            image_url: None,
            added_at: Utc::now(),
        }
    }

    fn signed_in(id: i32) -> Identity {
        Identity::authenticated(
            secrecy::SecretString::from("tok"),
            crate::models::CurrentUser {
                id: pizzeria_core::UserId::new(id),
                username: "ada".to_string(),
                is_admin: false,
            },
        )
    }

    #[tokio::test]
    async fn test_guest_toggle_round_trips_through_local_storage() {
        let storage = Storage::memory();
        let guest = Identity::guest();
        let favorites = store(&storage);

        assert_eq!(
            favorites.toggle(&guest, favorite(1)).await.unwrap(),
            Toggled::Added
        );
        assert!(favorites.contains(ProductId::new(1)));
        assert_eq!(store(&storage).list().len(), 1);

        assert_eq!(
            favorites.toggle(&guest, favorite(1)).await.unwrap(),
            Toggled::Removed
        );
        assert!(store(&storage).list().is_empty());
    }

    #[tokio::test]
    async fn test_guest_clear_empties_both() {
        let storage = Storage::memory();
        let guest = Identity::guest();
        let favorites = store(&storage);
        favorites.toggle(&guest, favorite(1)).await.unwrap();
        favorites.toggle(&guest, favorite(2)).await.unwrap();

        favorites.clear(&guest).await.unwrap();

        assert!(favorites.list().is_empty());
        assert!(store(&storage).list().is_empty());
    }

    #[tokio::test]
    async fn test_reset_and_fetch_read_local_tier() {
        let storage = Storage::memory();
        let guest = Identity::guest();
        store(&storage).toggle(&guest, favorite(3)).await.unwrap();

        let favorites = store(&storage);
        assert!(favorites.contains(ProductId::new(3)));

        favorites.reset(&signed_in(1));
        assert!(favorites.list().is_empty());

        favorites.reset(&guest);
        favorites.fetch(&guest).await.unwrap();
        assert!(favorites.contains(ProductId::new(3)));
    }

    #[tokio::test]
    async fn test_result_for_previous_identity_is_dropped() {
        let storage = Storage::memory();
        let guest = Identity::guest();
        store(&storage).toggle(&guest, favorite(3)).await.unwrap();

        let favorites = store(&storage);
        favorites.reset(&signed_in(1));

        // A guest fetch resolving after the switch must not leak guest data.
        favorites.fetch(&guest).await.unwrap();
        assert!(favorites.list().is_empty());

        favorites.toggle(&guest, favorite(4)).await.unwrap();
        assert!(!favorites.contains(ProductId::new(4)));
    }
}
