//! Rating service: optimistic local aggregation plus backend publication.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio::task::JoinHandle;

use pizzeria_core::ProductId;

use super::aggregate::{RatingAggregate, RatingBook, UserRating, UserRatings};
use crate::api::StoreApi;
use crate::error::{Result, SyncError};
use crate::models::RatingSubmission;
use crate::session::{Identity, Owner};
use crate::storage::{Namespace, Storage, Store};
use crate::tier::{RemoteTier, Tier};

/// Where a submitted rating is published after the local update.
pub trait RatingSync: Send + Sync {
    /// Publish one rating.
    fn publish(&self, submission: &RatingSubmission)
    -> impl Future<Output = Result<()>> + Send;
}

impl<A: StoreApi> RatingSync for RemoteTier<A> {
    async fn publish(&self, submission: &RatingSubmission) -> Result<()> {
        self.api.submit_rating(&self.token, submission).await?;
        Ok(())
    }
}

/// Result of [`RatingService::submit`].
#[derive(Debug)]
pub struct SubmittedRating {
    /// Aggregate after the optimistic update.
    pub aggregate: RatingAggregate,
    /// Background publication, when the identity is authenticated.
    ///
    /// Dropping the handle detaches the task; it still runs.
    pub sync: Option<JoinHandle<()>>,
}

struct Mine {
    owner: Owner,
    ratings: UserRatings,
}

/// Global aggregates and the current identity's own ratings.
pub struct RatingService<A> {
    api: Arc<A>,
    storage: Storage,
    global_store: Store<(), RatingBook>,
    user_store: Store<Owner, UserRatings>,
    global: Mutex<RatingBook>,
    mine: Mutex<Mine>,
}

impl<A: StoreApi> RatingService<A> {
    /// Load both stores from local storage for `identity`.
    #[must_use]
    pub fn new(api: Arc<A>, storage: Storage, identity: &Identity) -> Self {
        let global_store: Store<(), RatingBook> =
            Store::new(storage.clone(), Namespace::GlobalRatings);
        let user_store: Store<Owner, UserRatings> =
            Store::new(storage.clone(), Namespace::UserRatings);

        let owner = identity.owner();
        let global = global_store.load(&()).unwrap_or_default();
        let ratings = user_store.load(&owner).unwrap_or_default();

        Self {
            api,
            storage,
            global_store,
            user_store,
            global: Mutex::new(global),
            mine: Mutex::new(Mine { owner, ratings }),
        }
    }

    /// Rate a product as `identity`.
    ///
    /// Updates both stores and local storage synchronously. When `identity`
    /// carries a token, the rating is then posted to the backend on a
    /// spawned task; a failure there is logged and local state is kept.
    ///
    /// # Errors
    ///
    /// - `SyncError::Validation` if `rating` is outside `1..=5`, or if the
    ///   user ratings are loaded for a different identity (call
    ///   [`Self::reload_for_identity`] first)
    pub fn submit(
        &self,
        identity: &Identity,
        product_id: ProductId,
        rating: u8,
        review: &str,
    ) -> Result<SubmittedRating> {
        let owner = identity.owner();
        let date = Utc::now();

        {
            let mine = self.mine.lock().unwrap_or_else(PoisonError::into_inner);
            if mine.owner != owner {
                return Err(SyncError::Validation(
                    "ratings are loaded for a different identity".to_string(),
                ));
            }
        }

        let aggregate = {
            let mut global = self.global.lock().unwrap_or_else(PoisonError::into_inner);
            let aggregate = global
                .submit(product_id, identity.user_id(), rating, review, date)?
                .clone();
            self.global_store.save(&(), &global);
            aggregate
        };

        {
            let mut mine = self.mine.lock().unwrap_or_else(PoisonError::into_inner);
            mine.ratings.set(
                product_id,
                UserRating {
                    rating,
                    review: review.to_string(),
                    date,
                },
            );
            self.user_store.save(&owner, &mine.ratings);
        }

        let submission = RatingSubmission {
            product_id,
            rating,
            review: review.to_string(),
        };
        // Guests are already persisted under their owner key.
        let sync = match Tier::select(identity, &self.storage, &self.api) {
            Tier::Remote(remote) => spawn_publish(remote, submission),
            Tier::Local(_) => None,
        };

        Ok(SubmittedRating { aggregate, sync })
    }

    /// Withdraw `identity`'s rating of a product.
    ///
    /// Local only; the backend exposes no rating deletion. Returns whether a
    /// rating was removed.
    pub fn remove(&self, identity: &Identity, product_id: ProductId) -> bool {
        let owner = identity.owner();

        let removed = {
            let mut global = self.global.lock().unwrap_or_else(PoisonError::into_inner);
            let removed = global.remove(product_id, identity.user_id());
            if removed {
                self.global_store.save(&(), &global);
            }
            removed
        };

        let mut mine = self.mine.lock().unwrap_or_else(PoisonError::into_inner);
        if mine.owner == owner && mine.ratings.remove(product_id) {
            self.user_store.save(&owner, &mine.ratings);
        }

        removed
    }

    /// Fetch backend aggregates and merge them into the global book.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the backend call fails; the book is unchanged.
    pub async fn fetch(&self) -> Result<()> {
        let summaries = self.api.fetch_ratings().await?;

        let mut global = self.global.lock().unwrap_or_else(PoisonError::into_inner);
        global.merge_from_backend(&summaries);
        self.global_store.save(&(), &global);
        tracing::debug!(products = summaries.len(), "Merged backend ratings");
        Ok(())
    }

    /// Replace the user-scoped ratings with those persisted for `identity`.
    pub fn reload_for_identity(&self, identity: &Identity) {
        let owner = identity.owner();
        let ratings = self.user_store.load(&owner).unwrap_or_default();

        let mut mine = self.mine.lock().unwrap_or_else(PoisonError::into_inner);
        *mine = Mine { owner, ratings };
    }

    /// Global aggregate for a product.
    #[must_use]
    pub fn aggregate(&self, product_id: ProductId) -> Option<RatingAggregate> {
        self.global
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(product_id)
            .cloned()
    }

    /// Mean rating of a product.
    #[must_use]
    pub fn average(&self, product_id: ProductId) -> Option<f64> {
        self.global
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .average(product_id)
    }

    /// Copy of the global book.
    #[must_use]
    pub fn book(&self) -> RatingBook {
        self.global
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The loaded identity's own rating of a product.
    #[must_use]
    pub fn user_rating(&self, product_id: ProductId) -> Option<UserRating> {
        self.mine
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .ratings
            .get(product_id)
            .cloned()
    }

    /// Owner the user-scoped ratings are loaded for.
    #[must_use]
    pub fn loaded_owner(&self) -> Owner {
        self.mine.lock().unwrap_or_else(PoisonError::into_inner).owner
    }
}

fn spawn_publish<A: StoreApi>(
    remote: RemoteTier<A>,
    submission: RatingSubmission,
) -> Option<JoinHandle<()>> {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        tracing::warn!(
            product_id = %submission.product_id,
            "No async runtime, rating kept locally without publishing"
        );
        return None;
    };

    Some(runtime.spawn(async move {
        if let Err(e) = remote.publish(&submission).await {
            tracing::warn!(
                error = %e,
                product_id = %submission.product_id,
                "Rating sync failed, keeping local rating"
            );
        }
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use pizzeria_core::UserId;

    use super::*;
    use crate::api::ApiClient;
    use crate::config::StorefrontConfig;
    use crate::models::CurrentUser;

    const P: ProductId = ProductId::new(7);

    fn service(storage: &Storage, identity: &Identity) -> RatingService<ApiClient> {
        let config = StorefrontConfig::with_base_url("http://127.0.0.1:9/").unwrap();
        let api = Arc::new(ApiClient::new(&config.api).unwrap());
        RatingService::new(api, storage.clone(), identity)
    }

    fn user(id: i32) -> Identity {
        Identity::authenticated(
            SecretString::from("tok"),
            CurrentUser {
                id: UserId::new(id),
                username: format!("user{id}"),
                is_admin: false,
            },
        )
    }

    #[test]
    fn test_guest_submit_persists_both_stores() {
        let storage = Storage::memory();
        let guest = Identity::guest();
        let ratings = service(&storage, &guest);

        let submitted = ratings.submit(&guest, P, 4, "crispy").unwrap();
        assert!(submitted.sync.is_none());
        assert_eq!(submitted.aggregate.count(), 1);

        let reloaded = service(&storage, &guest);
        assert!(reloaded.aggregate(P).is_some());
        assert_eq!(reloaded.user_rating(P).unwrap().rating, 4);
    }

    #[test]
    fn test_rejected_rating_changes_nothing() {
        let storage = Storage::memory();
        let guest = Identity::guest();
        let ratings = service(&storage, &guest);

        assert!(matches!(
            ratings.submit(&guest, P, 9, ""),
            Err(SyncError::Validation(_))
        ));
        assert!(ratings.aggregate(P).is_none());
        assert!(ratings.user_rating(P).is_none());
    }

    #[test]
    fn test_submit_for_unloaded_identity_is_rejected() {
        let storage = Storage::memory();
        let ratings = service(&storage, &Identity::guest());

        assert!(ratings.submit(&user(1), P, 4, "").is_err());
        assert!(ratings.aggregate(P).is_none());
    }

    #[test]
    fn test_reload_switches_user_partition() {
        let storage = Storage::memory();
        let guest = Identity::guest();
        let ratings = service(&storage, &guest);
        ratings.submit(&guest, P, 5, "").unwrap();

        let alice = user(1);
        ratings.reload_for_identity(&alice);
        assert_eq!(ratings.loaded_owner(), Owner::User(UserId::new(1)));
        assert!(ratings.user_rating(P).is_none());
        // The global aggregate is shared across identities.
        assert_eq!(ratings.aggregate(P).unwrap().count(), 1);
    }

    #[test]
    fn test_remove_unrated_product_is_noop() {
        let storage = Storage::memory();
        let guest = Identity::guest();
        let ratings = service(&storage, &guest);

        assert!(!ratings.remove(&guest, P));
        ratings.submit(&guest, P, 3, "").unwrap();
        assert!(ratings.remove(&guest, P));
        assert!(ratings.aggregate(P).is_none());
        assert!(ratings.user_rating(P).is_none());
    }

    #[test]
    fn test_authenticated_submit_without_runtime_keeps_local_state() {
        let storage = Storage::memory();
        let alice = user(1);
        let ratings = service(&storage, &alice);

        let submitted = ratings.submit(&alice, P, 2, "").unwrap();
        assert!(submitted.sync.is_none());
        assert_eq!(ratings.user_rating(P).unwrap().rating, 2);
    }
}
