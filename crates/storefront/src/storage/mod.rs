//! Local persistent storage tier.
//!
//! The guest/fallback tier is a flat key/value store of JSON documents, the
//! same shape a browser's local storage has. Two backends exist:
//!
//! - [`MemoryStorage`] - process-local, used for tests and ephemeral sessions
//! - [`FileStorage`] - one JSON file per key inside a directory
//!
//! Entities never format keys themselves. A [`Store<O, E>`] binds a
//! [`Namespace`] to an entity type and derives the key from the owner, so
//! per-user partitioning (`pizzaRatings_<userId>`) lives in one place.
//!
//! Storage is a cache, not a requirement for correctness within a session:
//! [`Store::load`] and [`Store::save`] log failures and carry on.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors raised by a local storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored document could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend refused the operation (quota, permissions, ...).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A raw string key/value store.
pub trait LocalStorage: Send + Sync {
    /// Read the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete the document stored under `key`. Missing keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Top-level storage keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Guest favorites.
    Favorites,
    /// Global rating aggregates.
    GlobalRatings,
    /// One user's own ratings, partitioned per owner.
    UserRatings,
    /// Operator order ledger snapshot.
    AdminData,
    /// Session bearer token.
    Token,
    /// Signed-in user profile.
    User,
}

impl Namespace {
    /// Key prefix as stored.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Favorites => "favorites",
            Self::GlobalRatings => "globalPizzaRatings",
            Self::UserRatings => "pizzaRatings",
            Self::AdminData => "adminData",
            Self::Token => "token",
            Self::User => "user",
        }
    }
}

/// Partition part of a storage key.
///
/// `()` is the single shared owner (no suffix).
pub trait OwnerKey {
    /// Suffix appended to the namespace, or `None` for an unpartitioned key.
    fn suffix(&self) -> Option<String>;
}

impl OwnerKey for () {
    fn suffix(&self) -> Option<String> {
        None
    }
}

/// Cheaply cloneable handle to a storage backend.
#[derive(Clone)]
pub struct Storage {
    inner: Arc<dyn LocalStorage>,
}

impl Storage {
    /// Wrap a backend.
    #[must_use]
    pub fn new(backend: impl LocalStorage + 'static) -> Self {
        Self {
            inner: Arc::new(backend),
        }
    }

    /// A fresh in-memory backend.
    #[must_use]
    pub fn memory() -> Self {
        Self::new(MemoryStorage::default())
    }

    /// Access the raw backend.
    #[must_use]
    pub fn backend(&self) -> &dyn LocalStorage {
        self.inner.as_ref()
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}

/// Typed, owner-partitioned view over one storage namespace.
pub struct Store<O, E> {
    storage: Storage,
    namespace: Namespace,
    _marker: PhantomData<fn(&O) -> E>,
}

impl<O, E> Clone for Store<O, E> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            namespace: self.namespace,
            _marker: PhantomData,
        }
    }
}

impl<O, E> Store<O, E>
where
    O: OwnerKey,
    E: Serialize + DeserializeOwned,
{
    /// Bind `namespace` on `storage` to entity type `E`.
    #[must_use]
    pub fn new(storage: Storage, namespace: Namespace) -> Self {
        Self {
            storage,
            namespace,
            _marker: PhantomData,
        }
    }

    /// Storage key for `owner`.
    pub fn key(&self, owner: &O) -> String {
        match owner.suffix() {
            Some(suffix) => format!("{}_{suffix}", self.namespace.as_str()),
            None => self.namespace.as_str().to_string(),
        }
    }

    /// Read and decode the entity.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails or the document is corrupt.
    pub fn try_load(&self, owner: &O) -> Result<Option<E>, StorageError> {
        let key = self.key(owner);
        match self.storage.backend().get(&key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Encode and write the entity.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if encoding or the backend write fails.
    pub fn try_save(&self, owner: &O, value: &E) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)?;
        self.storage.backend().set(&self.key(owner), &raw)
    }

    /// Read the entity, logging and returning `None` on any failure.
    pub fn load(&self, owner: &O) -> Option<E> {
        self.try_load(owner).unwrap_or_else(|e| {
            tracing::warn!(
                error = %e,
                key = %self.key(owner),
                "Local storage read failed, continuing without cached data"
            );
            None
        })
    }

    /// Write the entity, logging on failure.
    pub fn save(&self, owner: &O, value: &E) {
        if let Err(e) = self.try_save(owner, value) {
            tracing::warn!(
                error = %e,
                key = %self.key(owner),
                "Local storage write failed, keeping in-memory state only"
            );
        }
    }

    /// Delete the entity, logging on failure.
    pub fn clear(&self, owner: &O) {
        let key = self.key(owner);
        if let Err(e) = self.storage.backend().remove(&key) {
            tracing::warn!(error = %e, key = %key, "Local storage delete failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct Tenant(u32);

    impl OwnerKey for Tenant {
        fn suffix(&self) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    struct BrokenStorage;

    impl LocalStorage for BrokenStorage {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("quota exceeded".to_string()))
        }
    }

    #[test]
    fn test_key_partitioning() {
        let store: Store<Tenant, Vec<u8>> = Store::new(Storage::memory(), Namespace::UserRatings);
        assert_eq!(store.key(&Tenant(42)), "pizzaRatings_42");

        let shared: Store<(), Vec<u8>> = Store::new(Storage::memory(), Namespace::Favorites);
        assert_eq!(shared.key(&()), "favorites");
    }

    #[test]
    fn test_owners_do_not_bleed() {
        let store: Store<Tenant, Vec<u8>> = Store::new(Storage::memory(), Namespace::UserRatings);
        store.save(&Tenant(1), &vec![1, 2, 3]);

        assert_eq!(store.load(&Tenant(1)), Some(vec![1, 2, 3]));
        assert_eq!(store.load(&Tenant(2)), None);
    }

    #[test]
    fn test_corrupt_document_loads_as_none() {
        let storage = Storage::memory();
        storage.backend().set("adminData", "{not json").unwrap();

        let store: Store<(), Vec<u8>> = Store::new(storage, Namespace::AdminData);
        assert!(store.try_load(&()).is_err());
        assert_eq!(store.load(&()), None);
    }

    #[test]
    fn test_broken_backend_is_logged_not_fatal() {
        let store: Store<(), Vec<u8>> = Store::new(Storage::new(BrokenStorage), Namespace::Token);
        store.save(&(), &vec![1]);
        assert_eq!(store.load(&()), None);
        store.clear(&());
    }
}
