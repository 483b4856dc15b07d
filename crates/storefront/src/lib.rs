//! Pizzeria storefront synchronization engine.
//!
//! Keeps the client-side view of a pizza storefront consistent with the
//! backend: cart, ratings, favorites, order history and the operator
//! ledger. [`Storefront`] is the entry point; every store is also usable on
//! its own.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod config;
pub mod error;
pub mod favorites;
pub mod menu;
pub mod models;
pub mod orders;
pub mod ratings;
pub mod session;
pub mod state;
pub mod storage;
pub mod tier;

pub use api::{ApiClient, ApiError, OrderScope, StoreApi};
pub use cart::{Cart, SharedCart};
pub use config::{ConfigError, StorefrontConfig};
pub use error::{Result, SyncError};
pub use favorites::{FavoritesStore, Toggled};
pub use menu::MenuSort;
pub use orders::{AdminLedger, AdminStats, HistoryLedger, OrderService};
pub use ratings::{RatingAggregate, RatingBook, RatingService, SubmittedRating};
pub use session::{Identity, Owner, SessionStatus, SessionStore};
pub use state::{Storefront, StorefrontInitError};
pub use storage::{FileStorage, LocalStorage, MemoryStorage, Storage, StorageError};
