//! Domain models for the storefront engine.
//!
//! Wire-compatible with the backend's JSON (camelCase field names) and with
//! the documents kept in local storage.

pub mod cart;
pub mod favorite;
pub mod menu;
pub mod order;
pub mod rating;
pub mod session;

pub use cart::CartLine;
pub use favorite::Favorite;
pub use menu::MenuItem;
pub use order::{Customer, NewOrder, Order, OrderUpdate};
pub use rating::{RatingSubmission, RatingSummary, Review};
pub use session::CurrentUser;
