//! Rating aggregation.
//!
//! Two parallel stores:
//!
//! - [`RatingBook`] - the global per-product aggregate (sum, count, mean and
//!   one review per user), merged with the backend's authoritative numbers
//! - [`UserRatings`] - only the current identity's own ratings, partitioned
//!   per owner in local storage and reloaded (never merged) when the identity
//!   changes
//!
//! [`RatingService`] applies submissions optimistically to both, persists
//! them locally, and publishes to the backend fire-and-forget.

mod aggregate;
mod service;

pub use aggregate::{RatingAggregate, RatingBook, UserRating, UserRatings};
pub use service::{RatingService, RatingSync, SubmittedRating};
