//! Backend API contract and HTTP client.
//!
//! # Architecture
//!
//! - [`StoreApi`] is the minimum surface the engine depends on; stores are
//!   generic over it so tests can script a fake backend
//! - [`ApiClient`] implements it over `reqwest` with JSON bodies
//! - The menu is cached in memory via `moka` (TTL from configuration)
//! - Authenticated calls carry `Authorization: Bearer <token>`
//!
//! # Endpoints
//!
//! | Method | Path | Purpose |
//! |---|---|---|
//! | GET | `/menu` | Products (`price` renamed to `unitPrice`) |
//! | POST | `/orders` | Place an order |
//! | GET | `/orders`, `/orders?scope=all` | User history, operator ledger |
//! | GET/PATCH/DELETE | `/orders/:id` | Order lifecycle |
//! | GET/POST | `/favorites`, DELETE `/favorites/:productId` | Per-user favorites |
//! | GET/POST | `/ratings` | Aggregates and per-user submission |

mod cache;
mod client;

pub use client::ApiClient;

use std::collections::HashMap;
use std::future::Future;

use secrecy::SecretString;
use thiserror::Error;

use pizzeria_core::{OrderId, ProductId};

use crate::models::{
    Favorite, MenuItem, NewOrder, Order, OrderUpdate, RatingSubmission, RatingSummary,
};

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Bearer token missing, expired or rejected (HTTP 401).
    #[error("Unauthorized")]
    Unauthorized,

    /// Resource not found (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Response body did not match the contract.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Which orders `GET /orders` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    /// Orders placed by the token's user.
    Mine,
    /// Every order (operator view).
    All,
}

/// Backend collaborator contract.
///
/// Methods return `Send` futures so stores can hand sync work to
/// `tokio::spawn`.
pub trait StoreApi: Send + Sync + 'static {
    /// `GET /menu`.
    fn fetch_menu(&self) -> impl Future<Output = Result<Vec<MenuItem>, ApiError>> + Send;

    /// `POST /orders`. Guests may order without a token.
    fn create_order(
        &self,
        token: Option<&SecretString>,
        order: &NewOrder,
    ) -> impl Future<Output = Result<Order, ApiError>> + Send;

    /// `GET /orders/:id`.
    fn fetch_order(
        &self,
        token: Option<&SecretString>,
        id: &OrderId,
    ) -> impl Future<Output = Result<Order, ApiError>> + Send;

    /// `PATCH /orders/:id`.
    fn update_order(
        &self,
        token: Option<&SecretString>,
        id: &OrderId,
        update: &OrderUpdate,
    ) -> impl Future<Output = Result<Order, ApiError>> + Send;

    /// `GET /orders` (or `?scope=all`).
    fn fetch_orders(
        &self,
        token: &SecretString,
        scope: OrderScope,
    ) -> impl Future<Output = Result<Vec<Order>, ApiError>> + Send;

    /// `DELETE /orders/:id`.
    fn delete_order(
        &self,
        token: &SecretString,
        id: &OrderId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `GET /favorites`.
    fn fetch_favorites(
        &self,
        token: &SecretString,
    ) -> impl Future<Output = Result<Vec<Favorite>, ApiError>> + Send;

    /// `POST /favorites`.
    fn add_favorite(
        &self,
        token: &SecretString,
        favorite: &Favorite,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `DELETE /favorites/:productId`.
    fn remove_favorite(
        &self,
        token: &SecretString,
        product_id: ProductId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `GET /ratings`.
    fn fetch_ratings(
        &self,
    ) -> impl Future<Output = Result<HashMap<ProductId, RatingSummary>, ApiError>> + Send;

    /// `POST /ratings`.
    fn submit_rating(
        &self,
        token: &SecretString,
        submission: &RatingSubmission,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::Api {
            status: 422,
            message: "invalid phone".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 422 - invalid phone");
    }

    #[test]
    fn test_rate_limited_error() {
        let err = ApiError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
    }
}
