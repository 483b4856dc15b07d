//! HTTP implementation of [`StoreApi`].
//!
//! Uses `reqwest` for transport and caches the menu using `moka`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use pizzeria_core::{OrderId, ProductId};

use super::cache::{CacheKey, CacheValue};
use super::{ApiError, OrderScope, StoreApi};
use crate::config::ApiConfig;
use crate::models::{
    Favorite, MenuItem, NewOrder, Order, OrderUpdate, RatingSubmission, RatingSummary,
};

/// JSON envelope every backend response uses: `{"data": ...}`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Error body: `{"message": "..."}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// One row of `GET /ratings`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RatingRow {
    product_id: ProductId,
    #[serde(flatten)]
    summary: RatingSummary,
}

/// Client for the Pizzeria backend.
///
/// Cheaply cloneable; clones share the connection pool and the menu cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(config.menu_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                cache,
            }),
        })
    }

    /// Drop every cached response.
    pub fn invalidate_cache(&self) {
        self.inner.cache.invalidate_all();
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&SecretString>,
    ) -> Result<RequestBuilder, ApiError> {
        let url = self.inner.base_url.join(path)?;
        let mut builder = self
            .inner
            .client
            .request(method, url)
            .header("X-Request-Id", uuid::Uuid::new_v4().to_string())
            .header("Accept", "application/json");

        if let Some(token) = token {
            builder = builder.bearer_auth(token.expose_secret());
        }

        Ok(builder)
    }

    /// Send a request and map non-success statuses onto `ApiError`.
    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<Response, ApiError> {
        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(what.to_string())),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(1);
                Err(ApiError::RateLimited(retry_after))
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ErrorBody>(&body)
                    .map(|e| e.message)
                    .unwrap_or_else(|_| body.chars().take(200).collect());
                tracing::error!(
                    status = %status,
                    what = %what,
                    message = %message,
                    "Backend returned non-success status"
                );
                Err(ApiError::Api {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    /// Send a request and decode the `data` envelope.
    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        what: &str,
    ) -> Result<T, ApiError> {
        let response = self.send(builder, what).await?;
        let text = response.text().await?;

        serde_json::from_str::<Envelope<T>>(&text)
            .map(|envelope| envelope.data)
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    what = %what,
                    body = %text.chars().take(500).collect::<String>(),
                    "Failed to parse backend response"
                );
                ApiError::Parse(e.to_string())
            })
    }
}

impl StoreApi for ApiClient {
    #[instrument(skip(self))]
    async fn fetch_menu(&self) -> Result<Vec<MenuItem>, ApiError> {
        if let Some(CacheValue::Menu(menu)) = self.inner.cache.get(&CacheKey::Menu).await {
            debug!("Cache hit for menu");
            return Ok(menu.as_ref().clone());
        }

        let builder = self.request(Method::GET, "menu", None)?;
        let menu: Vec<MenuItem> = self.send_json(builder, "menu").await?;

        self.inner
            .cache
            .insert(CacheKey::Menu, CacheValue::Menu(Arc::new(menu.clone())))
            .await;

        Ok(menu)
    }

    #[instrument(skip(self, token, order), fields(lines = order.cart.len()))]
    async fn create_order(
        &self,
        token: Option<&SecretString>,
        order: &NewOrder,
    ) -> Result<Order, ApiError> {
        let builder = self.request(Method::POST, "orders", token)?.json(order);
        self.send_json(builder, "orders").await
    }

    #[instrument(skip(self, token), fields(order_id = %id))]
    async fn fetch_order(
        &self,
        token: Option<&SecretString>,
        id: &OrderId,
    ) -> Result<Order, ApiError> {
        let path = format!("orders/{id}");
        let builder = self.request(Method::GET, &path, token)?;
        self.send_json(builder, &format!("order {id}")).await
    }

    #[instrument(skip(self, token, update), fields(order_id = %id))]
    async fn update_order(
        &self,
        token: Option<&SecretString>,
        id: &OrderId,
        update: &OrderUpdate,
    ) -> Result<Order, ApiError> {
        let path = format!("orders/{id}");
        let builder = self.request(Method::PATCH, &path, token)?.json(update);
        self.send_json(builder, &format!("order {id}")).await
    }

    #[instrument(skip(self, token))]
    async fn fetch_orders(
        &self,
        token: &SecretString,
        scope: OrderScope,
    ) -> Result<Vec<Order>, ApiError> {
        let path = match scope {
            OrderScope::Mine => "orders",
            OrderScope::All => "orders?scope=all",
        };
        let builder = self.request(Method::GET, path, Some(token))?;
        self.send_json(builder, "orders").await
    }

    #[instrument(skip(self, token), fields(order_id = %id))]
    async fn delete_order(&self, token: &SecretString, id: &OrderId) -> Result<(), ApiError> {
        let path = format!("orders/{id}");
        let builder = self.request(Method::DELETE, &path, Some(token))?;
        self.send(builder, &format!("order {id}")).await?;
        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn fetch_favorites(&self, token: &SecretString) -> Result<Vec<Favorite>, ApiError> {
        let builder = self.request(Method::GET, "favorites", Some(token))?;
        self.send_json(builder, "favorites").await
    }

    #[instrument(skip(self, token, favorite), fields(product_id = %favorite.product_id))]
    async fn add_favorite(&self, token: &SecretString, favorite: &Favorite) -> Result<(), ApiError> {
        let builder = self
            .request(Method::POST, "favorites", Some(token))?
            .json(favorite);
        self.send(builder, "favorites").await?;
        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn remove_favorite(
        &self,
        token: &SecretString,
        product_id: ProductId,
    ) -> Result<(), ApiError> {
        let path = format!("favorites/{product_id}");
        let builder = self.request(Method::DELETE, &path, Some(token))?;
        self.send(builder, &format!("favorite {product_id}")).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn fetch_ratings(&self) -> Result<HashMap<ProductId, RatingSummary>, ApiError> {
        let builder = self.request(Method::GET, "ratings", None)?;
        let rows: Vec<RatingRow> = self.send_json(builder, "ratings").await?;
        Ok(rows
            .into_iter()
            .map(|row| (row.product_id, row.summary))
            .collect())
    }

    #[instrument(skip(self, token, submission), fields(product_id = %submission.product_id))]
    async fn submit_rating(
        &self,
        token: &SecretString,
        submission: &RatingSubmission,
    ) -> Result<(), ApiError> {
        let builder = self
            .request(Method::POST, "ratings", Some(token))?
            .json(submission);
        self.send(builder, "ratings").await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> ApiConfig {
        ApiConfig {
            base_url: Url::parse("http://localhost:9000/api/").unwrap(),
            request_timeout: Duration::from_secs(5),
            menu_cache_ttl: Duration::from_secs(300),
        }
    }

    #[test]
    fn test_request_joins_relative_paths() {
        let client = ApiClient::new(&config()).unwrap();
        let request = client
            .request(Method::GET, "orders/IIDSAT", None)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.url().as_str(), "http://localhost:9000/api/orders/IIDSAT");
        assert!(request.headers().contains_key("X-Request-Id"));
        assert!(!request.headers().contains_key("Authorization"));
    }

    #[test]
    fn test_authenticated_request_carries_bearer_token() {
        let client = ApiClient::new(&config()).unwrap();
        let token = SecretString::from("tok-123");
        let request = client
            .request(Method::GET, "favorites", Some(&token))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            request.headers().get("Authorization").unwrap(),
            "Bearer tok-123"
        );
    }

    #[test]
    fn test_rating_rows_decode() {
        let json = r#"{"data": [{"productId": 4, "average": 4.5, "count": 2}]}"#;
        let envelope: Envelope<Vec<RatingRow>> = serde_json::from_str(json).unwrap();
        let row = envelope.data.into_iter().next().unwrap();
        assert_eq!(row.product_id, ProductId::new(4));
        assert_eq!(row.summary.count, 2);
    }

    #[test]
    fn test_menu_price_renamed_on_decode() {
        let json = r#"{"data": [{"id": 1, "name": "Margherita", "price": 12, "ingredients": ["tomato"], "soldOut": false}]}"#;
        let envelope: Envelope<Vec<MenuItem>> = serde_json::from_str(json).unwrap();
        let item = envelope.data.into_iter().next().unwrap();
        assert_eq!(item.unit_price, rust_decimal::Decimal::new(12, 0));
    }
}
