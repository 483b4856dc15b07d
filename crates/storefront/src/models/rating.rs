//! Rating and review types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pizzeria_core::{ProductId, UserId};

/// Lowest accepted star rating.
pub const MIN_RATING: u8 = 1;
/// Highest accepted star rating.
pub const MAX_RATING: u8 = 5;

/// One user's review of one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Reviewer; `None` for a guest reviewer.
    pub user_id: Option<UserId>,
    pub rating: u8,
    #[serde(default)]
    pub text: String,
    pub date: DateTime<Utc>,
}

/// Backend-authoritative aggregate fields for one product.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub average: f64,
    pub count: u32,
}

/// Body of `POST /ratings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSubmission {
    pub product_id: ProductId,
    pub rating: u8,
    #[serde(default)]
    pub review: String,
}
