//! Rating aggregate data structures.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pizzeria_core::{ProductId, UserId};

use crate::error::SyncError;
use crate::models::rating::{MAX_RATING, MIN_RATING};
use crate::models::{RatingSummary, Review};

/// Running aggregate for one product.
///
/// `average == total_rating / count` whenever `count > 0`. An aggregate with
/// `count == 0` never exists; the book removes it instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingAggregate {
    total_rating: f64,
    count: u32,
    average: f64,
    #[serde(default)]
    reviews: Vec<Review>,
}

impl RatingAggregate {
    /// Sum of all ratings.
    #[must_use]
    pub const fn total_rating(&self) -> f64 {
        self.total_rating
    }

    /// Number of ratings.
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Mean rating.
    #[must_use]
    pub const fn average(&self) -> f64 {
        self.average
    }

    /// Reviews known locally, one per reviewer.
    #[must_use]
    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    /// The review left by `user_id`, if any.
    #[must_use]
    pub fn review_by(&self, user_id: Option<UserId>) -> Option<&Review> {
        self.reviews.iter().find(|review| review.user_id == user_id)
    }

    fn recompute_average(&mut self) {
        self.average = if self.count == 0 {
            0.0
        } else {
            self.total_rating / f64::from(self.count)
        };
    }
}

/// Validate a star rating.
///
/// # Errors
///
/// Returns `SyncError::Validation` if `rating` is outside `1..=5`.
pub fn validate_rating(rating: u8) -> Result<(), SyncError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(SyncError::Validation(format!(
            "rating must be between {MIN_RATING} and {MAX_RATING}, got {rating}"
        )))
    }
}

/// Global per-product aggregates. Persisted as `globalPizzaRatings`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RatingBook {
    aggregates: BTreeMap<ProductId, RatingAggregate>,
}

impl RatingBook {
    /// Record `user_id`'s rating of `product_id`.
    ///
    /// A resubmission adjusts the total by the difference and replaces the
    /// review in place; the count is unchanged. A first rating appends.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Validation` if `rating` is outside `1..=5`. The
    /// book is unchanged in that case.
    pub fn submit(
        &mut self,
        product_id: ProductId,
        user_id: Option<UserId>,
        rating: u8,
        text: &str,
        date: DateTime<Utc>,
    ) -> Result<&RatingAggregate, SyncError> {
        validate_rating(rating)?;

        let aggregate = self
            .aggregates
            .entry(product_id)
            .or_insert_with(|| RatingAggregate {
                total_rating: 0.0,
                count: 0,
                average: 0.0,
                reviews: Vec::new(),
            });

        let review = Review {
            user_id,
            rating,
            text: text.to_string(),
            date,
        };

        if let Some(existing) = aggregate
            .reviews
            .iter_mut()
            .find(|review| review.user_id == user_id)
        {
            aggregate.total_rating += f64::from(rating) - f64::from(existing.rating);
            *existing = review;
        } else {
            aggregate.total_rating += f64::from(rating);
            aggregate.count += 1;
            aggregate.reviews.push(review);
        }

        aggregate.recompute_average();
        Ok(aggregate)
    }

    /// Withdraw `user_id`'s rating of `product_id`.
    ///
    /// Returns `false` (and changes nothing) when there was no such rating.
    /// The product's entry is deleted when its count reaches zero.
    pub fn remove(&mut self, product_id: ProductId, user_id: Option<UserId>) -> bool {
        let Some(aggregate) = self.aggregates.get_mut(&product_id) else {
            return false;
        };
        let Some(index) = aggregate
            .reviews
            .iter()
            .position(|review| review.user_id == user_id)
        else {
            return false;
        };

        let removed = aggregate.reviews.remove(index);
        aggregate.total_rating -= f64::from(removed.rating);
        aggregate.count = aggregate.count.saturating_sub(1);

        if aggregate.count == 0 {
            self.aggregates.remove(&product_id);
        } else {
            aggregate.recompute_average();
        }
        true
    }

    /// Overwrite local aggregate fields with the backend's numbers.
    ///
    /// `average` and `count` are authoritative; the total is re-derived so the
    /// mean invariant keeps holding. Locally known reviews are kept. Products
    /// the backend reports with a zero count are removed.
    pub fn merge_from_backend<'a>(
        &mut self,
        summaries: impl IntoIterator<Item = (&'a ProductId, &'a RatingSummary)>,
    ) {
        for (product_id, summary) in summaries {
            if summary.count == 0 {
                self.aggregates.remove(product_id);
                continue;
            }

            let aggregate = self
                .aggregates
                .entry(*product_id)
                .or_insert_with(|| RatingAggregate {
                    total_rating: 0.0,
                    count: 0,
                    average: 0.0,
                    reviews: Vec::new(),
                });
            aggregate.count = summary.count;
            aggregate.average = summary.average;
            aggregate.total_rating = summary.average * f64::from(summary.count);
        }
    }

    /// Aggregate for one product.
    #[must_use]
    pub fn get(&self, product_id: ProductId) -> Option<&RatingAggregate> {
        self.aggregates.get(&product_id)
    }

    /// Whether a product has any rating.
    #[must_use]
    pub fn has(&self, product_id: ProductId) -> bool {
        self.aggregates.contains_key(&product_id)
    }

    /// Mean rating of one product.
    #[must_use]
    pub fn average(&self, product_id: ProductId) -> Option<f64> {
        self.get(product_id).map(RatingAggregate::average)
    }

    /// Number of rated products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.aggregates.len()
    }

    /// Whether no product is rated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aggregates.is_empty()
    }
}

/// One of the current identity's own ratings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRating {
    pub rating: u8,
    #[serde(default)]
    pub review: String,
    pub date: DateTime<Utc>,
}

/// The current identity's ratings. Persisted as `pizzaRatings_<owner>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserRatings {
    ratings: BTreeMap<ProductId, UserRating>,
}

impl UserRatings {
    /// Record or replace a rating.
    pub fn set(&mut self, product_id: ProductId, rating: UserRating) {
        self.ratings.insert(product_id, rating);
    }

    /// Drop a rating. Returns whether one existed.
    pub fn remove(&mut self, product_id: ProductId) -> bool {
        self.ratings.remove(&product_id).is_some()
    }

    /// Rating for one product.
    #[must_use]
    pub fn get(&self, product_id: ProductId) -> Option<&UserRating> {
        self.ratings.get(&product_id)
    }

    /// All ratings by product.
    pub fn iter(&self) -> impl Iterator<Item = (&ProductId, &UserRating)> {
        self.ratings.iter()
    }

    /// Number of rated products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    /// Whether nothing is rated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const P: ProductId = ProductId::new(1);

    fn alice() -> Option<UserId> {
        Some(UserId::new(10))
    }

    fn bob() -> Option<UserId> {
        Some(UserId::new(11))
    }

    fn assert_mean(book: &RatingBook, product_id: ProductId) {
        let aggregate = book.get(product_id).unwrap();
        assert!(aggregate.count() > 0);
        let expected = aggregate.total_rating() / f64::from(aggregate.count());
        assert!((aggregate.average() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_resubmission_replaces_review() {
        let mut book = RatingBook::default();
        book.submit(P, alice(), 4, "good", Utc::now()).unwrap();
        book.submit(P, alice(), 2, "meh", Utc::now()).unwrap();

        let aggregate = book.get(P).unwrap();
        assert_eq!(aggregate.count(), 1);
        assert!((aggregate.average() - 2.0).abs() < f64::EPSILON);
        assert_eq!(aggregate.reviews().len(), 1);
        assert_eq!(aggregate.review_by(alice()).unwrap().text, "meh");
    }

    #[test]
    fn test_two_users_average() {
        let mut book = RatingBook::default();
        book.submit(P, alice(), 5, "", Utc::now()).unwrap();
        book.submit(P, bob(), 2, "", Utc::now()).unwrap();

        let aggregate = book.get(P).unwrap();
        assert_eq!(aggregate.count(), 2);
        assert!((aggregate.average() - 3.5).abs() < f64::EPSILON);
        assert_mean(&book, P);
    }

    #[test]
    fn test_out_of_range_rating_rejected_without_side_effects() {
        let mut book = RatingBook::default();
        assert!(matches!(
            book.submit(P, alice(), 0, "", Utc::now()),
            Err(SyncError::Validation(_))
        ));
        assert!(book.submit(P, alice(), 6, "", Utc::now()).is_err());
        assert!(!book.has(P));
    }

    #[test]
    fn test_removing_last_rating_deletes_entry() {
        let mut book = RatingBook::default();
        book.submit(P, alice(), 3, "", Utc::now()).unwrap();

        assert!(book.remove(P, alice()));
        assert!(!book.has(P));
        assert!(book.is_empty());
    }

    #[test]
    fn test_remove_keeps_other_reviews() {
        let mut book = RatingBook::default();
        book.submit(P, alice(), 5, "", Utc::now()).unwrap();
        book.submit(P, bob(), 1, "", Utc::now()).unwrap();

        assert!(book.remove(P, alice()));
        let aggregate = book.get(P).unwrap();
        assert_eq!(aggregate.count(), 1);
        assert!((aggregate.average() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_remove_unknown_rating_is_noop() {
        let mut book = RatingBook::default();
        book.submit(P, alice(), 5, "", Utc::now()).unwrap();
        let before = book.clone();

        assert!(!book.remove(P, bob()));
        assert!(!book.remove(ProductId::new(2), alice()));
        assert_eq!(book, before);
    }

    #[test]
    fn test_backend_merge_overwrites_aggregate_fields() {
        let mut book = RatingBook::default();
        book.submit(P, alice(), 5, "great", Utc::now()).unwrap();

        let backend = HashMap::from([
            (P, RatingSummary { average: 4.0, count: 10 }),
            (ProductId::new(2), RatingSummary { average: 3.0, count: 2 }),
        ]);
        book.merge_from_backend(&backend);

        let aggregate = book.get(P).unwrap();
        assert_eq!(aggregate.count(), 10);
        assert!((aggregate.average() - 4.0).abs() < f64::EPSILON);
        assert_eq!(aggregate.reviews().len(), 1);
        assert_mean(&book, P);
        assert!(book.has(ProductId::new(2)));
    }

    #[test]
    fn test_backend_merge_zero_count_removes_entry() {
        let mut book = RatingBook::default();
        book.submit(P, alice(), 5, "", Utc::now()).unwrap();

        let backend = HashMap::from([(P, RatingSummary { average: 0.0, count: 0 })]);
        book.merge_from_backend(&backend);
        assert!(!book.has(P));
    }

    #[test]
    fn test_submit_after_merge_keeps_mean_invariant() {
        let mut book = RatingBook::default();
        let backend = HashMap::from([(P, RatingSummary { average: 4.0, count: 4 })]);
        book.merge_from_backend(&backend);

        book.submit(P, alice(), 1, "", Utc::now()).unwrap();
        let aggregate = book.get(P).unwrap();
        assert_eq!(aggregate.count(), 5);
        assert!((aggregate.average() - 3.4).abs() < 1e-9);
    }

    #[test]
    fn test_book_persists_as_product_keyed_object() {
        let mut book = RatingBook::default();
        book.submit(P, alice(), 4, "", Utc::now()).unwrap();

        let json = serde_json::to_value(&book).unwrap();
        assert!(json.get("1").is_some());
        let restored: RatingBook = serde_json::from_value(json).unwrap();
        assert_eq!(restored, book);
    }
}
