//! Cache types for backend responses.

use std::sync::Arc;

use crate::models::MenuItem;

/// Cache key for cacheable reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Menu,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Menu(Arc<Vec<MenuItem>>),
}
