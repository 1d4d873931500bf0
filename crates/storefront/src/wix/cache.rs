//! Cache types for catalog responses.

use docet_core::{Collection, ProductPage, ProductQuery};

/// Cache key for collections and product listings.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Collections,
    Collection(String),
    /// Listing pages; search queries are never cached.
    Products(ProductQuery),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Collections(Vec<Collection>),
    Collection(Box<Collection>),
    Products(ProductPage),
}
