//! Catalog reads: collections, product listings and the shop query.
//!
//! A [`ProductQuery`] is the parsed form of the shop page's search params.
//! Listings are paged in fixed pages of [`PRODUCTS_PAGE_SIZE`] products.

use serde::{Deserialize, Serialize};

use super::id::{CollectionId, ProductId};
use super::price::Money;

/// Products per shop page.
pub const PRODUCTS_PAGE_SIZE: u32 = 8;

/// A product collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Products assigned to the collection.
    #[serde(default)]
    pub product_count: u32,
}

/// A product as shown in listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    /// List price.
    pub price: Money,
    /// Sale price, only when lower than the list price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discounted_price: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ribbon: Option<String>,
    pub in_stock: bool,
}

impl ProductSummary {
    /// Price the shopper pays.
    #[must_use]
    pub fn effective_price(&self) -> &Money {
        self.discounted_price.as_ref().unwrap_or(&self.price)
    }
}

/// Shop listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductsSort {
    /// Most recently updated first.
    #[default]
    LastUpdated,
    PriceAsc,
    PriceDesc,
}

impl ProductsSort {
    /// Parse the `sort` search param. Unknown values fall back to the default.
    #[must_use]
    pub fn parse_or_default(raw: &str) -> Self {
        match raw {
            "price_asc" => Self::PriceAsc,
            "price_desc" => Self::PriceDesc,
            _ => Self::LastUpdated,
        }
    }

    /// Search param value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LastUpdated => "last_updated",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
        }
    }
}

/// One page of the shop listing.
///
/// Built through the `with_*` methods, which normalize their input: blank
/// search text and zero price bounds mean "no filter".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductQuery {
    /// Name prefix search.
    pub q: Option<String>,
    /// 1-based page number.
    pub page: u32,
    /// Restrict to products in any of these collections.
    pub collection_ids: Vec<CollectionId>,
    /// Lower price bound, inclusive.
    pub price_min: Option<u32>,
    /// Upper price bound, inclusive.
    pub price_max: Option<u32>,
    pub sort: ProductsSort,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self::new(1)
    }
}

impl ProductQuery {
    /// Query for `page` with no filters. Page 0 is treated as page 1.
    #[must_use]
    pub fn new(page: u32) -> Self {
        Self {
            q: None,
            page: page.max(1),
            collection_ids: Vec::new(),
            price_min: None,
            price_max: None,
            sort: ProductsSort::default(),
        }
    }

    #[must_use]
    pub fn with_search(mut self, q: impl Into<String>) -> Self {
        let q = q.into();
        let q = q.trim();
        self.q = (!q.is_empty()).then(|| q.to_string());
        self
    }

    #[must_use]
    pub fn with_collections(mut self, ids: impl IntoIterator<Item = CollectionId>) -> Self {
        self.collection_ids = ids.into_iter().filter(|id| !id.as_str().is_empty()).collect();
        self
    }

    #[must_use]
    pub fn with_price_range(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.price_min = min.filter(|v| *v > 0);
        self.price_max = max.filter(|v| *v > 0);
        self
    }

    #[must_use]
    pub const fn with_sort(mut self, sort: ProductsSort) -> Self {
        self.sort = sort;
        self
    }

    /// Products skipped before this page.
    #[must_use]
    pub const fn offset(&self) -> u32 {
        self.page.saturating_sub(1).saturating_mul(PRODUCTS_PAGE_SIZE)
    }

    /// Whether the query carries free-text search.
    #[must_use]
    pub const fn is_search(&self) -> bool {
        self.q.is_some()
    }
}

/// A page of products plus the size of the whole result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPage {
    pub items: Vec<ProductSummary>,
    /// Matching products across all pages.
    pub total_count: u32,
    /// 1-based page number of `items`.
    pub page: u32,
}

impl ProductPage {
    /// Number of pages; an empty result still has one (empty) page.
    #[must_use]
    pub const fn total_pages(&self) -> u32 {
        let pages = self.total_count.div_ceil(PRODUCTS_PAGE_SIZE);
        if pages == 0 { 1 } else { pages }
    }

    /// Whether `page` lies within the result set.
    #[must_use]
    pub const fn has_page(&self, page: u32) -> bool {
        page >= 1 && page <= self.total_pages()
    }

    /// Listing headline, e.g. `12 products found`.
    #[must_use]
    pub fn summary(&self) -> String {
        match self.total_count {
            1 => "1 product found".to_string(),
            n => format!("{n} products found"),
        }
    }
}
