//! Shop listings and collection lookups.

use docet_core::{Collection, ProductPage, ProductQuery};
use thiserror::Error;
use tracing::instrument;

use crate::wix::{CatalogApi, WixError};

/// Catalog read failures.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// The requested page lies past the last page of results.
    #[error("page {page} not found ({total_pages} pages)")]
    PageOutOfRange { page: u32, total_pages: u32 },

    #[error("catalog unavailable: {0}")]
    Remote(#[from] WixError),
}

/// Collection for a collection page.
///
/// # Errors
///
/// Returns [`CatalogError::CollectionNotFound`] for unknown slugs.
#[instrument(skip(api))]
pub async fn collection<A: CatalogApi>(api: &A, slug: &str) -> Result<Collection, CatalogError> {
    api.collection_by_slug(slug)
        .await?
        .ok_or_else(|| CatalogError::CollectionNotFound(slug.to_string()))
}

/// One page of the shop listing.
///
/// # Errors
///
/// Returns [`CatalogError::PageOutOfRange`] when `query.page` is past the
/// last page. An empty result still has a first page.
#[instrument(skip(api, query), fields(page = query.page))]
pub async fn products_page<A: CatalogApi>(
    api: &A,
    query: &ProductQuery,
) -> Result<ProductPage, CatalogError> {
    let page = api.query_products(query).await?;

    if !page.has_page(query.page) {
        tracing::debug!(
            page = query.page,
            total_pages = page.total_pages(),
            "Shop page out of range"
        );
        return Err(CatalogError::PageOutOfRange {
            page: query.page,
            total_pages: page.total_pages(),
        });
    }
    Ok(page)
}
