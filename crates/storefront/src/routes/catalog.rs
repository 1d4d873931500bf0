//! Catalog handlers: collections and the shop listing.
//!
//! The shop listing reads the same search params as the shop page:
//! `q`, `page`, repeated `collection`, `price_min`, `price_max` and `sort`.

use axum::{
    Json,
    extract::{Path, RawQuery, State},
};
use docet_core::{Collection, CollectionId, ProductPage, ProductQuery, ProductSummary, ProductsSort};
use serde::Serialize;
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::PlatformSession;
use crate::services::catalog;
use crate::state::AppState;
use crate::wix::CatalogApi;

/// Collection as returned to the front end.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionView {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub product_count: u32,
}

impl From<Collection> for CollectionView {
    fn from(collection: Collection) -> Self {
        Self {
            id: collection.id.into_inner(),
            name: collection.name,
            slug: collection.slug,
            description: collection.description,
            image: collection.image,
            product_count: collection.product_count,
        }
    }
}

/// Product card in a listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub price: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discounted_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ribbon: Option<String>,
    pub in_stock: bool,
}

impl From<ProductSummary> for ProductView {
    fn from(product: ProductSummary) -> Self {
        Self {
            price: product.price.display(),
            discounted_price: product.discounted_price.as_ref().map(|p| p.display()),
            id: product.id.into_inner(),
            name: product.name,
            slug: product.slug,
            image: product.image,
            ribbon: product.ribbon,
            in_stock: product.in_stock,
        }
    }
}

/// One page of the shop listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductsResponse {
    /// Page heading: `Search: <q>` or `Products`.
    pub title: String,
    /// e.g. `9 products found`.
    pub summary: String,
    pub items: Vec<ProductView>,
    pub total_count: u32,
    pub page: u32,
    pub total_pages: u32,
    pub sort: ProductsSort,
}

impl ProductsResponse {
    fn new(query: &ProductQuery, page: ProductPage) -> Self {
        Self {
            title: query
                .q
                .as_ref()
                .map_or_else(|| "Products".to_string(), |q| format!("Search: {q}")),
            summary: page.summary(),
            total_count: page.total_count,
            page: page.page,
            total_pages: page.total_pages(),
            items: page.items.into_iter().map(Into::into).collect(),
            sort: query.sort,
        }
    }
}

/// Parse the shop search params.
///
/// Missing values take their defaults; blank ones are ignored. A page or
/// price that is not a number is rejected.
///
/// # Errors
///
/// Returns [`AppError::BadRequest`] for malformed numbers or page 0.
pub fn parse_shop_query(raw: Option<&str>) -> Result<ProductQuery, AppError> {
    let mut q = None;
    let mut page = None;
    let mut collections = Vec::new();
    let mut price_min = None;
    let mut price_max = None;
    let mut sort = ProductsSort::default();

    for (key, value) in url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match key.as_ref() {
            "q" => q = Some(value.to_string()),
            "page" => page = Some(number(&key, value)?),
            "collection" => collections.push(CollectionId::new(value)),
            "price_min" => price_min = Some(number(&key, value)?),
            "price_max" => price_max = Some(number(&key, value)?),
            "sort" => sort = ProductsSort::parse_or_default(value),
            _ => {}
        }
    }

    let page = page.unwrap_or(1);
    if page == 0 {
        return Err(AppError::BadRequest("page must be at least 1".to_string()));
    }

    let mut query = ProductQuery::new(page)
        .with_collections(collections)
        .with_price_range(price_min, price_max)
        .with_sort(sort);
    if let Some(q) = q {
        query = query.with_search(q);
    }
    Ok(query)
}

fn number(key: &str, value: &str) -> Result<u32, AppError> {
    value
        .parse()
        .map_err(|_| AppError::BadRequest(format!("{key} must be a whole number")))
}

/// `GET /api/collections`
#[instrument(skip(state, session))]
pub async fn list_collections(
    State(state): State<AppState>,
    session: PlatformSession,
) -> Result<Json<Vec<CollectionView>>, AppError> {
    let wix = state.wix().session(session.tokens());
    let collections = wix.collections().await?;
    Ok(Json(collections.into_iter().map(Into::into).collect()))
}

/// `GET /api/collections/{slug}`
#[instrument(skip(state, session))]
pub async fn show_collection(
    State(state): State<AppState>,
    session: PlatformSession,
    Path(slug): Path<String>,
) -> Result<Json<CollectionView>, AppError> {
    let wix = state.wix().session(session.tokens());
    let collection = catalog::collection(&wix, &slug).await?;
    Ok(Json(collection.into()))
}

/// `GET /api/products`
#[instrument(skip(state, session, raw))]
pub async fn list_products(
    State(state): State<AppState>,
    session: PlatformSession,
    RawQuery(raw): RawQuery,
) -> Result<Json<ProductsResponse>, AppError> {
    let query = parse_shop_query(raw.as_deref())?;
    let wix = state.wix().session(session.tokens());
    let page = catalog::products_page(&wix, &query).await?;
    Ok(Json(ProductsResponse::new(&query, page)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use docet_core::{CurrencyCode, Money, ProductId};

    use super::*;

    #[test]
    fn test_parse_full_query() {
        let query = parse_shop_query(Some(
            "q=linen+shirt&page=2&collection=c-1&collection=c-2&price_min=10&price_max=80&sort=price_desc",
        ))
        .unwrap();

        assert_eq!(query.q.as_deref(), Some("linen shirt"));
        assert_eq!(query.page, 2);
        assert_eq!(
            query.collection_ids,
            vec![CollectionId::new("c-1"), CollectionId::new("c-2")]
        );
        assert_eq!(query.price_min, Some(10));
        assert_eq!(query.price_max, Some(80));
        assert_eq!(query.sort, ProductsSort::PriceDesc);
    }

    #[test]
    fn test_parse_defaults_and_blanks() {
        let query = parse_shop_query(Some("q=&price_min=&sort=bogus")).unwrap();
        assert_eq!(query, ProductQuery::new(1));
        assert_eq!(parse_shop_query(None).unwrap(), ProductQuery::new(1));
    }

    #[test]
    fn test_parse_rejects_bad_numbers() {
        assert!(matches!(
            parse_shop_query(Some("page=two")),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            parse_shop_query(Some("page=0")),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            parse_shop_query(Some("price_max=-5")),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_response_title_and_prices() {
        let query = ProductQuery::new(1).with_search("mug");
        let page = ProductPage {
            items: vec![ProductSummary {
                id: ProductId::new("p-1"),
                name: "Mug".to_string(),
                slug: "mug".to_string(),
                price: Money::from_minor_units(1500, CurrencyCode::USD),
                discounted_price: Some(Money::from_minor_units(1200, CurrencyCode::USD)),
                image: None,
                ribbon: None,
                in_stock: true,
            }],
            total_count: 1,
            page: 1,
        };

        let json = serde_json::to_value(ProductsResponse::new(&query, page)).unwrap();
        assert_eq!(json["title"], "Search: mug");
        assert_eq!(json["summary"], "1 product found");
        assert_eq!(json["items"][0]["price"], "$15.00");
        assert_eq!(json["items"][0]["discountedPrice"], "$12.00");
        assert_eq!(json["totalPages"], 1);
        assert_eq!(json["sort"], "last_updated");
    }
}
