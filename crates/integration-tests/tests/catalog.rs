//! Integration tests for collections and the shop listing.
//!
//! Run with: cargo test -p docet-integration-tests

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use docet_integration_tests::{TestContext, fresh_tokens, request};
use docet_storefront::wix::{ALL_PRODUCTS_COLLECTION_ID, FEATURED_COLLECTION_ID};
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

const COLLECTIONS_QUERY_PATH: &str = "/stores-reader/v1/collections/query";
const PRODUCTS_QUERY_PATH: &str = "/stores-reader/v1/products/query";

fn wire_product(id: &str, price: u32) -> Value {
    json!({
        "id": id,
        "name": format!("Product {id}"),
        "slug": format!("product-{id}"),
        "priceData": {
            "currency": "USD",
            "price": price,
            "discountedPrice": price,
            "formatted": { "price": format!("${price}.00") }
        },
        "stock": { "inStock": true }
    })
}

async fn mock_products(ctx: &TestContext, products: Vec<Value>, total: u32) {
    Mock::given(method("POST"))
        .and(path(PRODUCTS_QUERY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": products,
            "totalResults": total
        })))
        .mount(&ctx.wix)
        .await;
}

// ============================================================================
// Collections
// ============================================================================

#[tokio::test]
async fn test_collections_skip_builtins_and_are_cached() {
    let ctx = TestContext::new().await;
    let filter = json!({
        "id": { "$nin": [ALL_PRODUCTS_COLLECTION_ID, FEATURED_COLLECTION_ID] }
    });
    Mock::given(method("POST"))
        .and(path(COLLECTIONS_QUERY_PATH))
        .and(body_partial_json(json!({ "query": { "filter": filter.to_string() } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "collections": [
                { "id": "col-1", "name": "Mugs", "slug": "mugs", "numberOfProducts": 3 }
            ]
        })))
        .expect(1)
        .mount(&ctx.wix)
        .await;

    let tokens = fresh_tokens("access-1", "refresh-1");
    for _ in 0..2 {
        let response = ctx
            .send(request(Method::GET, "/api/collections", Some(&tokens), None))
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body[0]["slug"], "mugs");
        assert_eq!(response.body[0]["productCount"], 3);
    }
}

#[tokio::test]
async fn test_unknown_collection_is_not_found() {
    let ctx = TestContext::new().await;
    Mock::given(method("GET"))
        .and(path("/stores-reader/v1/collections/slug/no-such"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&ctx.wix)
        .await;

    let tokens = fresh_tokens("access-1", "refresh-1");
    let response = ctx
        .send(request(
            Method::GET,
            "/api/collections/no-such",
            Some(&tokens),
            None,
        ))
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Shop Listing
// ============================================================================

#[tokio::test]
async fn test_shop_listing_forwards_filters() {
    let ctx = TestContext::new().await;
    let filter = json!({
        "collectionIds": { "$hasSome": ["col-1", "col-2"] },
        "name": { "$startsWith": "mug" },
        "priceData.price": { "$gte": 5, "$lte": 40 }
    });
    Mock::given(method("POST"))
        .and(path(PRODUCTS_QUERY_PATH))
        .and(body_partial_json(json!({
            "query": {
                "filter": filter.to_string(),
                "sort": json!([{ "priceData.price": "desc" }]).to_string(),
                "paging": { "limit": 8, "offset": 8 }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": [wire_product("9", 12)],
            "totalResults": 9
        })))
        .expect(1)
        .mount(&ctx.wix)
        .await;

    let tokens = fresh_tokens("access-1", "refresh-1");
    let response = ctx
        .send(request(
            Method::GET,
            "/api/products?q=mug&page=2&collection=col-1&collection=col-2&price_min=5&price_max=40&sort=price_desc",
            Some(&tokens),
            None,
        ))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["title"], "Search: mug");
    assert_eq!(response.body["summary"], "9 products found");
    assert_eq!(response.body["totalPages"], 2);
    assert_eq!(response.body["items"][0]["price"], "$12.00");
    // Equal sale price is no discount
    assert!(response.body["items"][0].get("discountedPrice").is_none());
}

#[tokio::test]
async fn test_page_past_last_is_not_found() {
    let ctx = TestContext::new().await;
    mock_products(&ctx, Vec::new(), 9).await;

    let tokens = fresh_tokens("access-1", "refresh-1");
    let response = ctx
        .send(request(Method::GET, "/api/products?page=3", Some(&tokens), None))
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_empty_shop_still_has_first_page() {
    let ctx = TestContext::new().await;
    mock_products(&ctx, Vec::new(), 0).await;

    let tokens = fresh_tokens("access-1", "refresh-1");
    let response = ctx
        .send(request(Method::GET, "/api/products", Some(&tokens), None))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["title"], "Products");
    assert_eq!(response.body["summary"], "0 products found");
    assert_eq!(response.body["totalPages"], 1);
}

#[tokio::test]
async fn test_malformed_page_never_reaches_platform() {
    let ctx = TestContext::new().await;
    let tokens = fresh_tokens("access-1", "refresh-1");

    let response = ctx
        .send(request(Method::GET, "/api/products?page=abc", Some(&tokens), None))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(ctx.calls_to(PRODUCTS_QUERY_PATH).await, 0);
}
