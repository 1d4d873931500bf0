//! Integration tests for the cart API.
//!
//! Each test runs the full storefront router in-process against a mocked
//! Wix cart. Requests carry a valid visitor credential so the session gate
//! never calls the token endpoint.
//!
//! Run with: cargo test -p docet-integration-tests

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use docet_integration_tests::{
    CURRENT_CART, TestContext, fresh_tokens, request, wire_cart, wire_line,
};
use docet_storefront::cart::{ADD_SUCCESS, CLEAR_FAILURE, REMOVE_SUCCESS, UPDATE_FAILURE};
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

fn toast_descriptions(body: &Value) -> Vec<String> {
    body["toasts"]
        .as_array()
        .map(|toasts| {
            toasts
                .iter()
                .filter_map(|t| t["description"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

async fn mock_current_cart(ctx: &TestContext, body: Value) {
    Mock::given(method("GET"))
        .and(path(CURRENT_CART))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&ctx.wix)
        .await;
}

// ============================================================================
// Reads
// ============================================================================

#[tokio::test]
async fn test_cart_is_fetched_once_per_session() {
    let ctx = TestContext::new().await;
    Mock::given(method("GET"))
        .and(path(CURRENT_CART))
        .and(header("authorization", "access-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(wire_cart(vec![wire_line("a", 2, None)])),
        )
        .expect(1)
        .mount(&ctx.wix)
        .await;

    let tokens = fresh_tokens("access-1", "refresh-1");
    let first = ctx
        .send(request(Method::GET, "/api/cart", Some(&tokens), None))
        .await;
    let second = ctx
        .send(request(Method::GET, "/api/cart", Some(&tokens), None))
        .await;

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["cart"]["totalQuantity"], 2);
    assert_eq!(first.body["cart"]["badgeLabel"], "2");
    assert_eq!(second.body, first.body);
}

#[tokio::test]
async fn test_sessions_do_not_share_a_cart_cache() {
    let ctx = TestContext::new().await;
    mock_current_cart(&ctx, wire_cart(vec![wire_line("a", 1, None)])).await;

    let alice = fresh_tokens("access-a", "refresh-a");
    let bob = fresh_tokens("access-b", "refresh-b");
    ctx.send(request(Method::GET, "/api/cart", Some(&alice), None))
        .await;
    ctx.send(request(Method::GET, "/api/cart", Some(&bob), None))
        .await;

    assert_eq!(ctx.calls_to(CURRENT_CART).await, 2);
}

#[tokio::test]
async fn test_missing_cart_is_empty() {
    let ctx = TestContext::new().await;
    Mock::given(method("GET"))
        .and(path(CURRENT_CART))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "cart not found"
        })))
        .mount(&ctx.wix)
        .await;

    let tokens = fresh_tokens("access-1", "refresh-1");
    let response = ctx
        .send(request(Method::GET, "/api/cart", Some(&tokens), None))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["cart"].is_null());
}

#[tokio::test]
async fn test_failed_fetch_is_retried_on_next_read() {
    let ctx = TestContext::new().await;
    Mock::given(method("GET"))
        .and(path(CURRENT_CART))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&ctx.wix)
        .await;
    mock_current_cart(&ctx, wire_cart(vec![wire_line("a", 3, None)])).await;

    let tokens = fresh_tokens("access-1", "refresh-1");
    let failed = ctx
        .send(request(Method::GET, "/api/cart", Some(&tokens), None))
        .await;
    assert_eq!(failed.status, StatusCode::BAD_GATEWAY);
    assert_eq!(failed.body["error"], "External service error");

    let recovered = ctx
        .send(request(Method::GET, "/api/cart", Some(&tokens), None))
        .await;
    assert_eq!(recovered.status, StatusCode::OK);
    assert_eq!(recovered.quantities(), vec![3]);
}

// ============================================================================
// Mutations
// ============================================================================

#[tokio::test]
async fn test_add_item_adopts_platform_cart() {
    let ctx = TestContext::new().await;
    Mock::given(method("POST"))
        .and(path(format!("{CURRENT_CART}/add-to-cart")))
        .and(body_json(json!({
            "lineItems": [{
                "quantity": 2,
                "catalogReference": {
                    "appId": "stores-app",
                    "catalogItemId": "product-a"
                }
            }]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(wire_cart(vec![wire_line("a", 2, None)])),
        )
        .expect(1)
        .mount(&ctx.wix)
        .await;

    let tokens = fresh_tokens("access-1", "refresh-1");
    let response = ctx
        .send(request(
            Method::POST,
            "/api/cart/items",
            Some(&tokens),
            Some(json!({ "productId": "product-a", "quantity": 2 })),
        ))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.quantities(), vec![2]);
    assert_eq!(toast_descriptions(&response.body), vec![ADD_SUCCESS]);
}

#[tokio::test]
async fn test_zero_quantity_add_never_reaches_platform() {
    let ctx = TestContext::new().await;
    let tokens = fresh_tokens("access-1", "refresh-1");

    let response = ctx
        .send(request(
            Method::POST,
            "/api/cart/items",
            Some(&tokens),
            Some(json!({ "productId": "product-a", "quantity": 0 })),
        ))
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(ctx.wix.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_update_restores_previous_quantity() {
    let ctx = TestContext::new().await;
    mock_current_cart(&ctx, wire_cart(vec![wire_line("a", 1, Some(5))])).await;
    Mock::given(method("POST"))
        .and(path(format!("{CURRENT_CART}/update-line-items-quantity")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&ctx.wix)
        .await;

    let tokens = fresh_tokens("access-1", "refresh-1");
    let response = ctx
        .send(request(
            Method::PUT,
            "/api/cart/items/a",
            Some(&tokens),
            Some(json!({ "quantity": 3 })),
        ))
        .await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(response.quantities(), vec![1]);
    assert_eq!(toast_descriptions(&response.body), vec![UPDATE_FAILURE]);
}

#[tokio::test]
async fn test_increment_at_stock_ceiling_is_rejected() {
    let ctx = TestContext::new().await;
    mock_current_cart(&ctx, wire_cart(vec![wire_line("a", 2, Some(2))])).await;
    Mock::given(method("POST"))
        .and(path(format!("{CURRENT_CART}/update-line-items-quantity")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&ctx.wix)
        .await;

    let tokens = fresh_tokens("access-1", "refresh-1");
    let response = ctx
        .send(request(
            Method::POST,
            "/api/cart/items/a/increment",
            Some(&tokens),
            None,
        ))
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.quantities(), vec![2]);
}

#[tokio::test]
async fn test_decrement_confirms_with_refetch() {
    let ctx = TestContext::new().await;
    Mock::given(method("GET"))
        .and(path(CURRENT_CART))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(wire_cart(vec![wire_line("a", 3, None)])),
        )
        .up_to_n_times(1)
        .mount(&ctx.wix)
        .await;
    mock_current_cart(&ctx, wire_cart(vec![wire_line("a", 2, None)])).await;
    Mock::given(method("POST"))
        .and(path(format!("{CURRENT_CART}/update-line-items-quantity")))
        .and(body_json(json!({
            "lineItems": [{ "_id": "a", "quantity": 2 }]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(wire_cart(vec![wire_line("a", 2, None)])),
        )
        .expect(1)
        .mount(&ctx.wix)
        .await;

    let tokens = fresh_tokens("access-1", "refresh-1");
    let response = ctx
        .send(request(
            Method::POST,
            "/api/cart/items/a/decrement",
            Some(&tokens),
            None,
        ))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.quantities(), vec![2]);
    // Initial load plus the confirming refetch
    assert_eq!(ctx.calls_to(CURRENT_CART).await, 2);
}

#[tokio::test]
async fn test_concurrent_increments_on_one_session_both_count() {
    let ctx = TestContext::new().await;
    Mock::given(method("GET"))
        .and(path(CURRENT_CART))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(wire_cart(vec![wire_line("a", 1, None)])),
        )
        .up_to_n_times(1)
        .mount(&ctx.wix)
        .await;
    mock_current_cart(&ctx, wire_cart(vec![wire_line("a", 3, None)])).await;
    for quantity in [2, 3] {
        Mock::given(method("POST"))
            .and(path(format!("{CURRENT_CART}/update-line-items-quantity")))
            .and(body_json(json!({
                "lineItems": [{ "_id": "a", "quantity": quantity }]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(wire_cart(vec![wire_line("a", quantity, None)])),
            )
            .expect(1)
            .mount(&ctx.wix)
            .await;
    }

    let tokens = fresh_tokens("access-1", "refresh-1");
    ctx.send(request(Method::GET, "/api/cart", Some(&tokens), None))
        .await;

    let increment = || {
        request(
            Method::POST,
            "/api/cart/items/a/increment",
            Some(&tokens),
            None,
        )
    };
    let (first, second) = tokio::join!(ctx.send(increment()), ctx.send(increment()));
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(second.status, StatusCode::OK);

    let cart = ctx
        .send(request(Method::GET, "/api/cart", Some(&tokens), None))
        .await;
    assert_eq!(cart.quantities(), vec![3]);
    assert_eq!(
        ctx.calls_to(&format!("{CURRENT_CART}/update-line-items-quantity"))
            .await,
        2
    );
}

#[tokio::test]
async fn test_update_unknown_line_is_not_found() {
    let ctx = TestContext::new().await;
    mock_current_cart(&ctx, wire_cart(vec![wire_line("a", 1, None)])).await;

    let tokens = fresh_tokens("access-1", "refresh-1");
    let response = ctx
        .send(request(
            Method::PUT,
            "/api/cart/items/zzz",
            Some(&tokens),
            Some(json!({ "quantity": 2 })),
        ))
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_remove_item() {
    let ctx = TestContext::new().await;
    mock_current_cart(
        &ctx,
        wire_cart(vec![wire_line("a", 1, None), wire_line("b", 4, None)]),
    )
    .await;
    Mock::given(method("POST"))
        .and(path(format!("{CURRENT_CART}/remove-line-items")))
        .and(body_json(json!({ "lineItemIds": ["a"] })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(wire_cart(vec![wire_line("b", 4, None)])),
        )
        .expect(1)
        .mount(&ctx.wix)
        .await;

    let tokens = fresh_tokens("access-1", "refresh-1");
    let response = ctx
        .send(request(
            Method::DELETE,
            "/api/cart/items/a",
            Some(&tokens),
            None,
        ))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.quantities(), vec![4]);
    assert_eq!(toast_descriptions(&response.body), vec![REMOVE_SUCCESS]);
    assert_eq!(response.body["toasts"][0]["durationMs"], 1000);
}

// ============================================================================
// Clear
// ============================================================================

#[tokio::test]
async fn test_clear_retries_until_success() {
    let ctx = TestContext::new().await;
    Mock::given(method("DELETE"))
        .and(path(CURRENT_CART))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&ctx.wix)
        .await;
    Mock::given(method("DELETE"))
        .and(path(CURRENT_CART))
        .respond_with(ResponseTemplate::new(204))
        .mount(&ctx.wix)
        .await;

    let tokens = fresh_tokens("access-1", "refresh-1");
    let response = ctx
        .send(request(Method::DELETE, "/api/cart", Some(&tokens), None))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["cart"].is_null());
    assert_eq!(ctx.calls_to(CURRENT_CART).await, 3);
}

#[tokio::test]
async fn test_clear_gives_up_after_three_attempts() {
    let ctx = TestContext::new().await;
    Mock::given(method("DELETE"))
        .and(path(CURRENT_CART))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&ctx.wix)
        .await;

    let tokens = fresh_tokens("access-1", "refresh-1");
    let response = ctx
        .send(request(Method::DELETE, "/api/cart", Some(&tokens), None))
        .await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(toast_descriptions(&response.body), vec![CLEAR_FAILURE]);
}
