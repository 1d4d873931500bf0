//! Integration tests for the Docet Shop storefront.
//!
//! Every test builds the real router through [`docet_storefront::app`] and
//! points its Wix client at a [`wiremock::MockServer`], so the whole
//! middleware stack runs in-process without network access.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p docet-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_flow` - Cart API against a mocked Wix cart
//! - `visitor_session` - Credential issue, renewal and fallback
//! - `back_in_stock` - Restock subscriptions and checkout redirects
//! - `catalog` - Collections and the shop listing
//! - `members` - Member profile reads and edits

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use docet_core::{AccessToken, RefreshToken, SessionTokens, TokenRole};
use docet_storefront::config::{AppEnv, CartConfig, StorefrontConfig, WixConfig};
use docet_storefront::middleware::WIX_SESSION_COOKIE;
use docet_storefront::middleware::visitor_session::{decode_tokens, encode_tokens};
use docet_storefront::state::AppState;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const BASE_URL: &str = "http://shop.test";
pub const CLIENT_ID: &str = "client-test";
pub const TOKEN_PATH: &str = "/oauth2/token";
pub const CURRENT_CART: &str = "/ecom/v1/carts/current";

/// Router wired to a mock Wix API.
pub struct TestContext {
    pub wix: MockServer,
    pub app: Router,
}

impl TestContext {
    pub async fn new() -> Self {
        let wix = MockServer::start().await;
        let app = docet_storefront::app(AppState::new(test_config(&wix.uri())));
        Self { wix, app }
    }

    /// Send one request through the full middleware stack.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Requests received by the mock for one path.
    pub async fn calls_to(&self, route: &str) -> usize {
        self.wix
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == route)
            .count()
    }
}

/// Buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// Tokens persisted by the response's credential cookie, if any.
    pub fn session_tokens(&self) -> Option<SessionTokens> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.strip_prefix(&format!("{WIX_SESSION_COOKIE}=")))
            .filter_map(|v| v.split(';').next())
            .find_map(decode_tokens)
    }

    /// Line quantities of the returned cart, in cart order.
    pub fn quantities(&self) -> Vec<u64> {
        self.body["cart"]["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item["quantity"].as_u64())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Configuration for a storefront talking to `wix_uri`.
pub fn test_config(wix_uri: &str) -> StorefrontConfig {
    StorefrontConfig {
        host: [127, 0, 0, 1].into(),
        port: 0,
        base_url: BASE_URL.to_string(),
        app_env: AppEnv::Development,
        wix: WixConfig {
            client_id: CLIENT_ID.to_string(),
            api_base_url: wix_uri.to_string(),
            stores_app_id: "stores-app".to_string(),
        },
        cart: CartConfig {
            clear_retry_delay: Duration::ZERO,
            ..CartConfig::default()
        },
        rate_limit_enabled: false,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

// =============================================================================
// Credentials
// =============================================================================

/// Visitor tokens whose access token expires at `expires_at`.
pub fn visitor_tokens(access: &str, refresh: &str, expires_at: i64) -> SessionTokens {
    SessionTokens {
        access_token: AccessToken {
            value: access.to_string(),
            expires_at,
        },
        refresh_token: RefreshToken {
            value: refresh.to_string(),
            role: TokenRole::Visitor,
        },
    }
}

/// Visitor tokens valid for the next hour.
pub fn fresh_tokens(access: &str, refresh: &str) -> SessionTokens {
    visitor_tokens(access, refresh, chrono::Utc::now().timestamp() + 3600)
}

/// Logged-in member tokens valid for the next hour.
pub fn member_tokens(access: &str, refresh: &str) -> SessionTokens {
    let mut tokens = fresh_tokens(access, refresh);
    tokens.refresh_token.role = TokenRole::Member;
    tokens
}

/// `Cookie` header value carrying `tokens`.
pub fn cookie_header(tokens: &SessionTokens) -> String {
    format!("{WIX_SESSION_COOKIE}={}", encode_tokens(tokens))
}

/// Request carrying the credential cookie and an optional JSON body.
pub fn request(
    method: Method,
    uri: &str,
    tokens: Option<&SessionTokens>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(tokens) = tokens {
        builder = builder.header(header::COOKIE, cookie_header(tokens));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

// =============================================================================
// Wix Fixtures
// =============================================================================

/// Token endpoint response.
pub fn token_body(access: &str, refresh: &str) -> Value {
    json!({
        "access_token": access,
        "expires_in": 14400,
        "token_type": "Bearer",
        "refresh_token": refresh
    })
}

/// Mount the anonymous grant, answering with the given visitor tokens.
pub async fn mock_visitor_grant(server: &MockServer, access: &str, refresh: &str) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_partial_json(json!({ "grantType": "anonymous" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(access, refresh)))
        .mount(server)
        .await;
}

/// One Wix cart line.
pub fn wire_line(id: &str, quantity: u32, available: Option<u32>) -> Value {
    let mut line = json!({
        "_id": id,
        "quantity": quantity,
        "catalogReference": { "catalogItemId": format!("product-{id}") },
        "productName": { "original": format!("Product {id}") },
        "url": format!("https://shop.test/products/product-{id}"),
        "price": { "amount": "12.50", "formattedAmount": "$12.50" },
        "availability": { "status": "AVAILABLE" }
    });
    if let Some(available) = available {
        line["availability"]["quantityAvailable"] = json!(available);
    }
    line
}

/// Wix cart envelope around `lines`.
pub fn wire_cart(lines: Vec<Value>) -> Value {
    json!({
        "cart": {
            "_id": "cart-1",
            "currency": "USD",
            "lineItems": lines
        }
    })
}
