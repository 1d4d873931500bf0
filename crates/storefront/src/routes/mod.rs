//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Health check
//!
//! # Cart
//! GET    /api/cart                        - Current cart (fetched lazily)
//! DELETE /api/cart                        - Clear the cart
//! POST   /api/cart/items                  - Add to cart
//! PUT    /api/cart/items/{id}             - Set a line's quantity
//! DELETE /api/cart/items/{id}             - Remove a line
//! POST   /api/cart/items/{id}/increment   - Quantity +1
//! POST   /api/cart/items/{id}/decrement   - Quantity -1
//!
//! # Catalog
//! GET    /api/collections                 - Browsable collections
//! GET    /api/collections/{slug}          - One collection
//! GET    /api/products                    - Shop listing page (8 per page)
//!
//! # Members
//! GET    /api/members/me                  - Logged-in member's profile
//! PATCH  /api/members/me                  - Update first and last name
//!
//! # Checkout
//! POST   /api/checkout                    - Checkout URL for the cart
//! POST   /api/checkout/quick-buy          - Checkout URL for one product
//!
//! # Back in stock
//! POST   /api/back-in-stock               - Subscribe to restock email
//!
//! # Member auth
//! GET    /auth/login                      - Redirect to Wix login
//! GET    /api/auth/callback/wix           - Handle OAuth callback
//! POST   /auth/logout                     - Logout
//! ```
//!
//! Everything except `/health` passes through the Wix session gate.

pub mod auth;
pub mod back_in_stock;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod members;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};

use crate::middleware::{api_rate_limiter, visitor_session_middleware};
use crate::state::AppState;

/// Create the cart API router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(cart::show).delete(cart::clear))
        .route("/cart/items", post(cart::add_item))
        .route(
            "/cart/items/{id}",
            axum::routing::put(cart::update_quantity).delete(cart::remove_item),
        )
        .route("/cart/items/{id}/increment", post(cart::increment))
        .route("/cart/items/{id}/decrement", post(cart::decrement))
}

/// Create the catalog API router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/collections", get(catalog::list_collections))
        .route("/collections/{slug}", get(catalog::show_collection))
        .route("/products", get(catalog::list_products))
}

/// Create the JSON API router.
pub fn api_routes(rate_limited: bool) -> Router<AppState> {
    let api = Router::new()
        .merge(cart_routes())
        .merge(catalog_routes())
        .route("/members/me", get(members::show).patch(members::update))
        .route("/checkout", post(checkout::checkout_cart))
        .route("/checkout/quick-buy", post(checkout::quick_buy))
        .route("/back-in-stock", post(back_in_stock::subscribe))
        .route("/auth/callback/wix", get(auth::callback));

    if rate_limited {
        api.layer(api_rate_limiter())
    } else {
        api
    }
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create all routes for the storefront.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .nest("/api", api_routes(state.config().rate_limit_enabled))
        .nest("/auth", auth_routes())
        .route_layer(from_fn_with_state(
            state.clone(),
            visitor_session_middleware,
        ))
        .route("/health", get(health))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}
