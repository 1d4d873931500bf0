//! Wix headless platform client.
//!
//! # Architecture
//!
//! - Plain REST over `reqwest`, JSON converted into `docet_core` types
//! - Wix is the source of truth for carts: every mutation returns the
//!   authoritative cart, which replaces whatever the storefront had cached
//! - Calls are made on behalf of a browsing session, identified by the
//!   access token stored in the shopper's session cookie
//! - Catalog reads (collections, product listings) are cached for 5 minutes
//!   using `moka`; searches and member data are never cached
//!
//! # Collaborator traits
//!
//! The cart orchestrator, the session gate and the services depend on the
//! traits below rather than on [`WixClient`] directly, so tests can plug in
//! in-memory fakes.
//!
//! # Example
//!
//! ```rust,ignore
//! use docet_storefront::wix::{AuthApi, CartApi, WixClient};
//!
//! let client = WixClient::new(&config.wix);
//! let tokens = client.generate_visitor_tokens().await?;
//!
//! let session = client.session(&tokens);
//! let cart = session.get_cart().await?;
//! ```

mod cache;
mod client;
pub mod types;

pub use client::{ALL_PRODUCTS_COLLECTION_ID, FEATURED_COLLECTION_ID, WixClient, WixSession};
pub use types::{BackInStockRequest, CheckoutCallbacks, LoginRedirect};

use std::future::Future;

use docet_core::{
    AddToCartValues, CartSnapshot, Collection, LineItemId, MemberId, MemberProfile, MemberUpdate,
    ProductPage, ProductQuery, RefreshToken, SessionTokens,
};
use thiserror::Error;

/// Errors that can occur when interacting with the Wix APIs.
#[derive(Debug, Error)]
pub enum WixError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Non-success response without a domain error code.
    #[error("Wix API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message from the response body, if any.
        message: String,
    },

    /// Domain error reported through `details.applicationError`.
    #[error("Wix application error {code} ({status}): {description}")]
    Application {
        /// HTTP status code.
        status: u16,
        /// Application error code (e.g. `BACK_IN_STOCK_NOTIFICATION_ALREADY_EXISTS`).
        code: String,
        /// Human-readable description.
        description: String,
    },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The access token was rejected.
    #[error("Unauthorized")]
    Unauthorized,

    /// Rate limited by Wix.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

impl WixError {
    /// Application error code, when the platform reported one.
    #[must_use]
    pub fn application_code(&self) -> Option<&str> {
        match self {
            Self::Application { code, .. } => Some(code),
            _ => None,
        }
    }
}

// =============================================================================
// Collaborator Traits
// =============================================================================

/// Operations on the current session's cart.
///
/// Every mutation returns the authoritative cart after the change.
pub trait CartApi: Send + Sync {
    /// Fetch the current cart; `None` when the session has no cart yet.
    fn get_cart(&self) -> impl Future<Output = Result<Option<CartSnapshot>, WixError>> + Send;

    /// Add merchandise to the cart, creating the cart if needed.
    fn add_to_cart(
        &self,
        values: &AddToCartValues,
    ) -> impl Future<Output = Result<CartSnapshot, WixError>> + Send;

    /// Set the quantity of one line.
    fn update_item_quantity(
        &self,
        item: &LineItemId,
        quantity: u32,
    ) -> impl Future<Output = Result<CartSnapshot, WixError>> + Send;

    /// Remove one line.
    fn remove_item(
        &self,
        item: &LineItemId,
    ) -> impl Future<Output = Result<CartSnapshot, WixError>> + Send;

    /// Delete the current cart.
    fn clear_cart(&self) -> impl Future<Output = Result<(), WixError>> + Send;
}

/// Credential issuance for browsing sessions.
pub trait AuthApi: Send + Sync {
    /// Issue an anonymous visitor token pair.
    fn generate_visitor_tokens(
        &self,
    ) -> impl Future<Output = Result<SessionTokens, WixError>> + Send;

    /// Exchange a refresh token for a fresh access token.
    fn renew_token(
        &self,
        refresh_token: &RefreshToken,
    ) -> impl Future<Output = Result<SessionTokens, WixError>> + Send;

    /// Exchange an authorization code for member tokens.
    fn member_tokens(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> impl Future<Output = Result<SessionTokens, WixError>> + Send;
}

/// Back-in-stock notification subscriptions.
pub trait BackInStockApi: Send + Sync {
    /// Subscribe an email address to a product's restock.
    fn create_back_in_stock_request(
        &self,
        request: &BackInStockRequest,
    ) -> impl Future<Output = Result<(), WixError>> + Send;
}

/// Hosted checkout redirects.
pub trait CheckoutApi: Send + Sync {
    /// Checkout URL for the session's current cart.
    fn checkout_url_for_current_cart(
        &self,
        callbacks: &CheckoutCallbacks,
    ) -> impl Future<Output = Result<String, WixError>> + Send;

    /// Checkout URL for a single product, bypassing the cart.
    fn checkout_url_for_product(
        &self,
        values: &AddToCartValues,
        callbacks: &CheckoutCallbacks,
    ) -> impl Future<Output = Result<String, WixError>> + Send;
}

/// Catalog reads for the shop pages.
pub trait CatalogApi: Send + Sync {
    /// Browsable collections, without the built-in "all products" and
    /// "featured" collections.
    fn collections(&self) -> impl Future<Output = Result<Vec<Collection>, WixError>> + Send;

    /// Collection by slug; `None` when no collection has that slug.
    fn collection_by_slug(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<Option<Collection>, WixError>> + Send;

    /// One page of products matching the shop query.
    fn query_products(
        &self,
        query: &ProductQuery,
    ) -> impl Future<Output = Result<ProductPage, WixError>> + Send;
}

/// The logged-in member's own profile.
pub trait MemberApi: Send + Sync {
    /// Profile of the member owning the session's token.
    fn current_member(&self) -> impl Future<Output = Result<MemberProfile, WixError>> + Send;

    /// Update a member's name; returns the updated profile.
    fn update_member(
        &self,
        id: &MemberId,
        update: &MemberUpdate,
    ) -> impl Future<Output = Result<MemberProfile, WixError>> + Send;
}
