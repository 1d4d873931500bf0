//! Cart API handlers.
//!
//! Every response carries the cart as the cache now holds it (after a
//! confirmed write or a rollback) together with the toasts queued for the
//! session, so the front end never needs a second round trip to re-render.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use docet_core::{
    AddToCartValues, AvailabilityStatus, CartSnapshot, CurrencyCode, LineItem, LineItemId, Money,
    ProductId, QuantityControls,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::cart::{CartError, CartSync, CartView};
use crate::error::{AppError, add_breadcrumb};
use crate::middleware::PlatformSession;
use crate::notify::Toast;
use crate::state::AppState;
use crate::wix::WixSession;

// =============================================================================
// Views
// =============================================================================

/// One cart line as rendered by the cart drawer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub id: LineItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub slug: Option<String>,
    pub description_lines: Vec<String>,
    pub quantity: u32,
    pub price: String,
    /// Pre-discount unit price, shown struck through.
    pub full_price: Option<String>,
    pub line_total: String,
    pub image: Option<String>,
    pub availability: AvailabilityStatus,
    pub quantity_available: Option<u32>,
    pub controls: QuantityControls,
}

impl From<&LineItem> for CartItemView {
    fn from(item: &LineItem) -> Self {
        Self {
            id: item.id.clone(),
            product_id: item.product_id.clone(),
            product_name: item.product_name.clone(),
            slug: item.slug.clone(),
            description_lines: item.description_lines.clone(),
            quantity: item.quantity,
            price: item.price.display(),
            full_price: item
                .is_discounted()
                .then(|| item.full_price.as_ref().map(Money::display))
                .flatten(),
            line_total: item.line_total().display(),
            image: item.image.clone(),
            availability: item.availability.status,
            quantity_available: item.availability.quantity_available,
            controls: QuantityControls::for_item(item),
        }
    }
}

/// Cart as rendered by the cart drawer and badge.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartPayload {
    pub items: Vec<CartItemView>,
    pub total_quantity: u32,
    /// Badge text; absent when the cart is empty.
    pub badge_label: Option<String>,
    pub subtotal: Option<String>,
    pub currency: CurrencyCode,
}

impl From<&CartSnapshot> for CartPayload {
    fn from(cart: &CartSnapshot) -> Self {
        let total_quantity = cart.total_quantity();
        Self {
            items: cart.line_items.iter().map(CartItemView::from).collect(),
            total_quantity,
            badge_label: (total_quantity > 0).then(|| cart.badge_label()),
            subtotal: cart.subtotal.as_ref().map(Money::display),
            currency: cart.currency,
        }
    }
}

/// Body of every cart response.
#[derive(Debug, Clone, Serialize)]
pub struct CartResponse {
    pub cart: Option<CartPayload>,
    pub toasts: Vec<Toast>,
}

impl CartResponse {
    fn collect(sync: &CartSync<WixSession>, view: &CartView) -> Self {
        Self {
            cart: view.as_deref().map(CartPayload::from),
            toasts: sync.session().toasts.drain(),
        }
    }
}

/// A failed cart request, still carrying the (rolled back) cart.
pub struct CartFailure {
    error: AppError,
    body: CartResponse,
}

impl IntoResponse for CartFailure {
    fn into_response(self) -> Response {
        self.error.report();
        let body = serde_json::json!({
            "error": self.error.public_message(),
            "cart": self.body.cart,
            "toasts": self.body.toasts,
        });
        (self.error.status(), Json(body)).into_response()
    }
}

type CartResult = Result<Json<CartResponse>, CartFailure>;

fn respond(sync: &CartSync<WixSession>, result: Result<CartView, CartError>) -> CartResult {
    match result {
        Ok(view) => Ok(Json(CartResponse::collect(sync, &view))),
        Err(error) => Err(CartFailure {
            body: CartResponse::collect(sync, &sync.session().store.read()),
            error: error.into(),
        }),
    }
}

// =============================================================================
// Requests
// =============================================================================

const fn default_quantity() -> u32 {
    1
}

/// Add-to-cart form.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

impl From<AddItemRequest> for AddToCartValues {
    fn from(req: AddItemRequest) -> Self {
        Self {
            product_id: req.product_id,
            options: req.options,
            quantity: req.quantity,
        }
    }
}

/// Quantity edit form.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: u32,
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /api/cart`
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: PlatformSession) -> CartResult {
    let sync = state.cart_sync(&session).await;
    let result = sync.cart().await;
    respond(&sync, result)
}

/// `POST /api/cart/items`
#[instrument(skip(state, session, req), fields(product_id = %req.product_id))]
pub async fn add_item(
    State(state): State<AppState>,
    session: PlatformSession,
    Json(req): Json<AddItemRequest>,
) -> CartResult {
    add_breadcrumb(
        "cart",
        "Add to cart",
        Some(&[("product_id", req.product_id.as_str())]),
    );
    let sync = state.cart_sync(&session).await;
    let result = sync.add_item(req.into()).await;
    respond(&sync, result)
}

/// `PUT /api/cart/items/{id}`
#[instrument(skip(state, session))]
pub async fn update_quantity(
    State(state): State<AppState>,
    session: PlatformSession,
    Path(id): Path<String>,
    Json(req): Json<UpdateQuantityRequest>,
) -> CartResult {
    let sync = state.cart_sync(&session).await;
    let result = sync
        .update_quantity(&LineItemId::new(id), req.quantity)
        .await;
    respond(&sync, result)
}

/// `POST /api/cart/items/{id}/increment`
#[instrument(skip(state, session))]
pub async fn increment(
    State(state): State<AppState>,
    session: PlatformSession,
    Path(id): Path<String>,
) -> CartResult {
    let sync = state.cart_sync(&session).await;
    let result = sync.increment(&LineItemId::new(id)).await;
    respond(&sync, result)
}

/// `POST /api/cart/items/{id}/decrement`
#[instrument(skip(state, session))]
pub async fn decrement(
    State(state): State<AppState>,
    session: PlatformSession,
    Path(id): Path<String>,
) -> CartResult {
    let sync = state.cart_sync(&session).await;
    let result = sync.decrement(&LineItemId::new(id)).await;
    respond(&sync, result)
}

/// `DELETE /api/cart/items/{id}`
#[instrument(skip(state, session))]
pub async fn remove_item(
    State(state): State<AppState>,
    session: PlatformSession,
    Path(id): Path<String>,
) -> CartResult {
    let sync = state.cart_sync(&session).await;
    let result = sync.remove_item(&LineItemId::new(id)).await;
    respond(&sync, result)
}

/// `DELETE /api/cart`
#[instrument(skip(state, session))]
pub async fn clear(State(state): State<AppState>, session: PlatformSession) -> CartResult {
    let sync = state.cart_sync(&session).await;
    let result = sync.clear().await.map(|()| None);
    respond(&sync, result)
}
