//! Checkout handlers.
//!
//! Both endpoints answer with the hosted checkout URL; the front end performs
//! the redirect.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;

use crate::error::{AppError, add_breadcrumb};
use crate::middleware::PlatformSession;
use crate::notify::Toast;
use crate::routes::cart::AddItemRequest;
use crate::services::checkout;
use crate::state::AppState;

/// Checkout redirect target.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub redirect_url: String,
    pub toasts: Vec<Toast>,
}

/// `POST /api/checkout`
#[instrument(skip(state, session))]
pub async fn checkout_cart(
    State(state): State<AppState>,
    session: PlatformSession,
) -> Result<Json<CheckoutResponse>, AppError> {
    add_breadcrumb("checkout", "Start cart checkout", None);
    let wix = state.wix().session(session.tokens());
    let toasts = state.carts().session(session.key()).await.toasts;

    let redirect_url =
        checkout::checkout_cart(&wix, &toasts, &state.config().base_url).await?;

    Ok(Json(CheckoutResponse {
        redirect_url,
        toasts: toasts.drain(),
    }))
}

/// `POST /api/checkout/quick-buy`
#[instrument(skip(state, session, req), fields(product_id = %req.product_id))]
pub async fn quick_buy(
    State(state): State<AppState>,
    session: PlatformSession,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CheckoutResponse>, AppError> {
    add_breadcrumb(
        "checkout",
        "Quick buy",
        Some(&[("product_id", req.product_id.as_str())]),
    );
    let wix = state.wix().session(session.tokens());
    let toasts = state.carts().session(session.key()).await.toasts;

    let redirect_url = checkout::quick_buy(
        &wix,
        &toasts,
        &state.config().base_url,
        &req.into(),
    )
    .await?;

    Ok(Json(CheckoutResponse {
        redirect_url,
        toasts: toasts.drain(),
    }))
}
