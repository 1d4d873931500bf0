//! Hosted checkout.
//!
//! Both flows end in a Wix-hosted checkout page; the storefront only needs
//! the redirect URL.

use docet_core::{AddToCartValues, MIN_LINE_QUANTITY};
use thiserror::Error;
use tracing::instrument;

use crate::notify::{Notifier, Toast};
use crate::wix::{CheckoutApi, CheckoutCallbacks, WixError};

pub const CHECKOUT_FAILURE_TITLE: &str = "Failed to start checkout flow";

/// Checkout failures.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("invalid quantity: {0}")]
    InvalidQuantity(u32),

    #[error("checkout failed: {0}")]
    Remote(#[from] WixError),
}

/// Redirect URL for the session's current cart.
///
/// # Errors
///
/// Returns [`CheckoutError::Remote`] and queues a toast if Wix refuses.
#[instrument(skip(api, notifier))]
pub async fn checkout_cart<A: CheckoutApi, N: Notifier>(
    api: &A,
    notifier: &N,
    base_url: &str,
) -> Result<String, CheckoutError> {
    let callbacks = CheckoutCallbacks::for_site(base_url);
    api.checkout_url_for_current_cart(&callbacks)
        .await
        .map_err(|e| failed(notifier, e))
}

/// Redirect URL for buying one product directly.
///
/// # Errors
///
/// Rejects zero quantities before any request; returns
/// [`CheckoutError::Remote`] and queues a toast if Wix refuses.
#[instrument(skip(api, notifier, values), fields(product_id = %values.product_id))]
pub async fn quick_buy<A: CheckoutApi, N: Notifier>(
    api: &A,
    notifier: &N,
    base_url: &str,
    values: &AddToCartValues,
) -> Result<String, CheckoutError> {
    if values.quantity < MIN_LINE_QUANTITY {
        return Err(CheckoutError::InvalidQuantity(values.quantity));
    }

    let callbacks = CheckoutCallbacks::for_site(base_url);
    api.checkout_url_for_product(values, &callbacks)
        .await
        .map_err(|e| failed(notifier, e))
}

fn failed<N: Notifier>(notifier: &N, err: WixError) -> CheckoutError {
    tracing::error!(error = %err, "Failed to start checkout");
    notifier.notify(Toast::destructive_title(CHECKOUT_FAILURE_TITLE));
    CheckoutError::Remote(err)
}
