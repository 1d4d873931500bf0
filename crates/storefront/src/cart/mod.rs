//! Cart caching and synchronization.
//!
//! - [`store`] - single-slot cache of the last observed cart
//! - [`optimistic`] - optimistic edits, in-flight tracking, retry policy
//! - [`registry`] - per-session cart state with idle eviction
//! - [`CartSync`] - cached reads and optimistic mutations against the platform

pub mod optimistic;
pub mod registry;
pub mod store;
mod sync;

use docet_core::{LineItemId, QuantityError};
use thiserror::Error;

pub use optimistic::{MutationKey, RetryPolicy};
pub use registry::{CartRegistry, CartSession};
pub use store::{CartState, CartStore, SlotEdit};
pub use sync::{
    ADD_FAILURE, ADD_SUCCESS, CLEAR_FAILURE, CartSync, CartView, REMOVE_FAILURE, REMOVE_SUCCESS,
    UPDATE_FAILURE,
};

use crate::wix::WixError;

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The platform call failed; the cache was rolled back.
    #[error("cart request failed: {0}")]
    Remote(#[from] WixError),

    /// The requested quantity breaks a stock or minimum rule.
    #[error(transparent)]
    Quantity(#[from] QuantityError),

    /// Line quantities must be at least one.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(u32),

    /// The line is not in the cart.
    #[error("line item not in cart: {0}")]
    ItemNotFound(LineItemId),
}
