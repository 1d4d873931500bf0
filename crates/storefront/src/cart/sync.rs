//! Cart orchestrator: cached reads and optimistic mutations.
//!
//! [`CartSync`] binds one browsing session's [`CartSession`] to a
//! [`CartApi`]. Reads are served from the cache unless it was never loaded or
//! was invalidated. Mutations edit the cache first, call the platform, then
//! either adopt the platform's cart or restore the exact snapshot that was
//! replaced.

use std::future::Future;
use std::sync::Arc;

use docet_core::types::quantity::{check_target, decrement_target, increment_target};
use docet_core::{AddToCartValues, CartSnapshot, LineItem, LineItemId, MIN_LINE_QUANTITY};
use tracing::instrument;

use super::CartError;
use super::optimistic::{
    InFlightGuard, MutationKey, MutationKind, MutationPlan, OptimisticEdit, RetryPolicy,
};
use super::registry::CartSession;
use crate::notify::{Notifier, Toast};
use crate::wix::{CartApi, WixError};

pub const ADD_SUCCESS: &str = "Item added to cart";
pub const ADD_FAILURE: &str = "Failed to add item to cart. Please try again";
pub const UPDATE_FAILURE: &str = "Failed to update item quantity. Please try again";
pub const REMOVE_SUCCESS: &str = "Item removed from cart";
pub const REMOVE_FAILURE: &str = "Failed to remove item from cart. Please try again";
pub const CLEAR_FAILURE: &str = "Failed to clear cart. Please try again";

/// Display time of the removal toast.
const REMOVE_TOAST_MS: u64 = 1000;

/// Cart snapshot visible after an operation.
pub type CartView = Option<Arc<CartSnapshot>>;

/// Cart operations for one browsing session.
pub struct CartSync<A> {
    api: A,
    session: CartSession,
    retry: RetryPolicy,
}

impl<A: CartApi> CartSync<A> {
    #[must_use]
    pub const fn new(api: A, session: CartSession, retry: RetryPolicy) -> Self {
        Self {
            api,
            session,
            retry,
        }
    }

    /// The session state this orchestrator writes to.
    #[must_use]
    pub const fn session(&self) -> &CartSession {
        &self.session
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current cart, fetching only when the cache is empty or stale.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Remote`] if a required fetch fails.
    pub async fn cart(&self) -> Result<CartView, CartError> {
        if self.session.store.needs_fetch() {
            return self.refresh().await;
        }
        Ok(self.session.store.read())
    }

    /// Refetch the cart unconditionally.
    ///
    /// A result overtaken by a mutation is discarded in favour of the newer
    /// cache contents.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Remote`] if the fetch fails; the cache stays stale.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<CartView, CartError> {
        let started_at = self.session.store.generation();

        match self.api.get_cart().await {
            Ok(cart) => {
                let snapshot = cart.map(Arc::new);
                if self
                    .session
                    .store
                    .write_if_current(started_at, snapshot.clone())
                {
                    Ok(snapshot)
                } else {
                    tracing::debug!("Discarded cart fetch overtaken by a mutation");
                    Ok(self.session.store.read())
                }
            }
            Err(e) => {
                self.session.store.invalidate();
                tracing::warn!(error = %e, "Failed to fetch cart");
                Err(e.into())
            }
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add merchandise to the cart.
    ///
    /// # Errors
    ///
    /// Rejects zero quantities and adds that would push a matching line past
    /// its stock ceiling before any request; returns [`CartError::Remote`] if
    /// the platform call fails.
    #[instrument(skip(self, values), fields(product_id = %values.product_id, quantity = values.quantity))]
    pub async fn add_item(&self, values: AddToCartValues) -> Result<CartView, CartError> {
        if values.quantity < MIN_LINE_QUANTITY {
            return Err(CartError::InvalidQuantity(values.quantity));
        }

        let plan = MutationPlan {
            kind: MutationKind::AddItem,
            coalesce: None,
        };
        let api = &self.api;
        self.run(
            plan,
            move |current| {
                if let Some(existing) =
                    current.and_then(|c| c.line_items.iter().find(|i| i.matches(&values)))
                {
                    check_target(existing, existing.quantity.saturating_add(values.quantity))?;
                }
                Ok(Some((OptimisticEdit::Add(values.clone()), values)))
            },
            move |values| async move { api.add_to_cart(&values).await.map(Some) },
        )
        .await
    }

    /// Set a line's quantity.
    ///
    /// Quantity edits coalesce: while several are in flight only the last to
    /// settle adopts the platform's cart and issues one confirming refetch.
    ///
    /// # Errors
    ///
    /// Rejects zero and quantities above a known stock ceiling before any
    /// request, and lines missing from the cart.
    #[instrument(skip(self, item), fields(item = %item))]
    pub async fn update_quantity(
        &self,
        item: &LineItemId,
        quantity: u32,
    ) -> Result<CartView, CartError> {
        if quantity < MIN_LINE_QUANTITY {
            return Err(CartError::InvalidQuantity(quantity));
        }

        self.dispatch_quantity(item, |line| {
            check_target(line, quantity)?;
            Ok(quantity)
        })
        .await
    }

    /// Raise a line's quantity by one.
    ///
    /// The step is taken from the cart as it stands when the edit is applied,
    /// so concurrent increments each add one.
    ///
    /// # Errors
    ///
    /// Rejects the move when the line is at its stock ceiling.
    #[instrument(skip(self, item), fields(item = %item))]
    pub async fn increment(&self, item: &LineItemId) -> Result<CartView, CartError> {
        self.dispatch_quantity(item, |line| Ok(increment_target(line)?))
            .await
    }

    /// Lower a line's quantity by one.
    ///
    /// # Errors
    ///
    /// Rejects the move when the line holds a single unit.
    #[instrument(skip(self, item), fields(item = %item))]
    pub async fn decrement(&self, item: &LineItemId) -> Result<CartView, CartError> {
        self.dispatch_quantity(item, |line| Ok(decrement_target(line)?))
            .await
    }

    /// Coalesced quantity edit; `target` picks the new quantity from the line.
    async fn dispatch_quantity(
        &self,
        item: &LineItemId,
        target: impl FnOnce(&LineItem) -> Result<u32, CartError>,
    ) -> Result<CartView, CartError> {
        self.cart().await?;

        let plan = MutationPlan {
            kind: MutationKind::UpdateQuantity,
            coalesce: Some(MutationKey::UPDATE_QUANTITY),
        };
        let api = &self.api;
        self.run(
            plan,
            |current| {
                let line = current
                    .and_then(|c| c.item(item))
                    .ok_or_else(|| CartError::ItemNotFound(item.clone()))?;
                let quantity = target(line)?;
                Ok(Some((OptimisticEdit::SetQuantity(item.clone(), quantity), quantity)))
            },
            move |quantity| async move {
                api.update_item_quantity(item, quantity).await.map(Some)
            },
        )
        .await
    }

    /// Remove a line.
    ///
    /// Removing a line the cart does not hold succeeds without a request. A
    /// line the platform no longer knows about counts as removed.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Remote`] if the platform call fails.
    #[instrument(skip(self, item), fields(item = %item))]
    pub async fn remove_item(&self, item: &LineItemId) -> Result<CartView, CartError> {
        self.cart().await?;

        let plan = MutationPlan {
            kind: MutationKind::RemoveItem,
            coalesce: None,
        };
        let api = &self.api;
        self.run(
            plan,
            |current| {
                if current.and_then(|c| c.item(item)).is_none() {
                    tracing::debug!("Line not in cart, nothing to remove");
                    return Ok(None);
                }
                Ok(Some((OptimisticEdit::Remove(item.clone()), ())))
            },
            move |()| async move {
                match api.remove_item(item).await {
                    Ok(cart) => Ok(Some(cart)),
                    Err(WixError::NotFound(_)) => Ok(None),
                    Err(e) => Err(e),
                }
            },
        )
        .await
    }

    /// Delete the whole cart, retrying per the configured policy.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Remote`] once every attempt failed.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), CartError> {
        let mut attempt = 1;
        loop {
            match self.api.clear_cart().await {
                Ok(()) => {
                    self.session.store.write(None);
                    self.session.store.invalidate();
                    return Ok(());
                }
                Err(e) if attempt < self.retry.attempts => {
                    tracing::warn!(error = %e, attempt, "Failed to clear cart, retrying");
                    tokio::time::sleep(self.retry.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, attempts = attempt, "Failed to clear cart");
                    self.session.toasts.notify(Toast::destructive(CLEAR_FAILURE));
                    return Err(e.into());
                }
            }
        }
    }

    /// Forget the cached cart (logout).
    pub fn reset(&self) {
        self.session.store.reset();
    }

    // =========================================================================
    // Runner
    // =========================================================================

    /// Run one mutation.
    ///
    /// `prepare` sees the cart as it stands and returns the optimistic edit
    /// plus the request to send, or `None` when there is nothing to do. The
    /// edit is applied and the mutation registered in flight in the same
    /// step, so concurrent mutations always build on each other's edits.
    ///
    /// `remote` resolves to the platform's cart after the change, or `None`
    /// when the platform gave no cart back and the cache must be refetched.
    async fn run<T, P, R, F>(
        &self,
        plan: MutationPlan,
        prepare: P,
        remote: R,
    ) -> Result<CartView, CartError>
    where
        P: FnOnce(Option<&CartSnapshot>) -> Result<Option<(OptimisticEdit, T)>, CartError>,
        R: FnOnce(T) -> F,
        F: Future<Output = Result<Option<CartSnapshot>, WixError>>,
    {
        let store = &self.session.store;
        let in_flight = &self.session.in_flight;

        let staged = store.update(|slot| -> Result<_, CartError> {
            let previous = slot.current().cloned();
            let Some((edit, request)) = prepare(previous.as_deref())? else {
                return Ok(None);
            };
            if let Some(edited) = previous.as_deref().and_then(|c| edit.apply(c)) {
                slot.write(Some(Arc::new(edited)));
            }
            let guard = plan.coalesce.map(|key| in_flight.begin(key));
            Ok(Some((previous, request, guard)))
        })?;
        let Some((previous, request, mut guard)) = staged else {
            return Ok(store.read());
        };

        if let Some(guard) = guard.as_mut() {
            guard.wait_turn().await;
        }
        let result = remote(request).await;

        // Settling and writing share one step so a sibling staged in between
        // builds on the cart written here
        let last = store.update(|slot| {
            // `None` for mutations that do not coalesce
            let last = guard.map(InFlightGuard::settle);
            match &result {
                Ok(Some(cart)) if last != Some(false) => slot.write(Some(Arc::new(cart.clone()))),
                // A sibling is still in flight and will confirm
                Ok(Some(_)) => {}
                Ok(None) => slot.invalidate(),
                Err(_) => slot.write(previous),
            }
            last
        });

        match result {
            Ok(confirmed) => {
                if confirmed.is_none() || last == Some(true) {
                    self.confirm().await;
                }
                self.notify_success(plan.kind);
                Ok(store.read())
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    mutation = plan.kind.as_str(),
                    "Cart mutation failed, rolled back"
                );
                self.notify_failure(plan.kind);
                if last == Some(true) {
                    self.confirm().await;
                }
                Err(e.into())
            }
        }
    }

    /// Confirming refetch; failures leave the cache stale for the next read.
    async fn confirm(&self) {
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "Confirming cart refetch failed");
        }
    }

    fn notify_success(&self, kind: MutationKind) {
        let toast = match kind {
            MutationKind::AddItem => Toast::success(ADD_SUCCESS),
            MutationKind::RemoveItem => Toast::success(REMOVE_SUCCESS).with_duration(REMOVE_TOAST_MS),
            MutationKind::UpdateQuantity => return,
        };
        self.session.toasts.notify(toast);
    }

    fn notify_failure(&self, kind: MutationKind) {
        let description = match kind {
            MutationKind::AddItem => ADD_FAILURE,
            MutationKind::UpdateQuantity => UPDATE_FAILURE,
            MutationKind::RemoveItem => REMOVE_FAILURE,
        };
        self.session.toasts.notify(Toast::destructive(description));
    }
}
