//! Building blocks for optimistic cart mutations.
//!
//! A mutation may apply a local edit before its remote call resolves; the
//! snapshot it replaced is kept so a failure can restore it exactly.
//! Mutations that share a [`MutationKey`] coalesce: only the last one to
//! settle triggers the confirming refetch. They also reach the platform one
//! at a time in the order their edits were applied, so absolute quantities
//! computed from the optimistic cart land in sequence.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use docet_core::{AddToCartValues, CartSnapshot, LineItemId};
use tokio::sync::oneshot;

use crate::config::CartConfig;

/// Identifies a family of mutations that coalesce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MutationKey(&'static str);

impl MutationKey {
    /// Quantity edits of any line.
    pub const UPDATE_QUANTITY: Self = Self("update-cart-item-quantity");

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for MutationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Kind of cart mutation, used for logging and notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    AddItem,
    UpdateQuantity,
    RemoveItem,
}

impl MutationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AddItem => "add_item",
            Self::UpdateQuantity => "update_quantity",
            Self::RemoveItem => "remove_item",
        }
    }
}

/// Local edit applied before the remote call resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptimisticEdit {
    /// Fold an add-to-cart into a matching line.
    Add(AddToCartValues),
    /// Replace one line's quantity.
    SetQuantity(LineItemId, u32),
    /// Drop one line.
    Remove(LineItemId),
}

impl OptimisticEdit {
    /// The edited snapshot, or `None` when the edit has no local effect.
    #[must_use]
    pub fn apply(&self, snapshot: &CartSnapshot) -> Option<CartSnapshot> {
        match self {
            Self::Add(values) => snapshot.with_added(values),
            Self::SetQuantity(id, quantity) => snapshot
                .item(id)
                .map(|_| snapshot.with_quantity(id, *quantity)),
            Self::Remove(id) => snapshot.item(id).map(|_| snapshot.without_item(id)),
        }
    }
}

/// How one mutation is run.
#[derive(Debug, Clone, Copy)]
pub struct MutationPlan {
    pub kind: MutationKind,
    /// Coalescing family, if any.
    pub coalesce: Option<MutationKey>,
}

// =============================================================================
// In-flight Tracking
// =============================================================================

/// Mutations of one key that have not settled.
#[derive(Debug, Default)]
struct Lane {
    count: usize,
    /// Fires when the most recently begun mutation settles.
    tail: Option<oneshot::Receiver<()>>,
}

/// Per-key count of mutations still awaiting their remote call.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    lanes: Arc<Mutex<HashMap<MutationKey, Lane>>>,
}

impl InFlight {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mutation as in flight, queued behind those already begun.
    #[must_use]
    pub fn begin(&self, key: MutationKey) -> InFlightGuard {
        let (done, settled_rx) = oneshot::channel();
        let mut lanes = self.lanes.lock().unwrap_or_else(PoisonError::into_inner);
        let lane = lanes.entry(key).or_default();
        lane.count += 1;
        let after = lane.tail.replace(settled_rx);

        InFlightGuard {
            in_flight: self.clone(),
            key,
            after,
            _done: done,
            settled: false,
        }
    }

    /// Mutations with `key` still in flight.
    #[must_use]
    pub fn count(&self, key: MutationKey) -> usize {
        self.lanes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .map_or(0, |lane| lane.count)
    }

    /// Decrement and return what is left.
    fn finish(&self, key: MutationKey) -> usize {
        let mut lanes = self.lanes.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(lane) = lanes.get_mut(&key) else {
            return 0;
        };
        lane.count = lane.count.saturating_sub(1);
        let remaining = lane.count;
        if remaining == 0 {
            lanes.remove(&key);
        }
        remaining
    }
}

/// Marks one mutation in flight until settled or dropped.
#[derive(Debug)]
#[must_use = "dropping the guard settles the mutation immediately"]
pub struct InFlightGuard {
    in_flight: InFlight,
    key: MutationKey,
    /// Settles with the mutation begun just before this one.
    after: Option<oneshot::Receiver<()>>,
    /// Dropped on settle, releasing the next mutation.
    _done: oneshot::Sender<()>,
    settled: bool,
}

impl InFlightGuard {
    /// Wait until every mutation begun earlier with the same key settled.
    pub async fn wait_turn(&mut self) {
        if let Some(after) = self.after.as_mut() {
            // Err only means the sender was dropped, which is the signal
            let _ = after.await;
            self.after = None;
        }
    }

    /// Settle the mutation; `true` when it was the last one with its key.
    pub fn settle(mut self) -> bool {
        self.settled = true;
        self.in_flight.finish(self.key) == 0
    }

    #[must_use]
    pub const fn key(&self) -> MutationKey {
        self.key
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        // Cancelled before the remote call resolved
        if !self.settled {
            self.in_flight.finish(self.key);
        }
    }
}

// =============================================================================
// Retry Policy
// =============================================================================

/// Fixed-delay retry for idempotent cart operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }
}

impl From<&CartConfig> for RetryPolicy {
    fn from(config: &CartConfig) -> Self {
        Self::new(config.clear_attempts.max(1), config.clear_retry_delay)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use docet_core::ProductId;

    use super::*;
    use crate::cart::test_support::{cart, line};

    #[test]
    fn test_last_guard_reports_last() {
        let in_flight = InFlight::new();
        let first = in_flight.begin(MutationKey::UPDATE_QUANTITY);
        let second = in_flight.begin(MutationKey::UPDATE_QUANTITY);
        assert_eq!(in_flight.count(MutationKey::UPDATE_QUANTITY), 2);

        assert!(!first.settle());
        assert!(second.settle());
        assert_eq!(in_flight.count(MutationKey::UPDATE_QUANTITY), 0);
    }

    #[test]
    fn test_dropped_guard_releases_slot() {
        let in_flight = InFlight::new();
        let survivor = in_flight.begin(MutationKey::UPDATE_QUANTITY);
        drop(in_flight.begin(MutationKey::UPDATE_QUANTITY));
        assert_eq!(in_flight.count(MutationKey::UPDATE_QUANTITY), 1);
        assert!(survivor.settle());
    }

    #[tokio::test]
    async fn test_guards_take_turns_in_begin_order() {
        let in_flight = InFlight::new();
        let mut first = in_flight.begin(MutationKey::UPDATE_QUANTITY);
        let mut second = in_flight.begin(MutationKey::UPDATE_QUANTITY);

        first.wait_turn().await;
        let waiting = tokio::time::timeout(Duration::from_millis(20), second.wait_turn()).await;
        assert!(waiting.is_err());

        assert!(!first.settle());
        second.wait_turn().await;
        assert!(second.settle());
    }

    #[tokio::test]
    async fn test_cancelled_guard_releases_successor() {
        let in_flight = InFlight::new();
        let first = in_flight.begin(MutationKey::UPDATE_QUANTITY);
        let mut second = in_flight.begin(MutationKey::UPDATE_QUANTITY);

        drop(first);
        second.wait_turn().await;
        assert!(second.settle());
    }

    #[test]
    fn test_edits_apply_to_snapshot() {
        let snapshot = cart(vec![line("a", 1, None), line("b", 2, None)]);

        let set = OptimisticEdit::SetQuantity(LineItemId::new("a"), 5);
        assert_eq!(set.apply(&snapshot).unwrap().total_quantity(), 7);

        let remove = OptimisticEdit::Remove(LineItemId::new("b"));
        assert_eq!(remove.apply(&snapshot).unwrap().line_items.len(), 1);

        let add = OptimisticEdit::Add(AddToCartValues {
            product_id: ProductId::new("product-a"),
            options: BTreeMap::new(),
            quantity: 2,
        });
        assert_eq!(add.apply(&snapshot).unwrap().total_quantity(), 5);
    }

    #[test]
    fn test_edits_on_unknown_lines_do_nothing() {
        let snapshot = cart(vec![line("a", 1, None)]);
        assert!(
            OptimisticEdit::SetQuantity(LineItemId::new("zz"), 3)
                .apply(&snapshot)
                .is_none()
        );
        assert!(
            OptimisticEdit::Remove(LineItemId::new("zz"))
                .apply(&snapshot)
                .is_none()
        );
    }

    #[test]
    fn test_retry_policy_from_config() {
        let config = CartConfig {
            clear_attempts: 0,
            ..CartConfig::default()
        };
        assert_eq!(RetryPolicy::from(&config).attempts, 1);
        assert_eq!(RetryPolicy::default(), RetryPolicy::from(&CartConfig::default()));
    }
}
