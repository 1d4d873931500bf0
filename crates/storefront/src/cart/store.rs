//! Per-session cart cache slot.
//!
//! Holds the last observed [`CartSnapshot`] for one browsing session. Every
//! write replaces the snapshot wholesale and bumps a generation counter; a
//! fetch remembers the generation it started at and only lands if nothing
//! was written in between, so a slow read can never clobber an optimistic
//! edit or a confirmed mutation result.

use std::sync::Arc;

use docet_core::CartSnapshot;
use tokio::sync::watch;

/// Observable state of the slot.
#[derive(Debug, Clone, Default)]
pub struct CartState {
    /// Current snapshot; `None` when the session has no cart.
    pub snapshot: Option<Arc<CartSnapshot>>,
    /// Whether the slot has ever been populated.
    pub loaded: bool,
    /// Whether the next read must refetch.
    pub stale: bool,
    /// Incremented on every write.
    pub generation: u64,
}

impl CartState {
    /// Store `snapshot` as loaded and fresh, returning the new generation.
    fn replace(&mut self, snapshot: Option<Arc<CartSnapshot>>) -> u64 {
        self.snapshot = snapshot;
        self.loaded = true;
        self.stale = false;
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }
}

/// Locked view of the slot handed to [`CartStore::update`].
#[derive(Debug)]
pub struct SlotEdit<'a> {
    state: &'a mut CartState,
    changed: bool,
}

impl SlotEdit<'_> {
    /// Snapshot as it stands.
    #[must_use]
    pub fn current(&self) -> Option<&Arc<CartSnapshot>> {
        self.state.snapshot.as_ref()
    }

    /// Replace the snapshot, marking the slot loaded and fresh.
    pub fn write(&mut self, snapshot: Option<Arc<CartSnapshot>>) {
        self.state.replace(snapshot);
        self.changed = true;
    }

    /// Mark the snapshot stale.
    pub fn invalidate(&mut self) {
        self.changed |= !self.state.stale;
        self.state.stale = true;
    }
}

/// Single-slot cart cache shared by all requests of one browsing session.
#[derive(Debug, Clone)]
pub struct CartStore {
    tx: Arc<watch::Sender<CartState>>,
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CartStore {
    /// An empty slot that has never been loaded.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(CartState::default());
        Self { tx: Arc::new(tx) }
    }

    /// A slot pre-populated with server-provided data.
    #[must_use]
    pub fn with_initial(snapshot: Option<CartSnapshot>) -> Self {
        let store = Self::new();
        store.write(snapshot.map(Arc::new));
        store
    }

    /// Current snapshot.
    #[must_use]
    pub fn read(&self) -> Option<Arc<CartSnapshot>> {
        self.tx.borrow().snapshot.clone()
    }

    /// Replace the snapshot, returning the new generation.
    ///
    /// Marks the slot loaded and fresh.
    pub fn write(&self, snapshot: Option<Arc<CartSnapshot>>) -> u64 {
        let mut generation = 0;
        self.tx.send_modify(|state| generation = state.replace(snapshot));
        generation
    }

    /// Write only if no other write happened since `generation` was read.
    ///
    /// Returns whether the snapshot was stored.
    pub fn write_if_current(&self, generation: u64, snapshot: Option<Arc<CartSnapshot>>) -> bool {
        self.tx.send_if_modified(|state| {
            if state.generation != generation {
                return false;
            }
            state.replace(snapshot);
            true
        })
    }

    /// Read, derive and write in one step.
    ///
    /// `f` sees the current snapshot through a [`SlotEdit`] while other
    /// writers are locked out, so whatever it writes is derived from exactly
    /// what it read. `f` must not touch this store.
    pub fn update<T>(&self, f: impl FnOnce(&mut SlotEdit<'_>) -> T) -> T {
        let mut outcome = None;
        self.tx.send_if_modified(|state| {
            let mut slot = SlotEdit {
                state,
                changed: false,
            };
            outcome = Some(f(&mut slot));
            slot.changed
        });
        match outcome {
            Some(value) => value,
            // send_if_modified always runs the closure
            None => unreachable!("store update closure did not run"),
        }
    }

    /// Mark the snapshot stale so the next read refetches.
    pub fn invalidate(&self) {
        self.tx.send_if_modified(|state| {
            let changed = !state.stale;
            state.stale = true;
            changed
        });
    }

    /// Whether a read must go to the platform.
    #[must_use]
    pub fn needs_fetch(&self) -> bool {
        let state = self.tx.borrow();
        !state.loaded || state.stale
    }

    /// Current generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.tx.borrow().generation
    }

    /// Observe changes to the slot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.tx.subscribe()
    }

    /// Drop the snapshot and forget it was ever loaded.
    ///
    /// The generation keeps counting so fetches started before the reset are
    /// discarded.
    pub fn reset(&self) {
        self.tx.send_modify(|state| {
            state.snapshot = None;
            state.loaded = false;
            state.stale = false;
            state.generation = state.generation.wrapping_add(1);
        });
    }
}
