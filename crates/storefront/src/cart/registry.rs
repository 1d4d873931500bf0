//! Per-session cart state registry.
//!
//! Each platform session (keyed by its refresh token, which survives access
//! token renewals) gets its own cart slot, in-flight tracker and toast queue.
//! Sessions that go idle are evicted; a later request simply starts from an
//! unloaded slot and fetches the cart again.

use moka::future::Cache;

use super::optimistic::InFlight;
use super::store::CartStore;
use crate::config::CartConfig;
use crate::notify::ToastQueue;

/// Cart state shared by every request of one browsing session.
#[derive(Debug, Clone, Default)]
pub struct CartSession {
    pub store: CartStore,
    pub in_flight: InFlight,
    pub toasts: ToastQueue,
}

impl CartSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Registry of [`CartSession`]s.
#[derive(Clone)]
pub struct CartRegistry {
    sessions: Cache<String, CartSession>,
}

impl CartRegistry {
    /// Create a registry sized and timed from configuration.
    #[must_use]
    pub fn new(config: &CartConfig) -> Self {
        let sessions = Cache::builder()
            .max_capacity(config.capacity)
            .time_to_idle(config.idle_timeout)
            .build();

        Self { sessions }
    }

    /// The cart session for `key`, created on first use.
    pub async fn session(&self, key: &str) -> CartSession {
        self.sessions
            .get_with_by_ref(key, async { CartSession::new() })
            .await
    }

    /// Tear down a session's cart state (logout).
    pub async fn evict(&self, key: &str) {
        if let Some(session) = self.sessions.remove(key).await {
            session.store.reset();
            tracing::debug!("Evicted cart session");
        }
    }

    /// Number of cached sessions (approximate until pending tasks run).
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.sessions.entry_count()
    }
}
