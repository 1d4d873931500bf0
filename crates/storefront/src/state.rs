//! Application state shared across handlers.

use std::sync::Arc;

use crate::cart::{CartRegistry, CartSync, RetryPolicy};
use crate::config::StorefrontConfig;
use crate::middleware::PlatformSession;
use crate::wix::{WixClient, WixSession};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the Wix client, the per-session cart caches and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    wix: WixClient,
    carts: CartRegistry,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        let wix = WixClient::new(&config.wix);
        let carts = CartRegistry::new(&config.cart);

        Self {
            inner: Arc::new(AppStateInner { config, wix, carts }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the Wix API client.
    #[must_use]
    pub fn wix(&self) -> &WixClient {
        &self.inner.wix
    }

    /// Get a reference to the per-session cart registry.
    #[must_use]
    pub fn carts(&self) -> &CartRegistry {
        &self.inner.carts
    }

    /// Cart orchestrator bound to one browsing session.
    pub async fn cart_sync(&self, session: &PlatformSession) -> CartSync<WixSession> {
        let cart_session = self.carts().session(session.key()).await;
        CartSync::new(
            self.wix().session(session.tokens()),
            cart_session,
            RetryPolicy::from(&self.config().cart),
        )
    }
}
