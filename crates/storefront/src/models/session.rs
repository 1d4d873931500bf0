//! Session-related types.
//!
//! Types stored in the session while a member login is in progress.

use serde::{Deserialize, Serialize};

/// Pending member login, kept between the redirect and the callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthData {
    /// CSRF state echoed back by Wix.
    pub state: String,
    /// PKCE verifier matching the challenge sent to Wix.
    pub code_verifier: String,
    /// Callback URL registered for this login.
    pub redirect_uri: String,
    /// Storefront path to return to after login.
    pub original_uri: String,
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for the pending member login.
    pub const WIX_OAUTH_DATA: &str = "wix_oauth_data";
}
