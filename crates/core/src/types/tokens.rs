//! Platform session credentials.
//!
//! The storefront holds one token pair per browsing session: a short-lived
//! access token and a refresh token. Visitors get an anonymous pair; members
//! get one after logging in. The pair is persisted as a JSON blob in the
//! shopper's session cookie, so the serialized shape is part of the cookie
//! format and must stay stable.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who a token pair belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TokenRole {
    /// Anonymous visitor session.
    #[default]
    Visitor,
    /// Logged-in site member.
    Member,
}

/// Bearer token for platform API calls.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    /// Token value.
    pub value: String,
    /// Expiry as a Unix timestamp in seconds.
    pub expires_at: i64,
}

/// Long-lived token used to obtain new access tokens.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    /// Token value.
    pub value: String,
    /// Session role.
    #[serde(default)]
    pub role: TokenRole,
}

/// Access/refresh token pair persisted in the session cookie.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokens {
    /// Current access token.
    pub access_token: AccessToken,
    /// Refresh token.
    pub refresh_token: RefreshToken,
}

impl SessionTokens {
    /// Whether the access token expired strictly before `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.access_token.expires_at < now.timestamp()
    }

    /// Role of the session.
    #[must_use]
    pub const fn role(&self) -> TokenRole {
        self.refresh_token.role
    }

    /// Stable key identifying the platform session (survives renewals).
    #[must_use]
    pub fn session_key(&self) -> &str {
        &self.refresh_token.value
    }
}

fn redact(value: &str) -> String {
    let visible: String = value.chars().take(4).collect();
    format!("{visible}…[REDACTED]")
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &redact(&self.value))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshToken")
            .field("value", &redact(&self.value))
            .field("role", &self.role)
            .finish()
    }
}

impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens")
            .field("access_token", &self.access_token)
            .field("refresh_token", &self.refresh_token)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn tokens(expires_at: i64) -> SessionTokens {
        SessionTokens {
            access_token: AccessToken {
                value: "access-abcdef".to_owned(),
                expires_at,
            },
            refresh_token: RefreshToken {
                value: "refresh-123456".to_owned(),
                role: TokenRole::Visitor,
            },
        }
    }

    #[test]
    fn test_expiry_is_strict() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert!(!tokens(1_700_000_000).is_expired(now));
        assert!(!tokens(1_700_000_100).is_expired(now));
        assert!(tokens(1_699_999_999).is_expired(now));
    }

    #[test]
    fn test_cookie_blob_shape() {
        let json = serde_json::to_value(tokens(42)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "accessToken": { "value": "access-abcdef", "expiresAt": 42 },
                "refreshToken": { "value": "refresh-123456", "role": "visitor" }
            })
        );
    }

    #[test]
    fn test_missing_role_defaults_to_visitor() {
        let parsed: SessionTokens = serde_json::from_str(
            r#"{"accessToken":{"value":"a","expiresAt":1},"refreshToken":{"value":"r"}}"#,
        )
        .unwrap();
        assert_eq!(parsed.role(), TokenRole::Visitor);
        assert_eq!(parsed.session_key(), "r");
    }

    #[test]
    fn test_debug_redacts_values() {
        let debug = format!("{:?}", tokens(1));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("access-abcdef"));
        assert!(!debug.contains("refresh-123456"));
    }
}
