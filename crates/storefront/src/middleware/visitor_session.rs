//! Wix session gate.
//!
//! Every request leaves this middleware holding a usable platform credential:
//! - no credential cookie: issue anonymous visitor tokens
//! - expired access token: renew it, or issue visitor tokens if renewal fails
//! - otherwise: reuse the stored tokens unchanged
//!
//! The resolved tokens are placed in the request extensions (see
//! [`PlatformSession`]), written back into the inbound `Cookie` header for
//! anything downstream that reads cookies, and persisted with a `Set-Cookie`
//! on the response.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, HeaderValue, header, request::Parts},
    middleware::Next,
    response::Response,
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use docet_core::SessionTokens;
use tower_sessions::cookie::{Cookie, SameSite, time::Duration};
use tracing::instrument;

use crate::error::AppError;
use crate::state::AppState;
use crate::wix::{AuthApi, WixError};

/// Credential cookie name.
pub const WIX_SESSION_COOKIE: &str = "wix_session";

/// Credential cookie lifetime in seconds (7 days).
const SESSION_COOKIE_MAX_AGE: i64 = 7 * 24 * 60 * 60;

// =============================================================================
// Resolution
// =============================================================================

/// How the request's credential was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Stored tokens were still valid.
    Reused,
    /// No stored tokens; visitor tokens were issued.
    Issued,
    /// Expired access token was renewed.
    Renewed,
    /// Renewal failed; visitor tokens replaced the stored ones.
    Replaced,
}

/// Tokens to use for a request.
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub tokens: SessionTokens,
    pub outcome: SessionOutcome,
}

/// Decide which tokens a request uses.
///
/// # Errors
///
/// Returns an error only when visitor tokens are needed and cannot be issued.
#[instrument(skip(auth, stored))]
pub async fn resolve_session<A: AuthApi>(
    auth: &A,
    stored: Option<SessionTokens>,
    now: DateTime<Utc>,
) -> Result<ResolvedSession, WixError> {
    let Some(tokens) = stored else {
        let tokens = auth.generate_visitor_tokens().await?;
        tracing::debug!("Issued visitor tokens");
        return Ok(ResolvedSession {
            tokens,
            outcome: SessionOutcome::Issued,
        });
    };

    if !tokens.is_expired(now) {
        return Ok(ResolvedSession {
            tokens,
            outcome: SessionOutcome::Reused,
        });
    }

    match auth.renew_token(&tokens.refresh_token).await {
        Ok(tokens) => {
            tracing::debug!(role = ?tokens.role(), "Renewed access token");
            Ok(ResolvedSession {
                tokens,
                outcome: SessionOutcome::Renewed,
            })
        }
        Err(e) => {
            tracing::warn!(error = %e, "Token renewal failed, issuing visitor tokens");
            let tokens = auth.generate_visitor_tokens().await?;
            Ok(ResolvedSession {
                tokens,
                outcome: SessionOutcome::Replaced,
            })
        }
    }
}

// =============================================================================
// Cookie Encoding
// =============================================================================

/// Cookie value for a token pair (base64url JSON).
#[must_use]
pub fn encode_tokens(tokens: &SessionTokens) -> String {
    // Serializing plain strings and integers cannot fail
    let json = serde_json::to_vec(tokens).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

/// Decode a credential cookie value.
///
/// Accepts base64url JSON as well as raw or percent-encoded JSON. Anything
/// unreadable counts as no credential.
#[must_use]
pub fn decode_tokens(value: &str) -> Option<SessionTokens> {
    if let Ok(bytes) = URL_SAFE_NO_PAD.decode(value.trim_end_matches('='))
        && let Ok(tokens) = serde_json::from_slice(&bytes)
    {
        return Some(tokens);
    }

    let json = urlencoding::decode(value).ok()?;
    serde_json::from_str(&json).ok()
}

/// `Set-Cookie` value persisting `tokens`.
#[must_use]
pub fn session_cookie(tokens: &SessionTokens, secure: bool) -> Option<HeaderValue> {
    let cookie = Cookie::build((WIX_SESSION_COOKIE, encode_tokens(tokens)))
        .path("/")
        .max_age(Duration::seconds(SESSION_COOKIE_MAX_AGE))
        .same_site(SameSite::Lax)
        .http_only(true)
        .secure(secure)
        .build();
    HeaderValue::from_str(&cookie.to_string()).ok()
}

/// `Set-Cookie` value deleting the credential cookie.
#[must_use]
pub fn removal_cookie(secure: bool) -> Option<HeaderValue> {
    let cookie = Cookie::build((WIX_SESSION_COOKIE, ""))
        .path("/")
        .max_age(Duration::ZERO)
        .same_site(SameSite::Lax)
        .http_only(true)
        .secure(secure)
        .build();
    HeaderValue::from_str(&cookie.to_string()).ok()
}

/// Cookies from every `Cookie` header; malformed pairs are skipped.
fn request_cookies(headers: &HeaderMap) -> impl Iterator<Item = Cookie<'_>> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
}

/// Stored tokens from the request's cookies.
#[must_use]
pub fn stored_tokens(headers: &HeaderMap) -> Option<SessionTokens> {
    let cookie = request_cookies(headers).find(|c| c.name() == WIX_SESSION_COOKIE)?;
    let tokens = decode_tokens(cookie.value());
    if tokens.is_none() {
        tracing::debug!("Ignoring unreadable session cookie");
    }
    tokens
}

/// Replace the credential in the inbound `Cookie` header.
///
/// All `Cookie` headers are folded into one.
fn rewrite_cookie_header(headers: &mut HeaderMap, tokens: &SessionTokens) {
    let mut pairs: Vec<String> = request_cookies(headers)
        .filter(|c| c.name() != WIX_SESSION_COOKIE)
        .map(|c| c.stripped().to_string())
        .collect();
    let credential = Cookie::new(WIX_SESSION_COOKIE, encode_tokens(tokens));
    pairs.push(credential.stripped().to_string());

    if let Ok(value) = HeaderValue::from_str(&pairs.join("; ")) {
        headers.insert(header::COOKIE, value);
    }
}

/// Whether a handler already set or cleared the credential cookie.
fn sets_session_cookie(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| Cookie::parse(v).ok())
        .any(|c| c.name() == WIX_SESSION_COOKIE)
}

// =============================================================================
// Middleware
// =============================================================================

/// Session gate using the application's Wix client.
pub async fn visitor_session_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let secure = state.config().secure_cookies();
    session_gate(state.wix(), secure, request, next).await
}

/// Resolve the request's credential, run the rest of the stack, persist it.
///
/// If not even visitor tokens can be issued the request proceeds without a
/// [`PlatformSession`]; handlers that need one reject it.
pub async fn session_gate<A: AuthApi>(
    auth: &A,
    secure: bool,
    mut request: Request,
    next: Next,
) -> Response {
    let stored = stored_tokens(request.headers());

    let resolved = match resolve_session(auth, stored, Utc::now()).await {
        Ok(resolved) => resolved,
        Err(e) => {
            tracing::error!(error = %e, "Failed to establish Wix session");
            return next.run(request).await;
        }
    };

    rewrite_cookie_header(request.headers_mut(), &resolved.tokens);
    let cookie = session_cookie(&resolved.tokens, secure);
    request
        .extensions_mut()
        .insert(PlatformSession::from(resolved));

    let mut response = next.run(request).await;

    if !sets_session_cookie(response.headers())
        && let Some(cookie) = cookie
    {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }

    response
}

// =============================================================================
// Extractors
// =============================================================================

/// The request's platform credential, as resolved by the session gate.
#[derive(Debug, Clone)]
pub struct PlatformSession {
    tokens: SessionTokens,
    outcome: SessionOutcome,
}

impl PlatformSession {
    #[must_use]
    pub const fn tokens(&self) -> &SessionTokens {
        &self.tokens
    }

    #[must_use]
    pub const fn outcome(&self) -> SessionOutcome {
        self.outcome
    }

    /// Key identifying the browsing session across access token renewals.
    #[must_use]
    pub fn key(&self) -> &str {
        self.tokens.session_key()
    }

    #[must_use]
    pub fn is_member(&self) -> bool {
        self.tokens.role() == docet_core::TokenRole::Member
    }
}

impl From<ResolvedSession> for PlatformSession {
    fn from(resolved: ResolvedSession) -> Self {
        Self {
            tokens: resolved.tokens,
            outcome: resolved.outcome,
        }
    }
}

impl<S> FromRequestParts<S> for PlatformSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or(AppError::SessionUnavailable)
    }
}

/// Extractor that optionally gets the platform session.
pub struct OptionalPlatformSession(pub Option<PlatformSession>);

impl<S> FromRequestParts<S> for OptionalPlatformSession
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<PlatformSession>().cloned()))
    }
}
