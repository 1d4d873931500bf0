//! Wix member login route handlers.
//!
//! Handles the OAuth flow for Wix member authentication:
//! - Login: stores PKCE data in the session and redirects to Wix's login page
//! - Callback: verifies state, exchanges the code for member tokens and
//!   persists them in the credential cookie
//! - Logout: drops the credential and the session's cart cache, then redirects
//!   to Wix's logout page

use axum::{
    extract::{Query, State},
    http::{StatusCode, header},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::{OptionalPlatformSession, PlatformSession, removal_cookie, session_cookie};
use crate::models::{OAuthData, session_keys};
use crate::state::AppState;
use crate::wix::{AuthApi, LoginRedirect};

/// Callback path registered with Wix.
pub const CALLBACK_PATH: &str = "/api/auth/callback/wix";

/// Query parameters of the login start.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginQuery {
    /// Storefront path to return to after login.
    pub return_to: Option<String>,
}

/// Query parameters from the Wix OAuth callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code to exchange for tokens.
    pub code: Option<String>,
    /// State parameter for CSRF protection.
    pub state: Option<String>,
    /// Error code if authorization failed.
    pub error: Option<String>,
    /// Error description.
    pub error_description: Option<String>,
}

/// Generate a cryptographically secure random string.
fn generate_random_string(length: usize) -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// PKCE S256 challenge for a verifier.
fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Only same-site absolute paths are allowed as return targets.
fn sanitize_return_to(return_to: Option<&str>) -> String {
    match return_to {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

fn bad_request(message: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, message.into()).into_response()
}

/// Initiate member login.
///
/// # Route
///
/// `GET /auth/login`
#[instrument(skip(state, platform, session))]
pub async fn login(
    State(state): State<AppState>,
    platform: PlatformSession,
    session: Session,
    Query(query): Query<LoginQuery>,
) -> Result<Response, AppError> {
    let code_verifier = generate_random_string(64);
    let oauth = OAuthData {
        state: generate_random_string(32),
        code_verifier,
        redirect_uri: format!("{}{CALLBACK_PATH}", state.config().base_url),
        original_uri: sanitize_return_to(query.return_to.as_deref()),
    };

    session
        .insert(session_keys::WIX_OAUTH_DATA, &oauth)
        .await
        .map_err(|e| AppError::Internal(format!("failed to store OAuth data: {e}")))?;

    let login = LoginRedirect {
        redirect_uri: oauth.redirect_uri.clone(),
        state: oauth.state.clone(),
        code_challenge: code_challenge(&oauth.code_verifier),
    };
    let url = state
        .wix()
        .session(platform.tokens())
        .login_url(&login)
        .await?;

    Ok(Redirect::to(&url).into_response())
}

/// Handle the Wix OAuth callback.
///
/// # Route
///
/// `GET /api/auth/callback/wix`
#[instrument(skip_all)]
pub async fn callback(
    State(state): State<AppState>,
    OptionalPlatformSession(previous): OptionalPlatformSession,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, AppError> {
    if let Some(error) = query.error {
        let description = query.error_description.unwrap_or_default();
        tracing::warn!(%error, %description, "Wix OAuth error");
        return Ok(bad_request(description));
    }

    let oauth: Option<OAuthData> = session
        .remove(session_keys::WIX_OAUTH_DATA)
        .await
        .ok()
        .flatten();

    let (Some(code), Some(returned_state), Some(oauth)) = (query.code, query.state, oauth) else {
        tracing::warn!("Wix OAuth callback missing code, state or session data");
        return Ok(bad_request("Invalid request"));
    };

    if returned_state != oauth.state {
        tracing::warn!("Wix OAuth state mismatch");
        return Ok(bad_request("Invalid request"));
    }

    let tokens = state
        .wix()
        .member_tokens(&code, &oauth.code_verifier, &oauth.redirect_uri)
        .await?;

    // The visitor's cart cache is keyed by the visitor refresh token
    if let Some(previous) = previous {
        state.carts().evict(previous.key()).await;
    }

    tracing::info!("Wix member authenticated");

    let secure = state.config().secure_cookies();
    let cookie = session_cookie(&tokens, secure)
        .ok_or_else(|| AppError::Internal("unencodable session cookie".to_string()))?;

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Redirect::to(&oauth.original_uri),
    )
        .into_response())
}

/// Log out.
///
/// # Route
///
/// `POST /auth/logout`
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    OptionalPlatformSession(platform): OptionalPlatformSession,
) -> Response {
    let mut target = "/".to_string();

    if let Some(platform) = platform {
        state.carts().evict(platform.key()).await;

        if platform.is_member() {
            match state
                .wix()
                .session(platform.tokens())
                .logout_url(&state.config().base_url)
                .await
            {
                Ok(url) => target = url,
                Err(e) => tracing::warn!(error = %e, "Failed to get Wix logout URL"),
            }
        }
    }

    let secure = state.config().secure_cookies();
    match removal_cookie(secure) {
        Some(cookie) => (
            AppendHeaders([(header::SET_COOKIE, cookie)]),
            Redirect::to(&target),
        )
            .into_response(),
        None => Redirect::to(&target).into_response(),
    }
}
