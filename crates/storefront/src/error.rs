//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::cart::CartError;
use crate::services::back_in_stock::BackInStockError;
use crate::services::catalog::CatalogError;
use crate::services::checkout::CheckoutError;
use crate::services::members::MemberError;
use crate::wix::WixError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Back-in-stock subscription failed.
    #[error("Back-in-stock error: {0}")]
    BackInStock(#[from] BackInStockError),

    /// Checkout could not be started.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Catalog read failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Member profile operation failed.
    #[error("Member error: {0}")]
    Member(#[from] MemberError),

    /// Wix API operation failed.
    #[error("Wix error: {0}")]
    Wix(#[from] WixError),

    /// No platform session could be established for the request.
    #[error("Session unavailable")]
    SessionUnavailable,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Status for a failed platform call.
const fn wix_status(err: &WixError) -> StatusCode {
    match err {
        WixError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Cart(err) => match err {
                CartError::Remote(e) => wix_status(e),
                CartError::Quantity(_) | CartError::InvalidQuantity(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                CartError::ItemNotFound(_) => StatusCode::NOT_FOUND,
            },
            Self::BackInStock(err) => match err {
                BackInStockError::InvalidEmail(_) => StatusCode::UNPROCESSABLE_ENTITY,
                BackInStockError::AlreadySubscribed => StatusCode::CONFLICT,
                BackInStockError::Remote(e) => wix_status(e),
            },
            Self::Checkout(err) => match err {
                CheckoutError::InvalidQuantity(_) => StatusCode::UNPROCESSABLE_ENTITY,
                CheckoutError::Remote(e) => wix_status(e),
            },
            Self::Catalog(err) => match err {
                CatalogError::CollectionNotFound(_) | CatalogError::PageOutOfRange { .. } => {
                    StatusCode::NOT_FOUND
                }
                CatalogError::Remote(e) => wix_status(e),
            },
            Self::Member(err) => match err {
                MemberError::NotLoggedIn => StatusCode::UNAUTHORIZED,
                MemberError::Remote(e) => wix_status(e),
            },
            Self::Wix(e) => wix_status(e),
            Self::SessionUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the shopper.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Cart(CartError::Remote(_))
            | Self::Checkout(CheckoutError::Remote(_))
            | Self::Catalog(CatalogError::Remote(_))
            | Self::Member(MemberError::Remote(_))
            | Self::Wix(_) => "External service error".to_string(),
            Self::Cart(err) => err.to_string(),
            Self::BackInStock(err) => err.user_message(),
            Self::Checkout(err) => err.to_string(),
            Self::Catalog(_) => "Not found".to_string(),
            Self::Member(_) => "Please log in to manage your profile".to_string(),
            Self::SessionUnavailable => "Session unavailable, please try again".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Capture server-side failures to Sentry.
    pub fn report(&self) {
        if self.status().is_server_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.report();
        let body = Json(json!({ "error": self.public_message() }));
        (self.status(), body).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use docet_core::{LineItemId, QuantityError};

    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("route".to_string());
        assert_eq!(err.to_string(), "Not found: route");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(CartError::InvalidQuantity(0).into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(CartError::Quantity(QuantityError::BelowMinimum).into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(CartError::ItemNotFound(LineItemId::new("x")).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(BackInStockError::AlreadySubscribed.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(WixError::RateLimited(5).into()),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(WixError::Unauthorized.into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::SessionUnavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(
                CatalogError::PageOutOfRange {
                    page: 4,
                    total_pages: 3
                }
                .into()
            ),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(MemberError::NotLoggedIn.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(MemberError::Remote(WixError::RateLimited(1)).into()),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_internal_details_hidden() {
        let err = AppError::Cart(CartError::Remote(WixError::Api {
            status: 500,
            message: "stack trace".to_string(),
        }));
        assert_eq!(err.public_message(), "External service error");

        let err = AppError::Internal("db password wrong".to_string());
        assert_eq!(err.public_message(), "Internal server error");
    }
}
