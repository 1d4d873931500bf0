//! Back-in-stock subscriptions.
//!
//! Shoppers leave an email address on an out-of-stock product; Wix sends one
//! notification when the variant is restocked.

use std::collections::BTreeMap;

use docet_core::{Email, EmailError, ProductId};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use crate::wix::{BackInStockApi, BackInStockRequest, WixError};

/// Wix application code for a duplicate subscription.
pub const ALREADY_EXISTS_CODE: &str = "BACK_IN_STOCK_NOTIFICATION_ALREADY_EXISTS";

pub const SUBSCRIBED_MESSAGE: &str =
    "Thank you! We will notify you when this product is back in stock.";
pub const ALREADY_SUBSCRIBED_MESSAGE: &str = "You're already subscribed to this product";
pub const SUBSCRIBE_FAILURE_MESSAGE: &str =
    "Failed to subscribe to back in stock notifications. Please try again";

/// Subscription form as posted by the product page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackInStockForm {
    pub email: String,
    pub product_id: ProductId,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    /// Product page slug.
    pub slug: String,
    pub name: String,
    pub price: Option<String>,
    pub image: Option<String>,
}

/// Subscription failures.
#[derive(Debug, Error)]
pub enum BackInStockError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("already subscribed")]
    AlreadySubscribed,

    #[error("back-in-stock request failed: {0}")]
    Remote(WixError),
}

impl BackInStockError {
    /// Message shown to the shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(e) => e.to_string(),
            Self::AlreadySubscribed => ALREADY_SUBSCRIBED_MESSAGE.to_string(),
            Self::Remote(_) => SUBSCRIBE_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl From<WixError> for BackInStockError {
    fn from(err: WixError) -> Self {
        if err.application_code() == Some(ALREADY_EXISTS_CODE) {
            Self::AlreadySubscribed
        } else {
            Self::Remote(err)
        }
    }
}

/// Absolute product page URL.
fn item_url(base_url: &str, slug: &str) -> String {
    format!(
        "{}/products/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(slug)
    )
}

/// Subscribe the form's email to the product's restock.
///
/// # Errors
///
/// Returns [`BackInStockError::InvalidEmail`] before any request,
/// [`BackInStockError::AlreadySubscribed`] for duplicates and
/// [`BackInStockError::Remote`] otherwise.
#[instrument(skip(api, form), fields(product_id = %form.product_id))]
pub async fn subscribe<A: BackInStockApi>(
    api: &A,
    base_url: &str,
    form: BackInStockForm,
) -> Result<&'static str, BackInStockError> {
    let email = Email::parse(&form.email)?;

    let request = BackInStockRequest {
        email,
        product_id: form.product_id,
        options: form.options,
        item_url: item_url(base_url, &form.slug),
        name: form.name,
        price: form.price,
        image: form.image,
    };

    match api.create_back_in_stock_request(&request).await {
        Ok(()) => {
            tracing::info!("Back-in-stock subscription created");
            Ok(SUBSCRIBED_MESSAGE)
        }
        Err(e) => {
            let err = BackInStockError::from(e);
            match &err {
                BackInStockError::AlreadySubscribed => {
                    tracing::debug!("Back-in-stock subscription already exists");
                }
                _ => tracing::error!(error = %err, "Failed to create back-in-stock subscription"),
            }
            Err(err)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct FakeBackInStock {
        requests: Mutex<Vec<BackInStockRequest>>,
        fail_with: Mutex<Option<WixError>>,
    }

    impl BackInStockApi for FakeBackInStock {
        async fn create_back_in_stock_request(
            &self,
            request: &BackInStockRequest,
        ) -> Result<(), WixError> {
            self.requests.lock().unwrap().push(request.clone());
            self.fail_with.lock().unwrap().take().map_or(Ok(()), Err)
        }
    }

    fn form(email: &str) -> BackInStockForm {
        BackInStockForm {
            email: email.to_string(),
            product_id: ProductId::new("prod-1"),
            options: BTreeMap::from([("Size".to_string(), "M".to_string())]),
            slug: "linen-shirt".to_string(),
            name: "Linen Shirt".to_string(),
            price: Some("$40.00".to_string()),
            image: None,
        }
    }

    #[tokio::test]
    async fn test_subscribe_builds_item_url() {
        let api = FakeBackInStock::default();
        let message = subscribe(&api, "https://shop.example/", form("a@b.co"))
            .await
            .unwrap();
        assert_eq!(message, SUBSCRIBED_MESSAGE);

        let requests = api.requests.lock().unwrap();
        assert_eq!(requests[0].item_url, "https://shop.example/products/linen-shirt");
        assert_eq!(requests[0].email.as_str(), "a@b.co");
    }

    #[tokio::test]
    async fn test_invalid_email_makes_no_request() {
        let api = FakeBackInStock::default();
        let err = subscribe(&api, "https://shop.example", form("not-an-email"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackInStockError::InvalidEmail(_)));
        assert!(api.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_maps_to_already_subscribed() {
        let api = FakeBackInStock::default();
        *api.fail_with.lock().unwrap() = Some(WixError::Application {
            status: 409,
            code: ALREADY_EXISTS_CODE.to_string(),
            description: "exists".to_string(),
        });

        let err = subscribe(&api, "https://shop.example", form("a@b.co"))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), ALREADY_SUBSCRIBED_MESSAGE);
    }

    #[tokio::test]
    async fn test_other_failures_get_generic_message() {
        let api = FakeBackInStock::default();
        *api.fail_with.lock().unwrap() = Some(WixError::Api {
            status: 500,
            message: "boom".to_string(),
        });

        let err = subscribe(&api, "https://shop.example", form("a@b.co"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackInStockError::Remote(_)));
        assert_eq!(err.user_message(), SUBSCRIBE_FAILURE_MESSAGE);
    }
}
