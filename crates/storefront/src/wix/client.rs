//! Wix REST client implementation.
//!
//! [`WixClient`] holds the HTTP connection pool and project settings and
//! issues session credentials. [`WixSession`] binds it to one browsing
//! session's access token for cart, checkout, catalog, member and
//! back-in-stock calls.
//!
//! Catalog reads are cached on the client, so every session shares them.

use std::sync::Arc;
use std::time::Duration;

use docet_core::{
    AddToCartValues, CartSnapshot, Collection, LineItemId, MemberId, MemberProfile, MemberUpdate,
    PRODUCTS_PAGE_SIZE, ProductPage, ProductQuery, RefreshToken, SessionTokens, TokenRole,
};
use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::cache::{CacheKey, CacheValue};
use super::types::{
    AddToCartBody, BackInStockBody, CartEnvelope, CatalogQueryBody, CheckoutEnvelope,
    CollectionEnvelope, CollectionsEnvelope, CreateCheckoutBody, CreateCheckoutResponse,
    LineItemInput, MemberEnvelope, ProductsEnvelope, QuantityUpdate, RedirectSessionEnvelope,
    RemoveLineItemsBody, TokenRequest, TokenResponse, UpdateMemberBody, UpdateQuantityBody,
    WireErrorBody,
};
use super::{
    AuthApi, BackInStockApi, BackInStockRequest, CartApi, CatalogApi, CheckoutApi,
    CheckoutCallbacks, LoginRedirect, MemberApi, WixError,
};
use crate::config::WixConfig;

const CURRENT_CART: &str = "/ecom/v1/carts/current";
const TOKEN_PATH: &str = "/oauth2/token";
const REDIRECT_SESSION_PATH: &str = "/redirect-session/v1/redirect-session";
const CHECKOUTS_PATH: &str = "/ecom/v1/checkouts";
const BACK_IN_STOCK_PATH: &str = "/back-in-stock-notifications/v1/notification-requests";
const COLLECTIONS_QUERY_PATH: &str = "/stores-reader/v1/collections/query";
const COLLECTION_BY_SLUG_PATH: &str = "/stores-reader/v1/collections/slug";
const PRODUCTS_QUERY_PATH: &str = "/stores-reader/v1/products/query";
const MEMBERS_PATH: &str = "/members/v1/members";
const CHANNEL_WEB: &str = "WEB";
const COLLECTIONS_LIMIT: u32 = 100;

/// Built-in collection holding every product.
pub const ALL_PRODUCTS_COLLECTION_ID: &str = "00000000-000000-000000-000000000001";
/// Built-in collection behind the home page's featured products.
pub const FEATURED_COLLECTION_ID: &str = "f723fdde-a4f9-b45f-cfa1-a665c9c9dbd8";

// =============================================================================
// WixClient
// =============================================================================

/// Client for the Wix headless REST APIs.
///
/// Collections and product listings are cached for 5 minutes.
#[derive(Clone)]
pub struct WixClient {
    inner: Arc<WixClientInner>,
}

struct WixClientInner {
    client: reqwest::Client,
    api_base_url: String,
    client_id: String,
    stores_app_id: String,
    cache: Cache<CacheKey, CacheValue>,
}

impl WixClient {
    /// Create a new Wix client.
    #[must_use]
    pub fn new(config: &WixConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(WixClientInner {
                client: reqwest::Client::new(),
                api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
                client_id: config.client_id.clone(),
                stores_app_id: config.stores_app_id.clone(),
                cache,
            }),
        }
    }

    /// Bind the client to a browsing session's credentials.
    #[must_use]
    pub fn session(&self, tokens: &SessionTokens) -> WixSession {
        WixSession {
            client: self.clone(),
            access_token: tokens.access_token.value.clone(),
        }
    }

    /// OAuth client ID of the headless project.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.inner.client_id
    }

    /// Drop every cached catalog response.
    pub async fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.inner
            .client
            .request(method, format!("{}{path}", self.inner.api_base_url))
    }

    /// Post to the token endpoint and build a token pair.
    async fn token_grant(
        &self,
        body: &TokenRequest<'_>,
        role: TokenRole,
        fallback_refresh: Option<&str>,
    ) -> Result<SessionTokens, WixError> {
        let issued_at = chrono::Utc::now().timestamp();
        let response: TokenResponse =
            send_json(self.request(Method::POST, TOKEN_PATH).json(body)).await?;

        response
            .into_tokens(role, fallback_refresh, issued_at)
            .ok_or_else(|| WixError::Api {
                status: StatusCode::OK.as_u16(),
                message: "token response carried no refresh token".to_string(),
            })
    }
}

impl AuthApi for WixClient {
    #[instrument(skip(self))]
    async fn generate_visitor_tokens(&self) -> Result<SessionTokens, WixError> {
        let body = TokenRequest {
            client_id: self.client_id(),
            grant_type: "anonymous",
            refresh_token: None,
            code: None,
            code_verifier: None,
            redirect_uri: None,
        };
        self.token_grant(&body, TokenRole::Visitor, None).await
    }

    #[instrument(skip(self, refresh_token), fields(role = ?refresh_token.role))]
    async fn renew_token(&self, refresh_token: &RefreshToken) -> Result<SessionTokens, WixError> {
        let body = TokenRequest {
            client_id: self.client_id(),
            grant_type: "refresh_token",
            refresh_token: Some(&refresh_token.value),
            code: None,
            code_verifier: None,
            redirect_uri: None,
        };
        self.token_grant(&body, refresh_token.role, Some(&refresh_token.value))
            .await
    }

    #[instrument(skip(self, code, code_verifier))]
    async fn member_tokens(
        &self,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<SessionTokens, WixError> {
        let body = TokenRequest {
            client_id: self.client_id(),
            grant_type: "authorization_code",
            refresh_token: None,
            code: Some(code),
            code_verifier: Some(code_verifier),
            redirect_uri: Some(redirect_uri),
        };
        self.token_grant(&body, TokenRole::Member, None).await
    }
}

// =============================================================================
// WixSession
// =============================================================================

/// A [`WixClient`] acting on behalf of one browsing session.
#[derive(Clone)]
pub struct WixSession {
    client: WixClient,
    access_token: String,
}

impl WixSession {
    fn authorized(&self, method: Method, path: &str) -> RequestBuilder {
        // Wix expects the raw token, without a "Bearer" prefix
        self.client
            .request(method, path)
            .header(reqwest::header::AUTHORIZATION, &self.access_token)
    }

    fn app_id(&self) -> &str {
        &self.client.inner.stores_app_id
    }

    fn cache(&self) -> &Cache<CacheKey, CacheValue> {
        &self.client.inner.cache
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, WixError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        send_json(self.authorized(Method::POST, path).json(body)).await
    }

    async fn cart_mutation<B>(&self, path: &str, body: &B) -> Result<CartSnapshot, WixError>
    where
        B: Serialize + Sync,
    {
        let envelope: CartEnvelope = self.post(path, body).await?;
        Ok(envelope.cart.into())
    }

    async fn redirect_session(&self, body: &serde_json::Value) -> Result<String, WixError> {
        let envelope: RedirectSessionEnvelope = self.post(REDIRECT_SESSION_PATH, body).await?;
        Ok(envelope.redirect_session.full_url)
    }

    async fn checkout_redirect(
        &self,
        checkout_id: &str,
        callbacks: &CheckoutCallbacks,
    ) -> Result<String, WixError> {
        self.redirect_session(&serde_json::json!({
            "ecomCheckout": { "checkoutId": checkout_id },
            "callbacks": {
                "postFlowUrl": callbacks.post_flow_url,
                "thankYouPageUrl": callbacks.thank_you_page_url,
            }
        }))
        .await
    }

    /// Hosted login page URL for a member login.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect session cannot be created.
    #[instrument(skip(self, login), fields(redirect_uri = %login.redirect_uri))]
    pub async fn login_url(&self, login: &LoginRedirect) -> Result<String, WixError> {
        self.redirect_session(&serde_json::json!({
            "auth": {
                "authRequest": {
                    "clientId": self.client.client_id(),
                    "redirectUri": login.redirect_uri,
                    "codeChallenge": login.code_challenge,
                    "codeChallengeMethod": "S256",
                    "responseMode": "query",
                    "responseType": "code",
                    "scope": "offline_access",
                    "state": login.state,
                }
            }
        }))
        .await
    }

    /// Hosted logout URL that returns the shopper to `post_flow_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect session cannot be created.
    #[instrument(skip(self))]
    pub async fn logout_url(&self, post_flow_url: &str) -> Result<String, WixError> {
        self.redirect_session(&serde_json::json!({
            "logout": { "clientId": self.client.client_id() },
            "callbacks": { "postFlowUrl": post_flow_url }
        }))
        .await
    }
}

impl CartApi for WixSession {
    #[instrument(skip(self))]
    async fn get_cart(&self) -> Result<Option<CartSnapshot>, WixError> {
        match send_json::<CartEnvelope>(self.authorized(Method::GET, CURRENT_CART)).await {
            Ok(envelope) => Ok(Some(envelope.cart.into())),
            Err(WixError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, values), fields(product_id = %values.product_id, quantity = values.quantity))]
    async fn add_to_cart(&self, values: &AddToCartValues) -> Result<CartSnapshot, WixError> {
        let body = AddToCartBody {
            line_items: [LineItemInput::from_values(self.app_id(), values)],
        };
        self.cart_mutation(&format!("{CURRENT_CART}/add-to-cart"), &body)
            .await
    }

    #[instrument(skip(self, item), fields(item = %item))]
    async fn update_item_quantity(
        &self,
        item: &LineItemId,
        quantity: u32,
    ) -> Result<CartSnapshot, WixError> {
        let body = UpdateQuantityBody {
            line_items: [QuantityUpdate {
                id: item.as_str(),
                quantity,
            }],
        };
        self.cart_mutation(&format!("{CURRENT_CART}/update-line-items-quantity"), &body)
            .await
    }

    #[instrument(skip(self, item), fields(item = %item))]
    async fn remove_item(&self, item: &LineItemId) -> Result<CartSnapshot, WixError> {
        let body = RemoveLineItemsBody {
            line_item_ids: [item.as_str()],
        };
        self.cart_mutation(&format!("{CURRENT_CART}/remove-line-items"), &body)
            .await
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self) -> Result<(), WixError> {
        match send_empty(self.authorized(Method::DELETE, CURRENT_CART)).await {
            // Nothing to clear
            Ok(()) | Err(WixError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl BackInStockApi for WixSession {
    #[instrument(skip(self, request), fields(product_id = %request.product_id))]
    async fn create_back_in_stock_request(
        &self,
        request: &BackInStockRequest,
    ) -> Result<(), WixError> {
        let body = BackInStockBody::new(self.app_id(), request);
        send_empty(self.authorized(Method::POST, BACK_IN_STOCK_PATH).json(&body)).await
    }
}

impl CheckoutApi for WixSession {
    #[instrument(skip(self, callbacks))]
    async fn checkout_url_for_current_cart(
        &self,
        callbacks: &CheckoutCallbacks,
    ) -> Result<String, WixError> {
        let body = CreateCheckoutBody {
            channel_type: CHANNEL_WEB,
            line_items: None,
        };
        let created: CreateCheckoutResponse = self
            .post(&format!("{CURRENT_CART}/create-checkout"), &body)
            .await?;
        self.checkout_redirect(&created.checkout_id, callbacks).await
    }

    #[instrument(skip(self, values, callbacks), fields(product_id = %values.product_id))]
    async fn checkout_url_for_product(
        &self,
        values: &AddToCartValues,
        callbacks: &CheckoutCallbacks,
    ) -> Result<String, WixError> {
        let body = CreateCheckoutBody {
            channel_type: CHANNEL_WEB,
            line_items: Some([LineItemInput::from_values(self.app_id(), values)]),
        };
        let created: CheckoutEnvelope = self.post(CHECKOUTS_PATH, &body).await?;
        self.checkout_redirect(&created.checkout.id, callbacks).await
    }
}

impl CatalogApi for WixSession {
    #[instrument(skip(self))]
    async fn collections(&self) -> Result<Vec<Collection>, WixError> {
        if let Some(CacheValue::Collections(collections)) =
            self.cache().get(&CacheKey::Collections).await
        {
            debug!("Cache hit for collections");
            return Ok(collections);
        }

        let body = CatalogQueryBody::collections_excluding(
            &[ALL_PRODUCTS_COLLECTION_ID, FEATURED_COLLECTION_ID],
            COLLECTIONS_LIMIT,
        );
        let envelope: CollectionsEnvelope = self.post(COLLECTIONS_QUERY_PATH, &body).await?;
        let collections: Vec<Collection> =
            envelope.collections.into_iter().map(Into::into).collect();

        self.cache()
            .insert(
                CacheKey::Collections,
                CacheValue::Collections(collections.clone()),
            )
            .await;
        Ok(collections)
    }

    #[instrument(skip(self))]
    async fn collection_by_slug(&self, slug: &str) -> Result<Option<Collection>, WixError> {
        let cache_key = CacheKey::Collection(slug.to_string());
        if let Some(CacheValue::Collection(collection)) = self.cache().get(&cache_key).await {
            debug!("Cache hit for collection");
            return Ok(Some(*collection));
        }

        let path = format!("{COLLECTION_BY_SLUG_PATH}/{}", urlencoding::encode(slug));
        let collection = match send_json::<CollectionEnvelope>(self.authorized(Method::GET, &path))
            .await
        {
            Ok(envelope) => envelope.collection.map(Collection::from),
            Err(WixError::NotFound(_)) => None,
            Err(e) => return Err(e),
        };

        if let Some(collection) = &collection {
            self.cache()
                .insert(cache_key, CacheValue::Collection(Box::new(collection.clone())))
                .await;
        }
        Ok(collection)
    }

    #[instrument(skip(self, query), fields(page = query.page, search = query.is_search()))]
    async fn query_products(&self, query: &ProductQuery) -> Result<ProductPage, WixError> {
        let cache_key = CacheKey::Products(query.clone());

        // Only listings without search are cached
        if !query.is_search()
            && let Some(CacheValue::Products(page)) = self.cache().get(&cache_key).await
        {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let body = CatalogQueryBody::products(query, PRODUCTS_PAGE_SIZE);
        let envelope: ProductsEnvelope = self.post(PRODUCTS_QUERY_PATH, &body).await?;
        let page = ProductPage {
            items: envelope.products.into_iter().map(Into::into).collect(),
            total_count: envelope.total_results,
            page: query.page,
        };

        if !query.is_search() {
            self.cache()
                .insert(cache_key, CacheValue::Products(page.clone()))
                .await;
        }
        Ok(page)
    }
}

impl MemberApi for WixSession {
    #[instrument(skip(self))]
    async fn current_member(&self) -> Result<MemberProfile, WixError> {
        let request = self
            .authorized(Method::GET, &format!("{MEMBERS_PATH}/my"))
            .query(&[("fieldsets", "FULL")]);
        let envelope: MemberEnvelope = send_json(request).await?;
        Ok(envelope.member.into())
    }

    #[instrument(skip(self, update), fields(member = %id))]
    async fn update_member(
        &self,
        id: &MemberId,
        update: &MemberUpdate,
    ) -> Result<MemberProfile, WixError> {
        let request = self
            .authorized(Method::PATCH, &format!("{MEMBERS_PATH}/{id}"))
            .json(&UpdateMemberBody::from(update));
        let envelope: MemberEnvelope = send_json(request).await?;
        Ok(envelope.member.into())
    }
}

// =============================================================================
// Response Handling
// =============================================================================

/// Send a request and decode its JSON body.
async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, WixError> {
    let text = send(request).await?;

    serde_json::from_str(&text).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %text.chars().take(500).collect::<String>(),
            "Failed to parse Wix response"
        );
        WixError::Parse(e)
    })
}

/// Send a request whose success body is irrelevant.
async fn send_empty(request: RequestBuilder) -> Result<(), WixError> {
    send(request).await.map(|_| ())
}

/// Send a request, mapping non-success statuses to [`WixError`].
async fn send(request: RequestBuilder) -> Result<String, WixError> {
    let response = request.send().await?;
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(WixError::RateLimited(retry_after));
    }

    let text = response.text().await?;

    if status.is_success() {
        return Ok(text);
    }

    let error = error_from_response(status, &text);
    if status.is_server_error() {
        tracing::error!(
            status = %status,
            body = %text.chars().take(500).collect::<String>(),
            "Wix API returned server error"
        );
    } else {
        tracing::debug!(status = %status, error = %error, "Wix API rejected request");
    }
    Err(error)
}

/// Classify a non-success response.
fn error_from_response(status: StatusCode, body: &str) -> WixError {
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return WixError::Unauthorized;
    }

    let parsed: WireErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .unwrap_or_else(|| body.chars().take(200).collect());

    if status == StatusCode::NOT_FOUND {
        return WixError::NotFound(message);
    }

    if let Some(app) = parsed.details.and_then(|d| d.application_error) {
        return WixError::Application {
            status: status.as_u16(),
            code: app.code,
            description: app.description,
        };
    }

    WixError::Api {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> WixClient {
        WixClient::new(&WixConfig {
            client_id: "client-1".to_string(),
            api_base_url: server.uri(),
            stores_app_id: "stores-app".to_string(),
        })
    }

    fn tokens(access: &str) -> SessionTokens {
        SessionTokens {
            access_token: docet_core::AccessToken {
                value: access.to_string(),
                expires_at: i64::MAX,
            },
            refresh_token: RefreshToken {
                value: "refresh-1".to_string(),
                role: TokenRole::Visitor,
            },
        }
    }

    fn cart_body(quantity: u32) -> serde_json::Value {
        serde_json::json!({
            "cart": {
                "_id": "cart-1",
                "currency": "USD",
                "lineItems": [{
                    "_id": "line-1",
                    "quantity": quantity,
                    "catalogReference": { "catalogItemId": "prod-1" },
                    "productName": { "original": "Mug" },
                    "price": { "amount": "12.50" }
                }]
            }
        })
    }

    #[test]
    fn test_error_classification() {
        assert!(matches!(
            error_from_response(StatusCode::UNAUTHORIZED, ""),
            WixError::Unauthorized
        ));
        assert!(matches!(
            error_from_response(StatusCode::NOT_FOUND, r#"{"message":"no cart"}"#),
            WixError::NotFound(ref m) if m == "no cart"
        ));
        let conflict = error_from_response(
            StatusCode::CONFLICT,
            r#"{"details":{"applicationError":{"code":"DUPLICATE","description":"dup"}}}"#,
        );
        assert_eq!(conflict.application_code(), Some("DUPLICATE"));
        assert!(matches!(
            error_from_response(StatusCode::BAD_GATEWAY, "upstream down"),
            WixError::Api { status: 502, ref message } if message == "upstream down"
        ));
    }

    #[tokio::test]
    async fn test_get_cart_sends_raw_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CURRENT_CART))
            .and(header("authorization", "access-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(cart_body(2)))
            .mount(&server)
            .await;

        let cart = client_for(&server)
            .session(&tokens("access-1"))
            .get_cart()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cart.total_quantity(), 2);
    }

    #[tokio::test]
    async fn test_get_cart_missing_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CURRENT_CART))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "message": "Cart not found",
                "details": { "applicationError": { "code": "OWNED_CART_NOT_FOUND" } }
            })))
            .mount(&server)
            .await;

        let cart = client_for(&server)
            .session(&tokens("access-1"))
            .get_cart()
            .await
            .unwrap();
        assert!(cart.is_none());
    }

    #[tokio::test]
    async fn test_update_quantity_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ecom/v1/carts/current/update-line-items-quantity"))
            .and(body_json(serde_json::json!({
                "lineItems": [{ "_id": "line-1", "quantity": 3 }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(cart_body(3)))
            .expect(1)
            .mount(&server)
            .await;

        let cart = client_for(&server)
            .session(&tokens("access-1"))
            .update_item_quantity(&LineItemId::new("line-1"), 3)
            .await
            .unwrap();
        assert_eq!(cart.total_quantity(), 3);
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ecom/v1/carts/current/remove-line-items"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .session(&tokens("access-1"))
            .remove_item(&LineItemId::new("line-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, WixError::RateLimited(7)));
    }

    #[tokio::test]
    async fn test_visitor_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_json(serde_json::json!({
                "clientId": "client-1",
                "grantType": "anonymous"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "visitor-access",
                "expires_in": 14400,
                "token_type": "Bearer",
                "refresh_token": "visitor-refresh"
            })))
            .mount(&server)
            .await;

        let before = chrono::Utc::now().timestamp();
        let tokens = client_for(&server).generate_visitor_tokens().await.unwrap();
        assert_eq!(tokens.access_token.value, "visitor-access");
        assert_eq!(tokens.refresh_token.value, "visitor-refresh");
        assert_eq!(tokens.role(), TokenRole::Visitor);
        assert!(tokens.access_token.expires_at >= before + 14_400);
    }

    #[tokio::test]
    async fn test_checkout_url_for_current_cart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ecom/v1/carts/current/create-checkout"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "checkoutId": "chk-1" })),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(REDIRECT_SESSION_PATH))
            .and(body_json(serde_json::json!({
                "ecomCheckout": { "checkoutId": "chk-1" },
                "callbacks": {
                    "postFlowUrl": "https://shop.test",
                    "thankYouPageUrl": "https://shop.test/checkout-success"
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "redirectSession": { "id": "rs-1", "fullUrl": "https://pay.wix.test/chk-1" }
            })))
            .mount(&server)
            .await;

        let url = client_for(&server)
            .session(&tokens("access-1"))
            .checkout_url_for_current_cart(&CheckoutCallbacks::for_site("https://shop.test"))
            .await
            .unwrap();
        assert_eq!(url, "https://pay.wix.test/chk-1");
    }

    fn member_body(first: &str, last: &str) -> serde_json::Value {
        serde_json::json!({
            "member": {
                "_id": "member-1",
                "loginEmail": "ada@example.com",
                "contact": { "firstName": first, "lastName": last },
                "profile": { "nickname": "ada" }
            }
        })
    }

    #[tokio::test]
    async fn test_collections_exclude_builtins_and_are_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(COLLECTIONS_QUERY_PATH))
            .and(body_json(serde_json::json!({
                "query": {
                    "filter": serde_json::json!({
                        "id": { "$nin": [ALL_PRODUCTS_COLLECTION_ID, FEATURED_COLLECTION_ID] }
                    })
                    .to_string(),
                    "paging": { "limit": 100, "offset": 0 }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "collections": [{
                    "id": "col-1",
                    "name": "Mugs",
                    "slug": "mugs",
                    "media": { "mainMedia": { "image": { "url": "https://img.test/mugs.jpg" } } },
                    "numberOfProducts": 4
                }],
                "totalResults": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = client_for(&server).session(&tokens("access-1"));
        let first = session.collections().await.unwrap();
        let second = session.collections().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0].slug, "mugs");
        assert_eq!(first[0].image.as_deref(), Some("https://img.test/mugs.jpg"));
        assert_eq!(first[0].product_count, 4);
    }

    #[tokio::test]
    async fn test_invalidate_catalog_refetches() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(COLLECTIONS_QUERY_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "collections": [] })),
            )
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let session = client.session(&tokens("access-1"));
        session.collections().await.unwrap();
        client.invalidate_catalog().await;
        session.collections().await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_collection_slug_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{COLLECTION_BY_SLUG_PATH}/no-such")))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "message": "collection not found"
            })))
            .mount(&server)
            .await;

        let collection = client_for(&server)
            .session(&tokens("access-1"))
            .collection_by_slug("no-such")
            .await
            .unwrap();
        assert!(collection.is_none());
    }

    #[tokio::test]
    async fn test_product_query_body_and_page() {
        let server = MockServer::start().await;
        let query = ProductQuery::new(2)
            .with_collections([docet_core::CollectionId::new("col-1")])
            .with_price_range(Some(10), Some(0))
            .with_sort(docet_core::ProductsSort::PriceAsc);
        Mock::given(method("POST"))
            .and(path(PRODUCTS_QUERY_PATH))
            .and(body_json(serde_json::json!({
                "query": {
                    "filter": serde_json::json!({
                        "collectionIds": { "$hasSome": ["col-1"] },
                        "priceData.price": { "$gte": 10 }
                    })
                    .to_string(),
                    "sort": serde_json::json!([{ "priceData.price": "asc" }]).to_string(),
                    "paging": { "limit": 8, "offset": 8 }
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "products": [{
                    "id": "prod-1",
                    "name": "Mug",
                    "slug": "mug",
                    "priceData": {
                        "currency": "USD",
                        "price": 15,
                        "discountedPrice": 12,
                        "formatted": { "price": "$15.00", "discountedPrice": "$12.00" }
                    },
                    "stock": { "inStock": true },
                    "ribbon": "Sale"
                }],
                "totalResults": 9
            })))
            .expect(1)
            .mount(&server)
            .await;

        let session = client_for(&server).session(&tokens("access-1"));
        let page = session.query_products(&query).await.unwrap();
        // Served from cache
        session.query_products(&query).await.unwrap();

        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages(), 2);
        let product = &page.items[0];
        assert_eq!(product.price.display(), "$15.00");
        assert_eq!(product.effective_price().display(), "$12.00");
        assert!(product.in_stock);
        assert_eq!(product.ribbon.as_deref(), Some("Sale"));
    }

    #[tokio::test]
    async fn test_search_queries_bypass_cache() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PRODUCTS_QUERY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "products": [],
                "totalResults": 0
            })))
            .expect(2)
            .mount(&server)
            .await;

        let session = client_for(&server).session(&tokens("access-1"));
        let query = ProductQuery::new(1).with_search("mug");
        session.query_products(&query).await.unwrap();
        session.query_products(&query).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_member_patches_contact() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/members/v1/members/member-1"))
            .and(header("authorization", "member-access"))
            .and(body_json(serde_json::json!({
                "member": { "contact": { "firstName": "Ada", "lastName": "Lovelace" } }
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(member_body("Ada", "Lovelace")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let profile = client_for(&server)
            .session(&tokens("member-access"))
            .update_member(
                &MemberId::new("member-1"),
                &MemberUpdate::new(" Ada ", "Lovelace"),
            )
            .await
            .unwrap();
        assert_eq!(profile.display_name().as_deref(), Some("Ada Lovelace"));
        assert_eq!(profile.login_email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn test_current_member_for_visitor_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/members/v1/members/my"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .session(&tokens("visitor-access"))
            .current_member()
            .await;
        assert!(matches!(result, Err(WixError::Unauthorized)));
    }
}
