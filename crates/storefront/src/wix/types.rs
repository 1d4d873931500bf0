//! Wix REST payloads and their conversion into domain types.
//!
//! Wire structs mirror the JSON Wix sends and accepts (camelCase, entity IDs
//! under `_id`). Everything the rest of the storefront sees goes through the
//! `From`/`into_*` conversions at the bottom of this file.

use std::collections::BTreeMap;

use docet_core::{
    AccessToken, AddToCartValues, Availability, AvailabilityStatus, CartId, CartSnapshot,
    Collection, CollectionId, CurrencyCode, Email, LineItem, LineItemId, MemberId, MemberProfile,
    MemberUpdate, Money, ProductId, ProductQuery, ProductSummary, ProductsSort, RefreshToken,
    SessionTokens, TokenRole,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Inputs
// =============================================================================

/// A back-in-stock subscription for one product.
#[derive(Debug, Clone)]
pub struct BackInStockRequest {
    /// Subscriber address.
    pub email: Email,
    /// Product to watch.
    pub product_id: ProductId,
    /// Selected options of the out-of-stock variant.
    pub options: BTreeMap<String, String>,
    /// Absolute product page URL included in the notification email.
    pub item_url: String,
    /// Product name shown in the notification email.
    pub name: String,
    /// Display price shown in the notification email.
    pub price: Option<String>,
    /// Product image shown in the notification email.
    pub image: Option<String>,
}

/// Where Wix sends the shopper when checkout finishes or is abandoned.
#[derive(Debug, Clone)]
pub struct CheckoutCallbacks {
    /// Return URL when the shopper leaves checkout.
    pub post_flow_url: String,
    /// Thank-you page after a completed order.
    pub thank_you_page_url: String,
}

impl CheckoutCallbacks {
    /// Callbacks rooted at the storefront's public URL.
    #[must_use]
    pub fn for_site(base_url: &str) -> Self {
        Self {
            post_flow_url: base_url.to_string(),
            thank_you_page_url: format!("{base_url}/checkout-success"),
        }
    }
}

/// Parameters of a member login redirect.
#[derive(Debug, Clone)]
pub struct LoginRedirect {
    /// OAuth callback URL.
    pub redirect_uri: String,
    /// CSRF state echoed back on the callback.
    pub state: String,
    /// PKCE S256 code challenge.
    pub code_challenge: String,
}

// =============================================================================
// Request Bodies
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CatalogReferenceInput<'a> {
    pub app_id: &'a str,
    pub catalog_item_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<CatalogOptionsInput<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CatalogOptionsInput<'a> {
    pub options: &'a BTreeMap<String, String>,
}

impl<'a> CatalogReferenceInput<'a> {
    pub fn new(
        app_id: &'a str,
        product_id: &'a ProductId,
        options: &'a BTreeMap<String, String>,
    ) -> Self {
        Self {
            app_id,
            catalog_item_id: product_id.as_str(),
            options: (!options.is_empty()).then_some(CatalogOptionsInput { options }),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LineItemInput<'a> {
    pub catalog_reference: CatalogReferenceInput<'a>,
    pub quantity: u32,
}

impl<'a> LineItemInput<'a> {
    pub fn from_values(app_id: &'a str, values: &'a AddToCartValues) -> Self {
        Self {
            catalog_reference: CatalogReferenceInput::new(
                app_id,
                &values.product_id,
                &values.options,
            ),
            quantity: values.quantity,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AddToCartBody<'a> {
    pub line_items: [LineItemInput<'a>; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuantityUpdate<'a> {
    #[serde(rename = "_id")]
    pub id: &'a str,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateQuantityBody<'a> {
    pub line_items: [QuantityUpdate<'a>; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RemoveLineItemsBody<'a> {
    pub line_item_ids: [&'a str; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateCheckoutBody<'a> {
    pub channel_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_items: Option<[LineItemInput<'a>; 1]>,
}

/// Body of `POST /oauth2/token`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenRequest<'a> {
    pub client_id: &'a str,
    pub grant_type: &'a str,
    #[serde(rename = "refresh_token", skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_verifier: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BackInStockBody<'a> {
    pub request: BackInStockRequestInput<'a>,
    pub item_details: BackInStockItemDetails<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BackInStockRequestInput<'a> {
    pub email: &'a str,
    pub item_url: &'a str,
    pub catalog_reference: CatalogReferenceInput<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BackInStockItemDetails<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<&'a str>,
}

impl<'a> BackInStockBody<'a> {
    pub fn new(app_id: &'a str, request: &'a BackInStockRequest) -> Self {
        Self {
            request: BackInStockRequestInput {
                email: request.email.as_str(),
                item_url: &request.item_url,
                catalog_reference: CatalogReferenceInput::new(
                    app_id,
                    &request.product_id,
                    &request.options,
                ),
            },
            item_details: BackInStockItemDetails {
                name: &request.name,
                price: request.price.as_deref(),
                image: request.image.as_deref(),
            },
        }
    }
}

/// Body of the catalog `query` endpoints. `filter` and `sort` are JSON
/// documents sent as strings.
#[derive(Debug, Serialize)]
pub(crate) struct CatalogQueryBody {
    pub query: CatalogQuery,
}

#[derive(Debug, Serialize)]
pub(crate) struct CatalogQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    pub paging: Paging,
}

#[derive(Debug, Serialize)]
pub(crate) struct Paging {
    pub limit: u32,
    pub offset: u32,
}

impl CatalogQueryBody {
    /// Collections other than `excluded`.
    pub fn collections_excluding(excluded: &[&str], limit: u32) -> Self {
        Self {
            query: CatalogQuery {
                filter: Some(serde_json::json!({ "id": { "$nin": excluded } }).to_string()),
                sort: None,
                paging: Paging { limit, offset: 0 },
            },
        }
    }

    /// One listing page of the shop query.
    pub fn products(query: &ProductQuery, limit: u32) -> Self {
        // Keys in lexical order, so the document reads the same whatever
        // map ordering serde_json was built with
        let mut filter = serde_json::Map::new();
        if !query.collection_ids.is_empty() {
            filter.insert(
                "collectionIds".into(),
                serde_json::json!({ "$hasSome": query.collection_ids }),
            );
        }
        if let Some(q) = &query.q {
            filter.insert("name".into(), serde_json::json!({ "$startsWith": q }));
        }
        let mut price = serde_json::Map::new();
        if let Some(min) = query.price_min {
            price.insert("$gte".into(), min.into());
        }
        if let Some(max) = query.price_max {
            price.insert("$lte".into(), max.into());
        }
        if !price.is_empty() {
            filter.insert("priceData.price".into(), price.into());
        }

        let sort = match query.sort {
            ProductsSort::PriceAsc => serde_json::json!([{ "priceData.price": "asc" }]),
            ProductsSort::PriceDesc => serde_json::json!([{ "priceData.price": "desc" }]),
            ProductsSort::LastUpdated => serde_json::json!([{ "lastUpdated": "desc" }]),
        };

        Self {
            query: CatalogQuery {
                filter: (!filter.is_empty()).then(|| serde_json::Value::Object(filter).to_string()),
                sort: Some(sort.to_string()),
                paging: Paging {
                    limit,
                    offset: query.offset(),
                },
            },
        }
    }
}

/// Body of `PATCH /members/v1/members/{id}`.
#[derive(Debug, Serialize)]
pub(crate) struct UpdateMemberBody<'a> {
    pub member: MemberPatch<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MemberPatch<'a> {
    pub contact: ContactPatch<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ContactPatch<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
}

impl<'a> From<&'a MemberUpdate> for UpdateMemberBody<'a> {
    fn from(update: &'a MemberUpdate) -> Self {
        Self {
            member: MemberPatch {
                contact: ContactPatch {
                    first_name: &update.first_name,
                    last_name: &update.last_name,
                },
            },
        }
    }
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct CartEnvelope {
    pub cart: WireCart,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireCart {
    #[serde(rename = "_id", alias = "id")]
    pub id: Option<String>,
    #[serde(default)]
    pub line_items: Vec<WireLineItem>,
    pub currency: Option<String>,
    pub subtotal: Option<WirePrice>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireLineItem {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub quantity: u32,
    pub catalog_reference: Option<WireCatalogReference>,
    pub product_name: Option<Translatable>,
    pub url: Option<String>,
    pub price: Option<WirePrice>,
    pub full_price: Option<WirePrice>,
    #[serde(default)]
    pub description_lines: Vec<WireDescriptionLine>,
    pub image: Option<String>,
    pub availability: Option<WireAvailability>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireCatalogReference {
    pub catalog_item_id: String,
    pub options: Option<WireCatalogOptions>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireCatalogOptions {
    #[serde(default)]
    pub options: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Translatable {
    pub original: Option<String>,
    pub translated: Option<String>,
}

impl Translatable {
    fn text(self) -> Option<String> {
        self.translated.or(self.original).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireDescriptionLine {
    pub name: Option<Translatable>,
    pub plain_text: Option<Translatable>,
    pub color_info: Option<Translatable>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WirePrice {
    pub amount: Option<String>,
    pub converted_amount: Option<String>,
    pub formatted_amount: Option<String>,
    pub formatted_converted_amount: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireAvailability {
    #[serde(default)]
    pub status: AvailabilityStatus,
    pub quantity_available: Option<u32>,
}

/// Response of `POST /oauth2/token`.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateCheckoutResponse {
    pub checkout_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CheckoutEnvelope {
    pub checkout: WireCheckout,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireCheckout {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RedirectSessionEnvelope {
    pub redirect_session: WireRedirectSession,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireRedirectSession {
    pub full_url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CollectionsEnvelope {
    #[serde(default)]
    pub collections: Vec<WireCollection>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CollectionEnvelope {
    pub collection: Option<WireCollection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireCollection {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    pub description: Option<String>,
    pub media: Option<WireMedia>,
    #[serde(default)]
    pub number_of_products: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireMedia {
    pub main_media: Option<WireMediaItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireMediaItem {
    pub image: Option<WireImage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireImage {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProductsEnvelope {
    #[serde(default)]
    pub products: Vec<WireProduct>,
    #[serde(default)]
    pub total_results: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireProduct {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    pub price_data: Option<WirePriceData>,
    pub media: Option<WireMedia>,
    pub stock: Option<WireStock>,
    pub ribbon: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WirePriceData {
    pub currency: Option<String>,
    pub price: Option<Decimal>,
    pub discounted_price: Option<Decimal>,
    pub formatted: Option<WireFormattedPrice>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireFormattedPrice {
    pub price: Option<String>,
    pub discounted_price: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireStock {
    #[serde(default)]
    pub in_stock: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MemberEnvelope {
    pub member: WireMember,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireMember {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub login_email: Option<String>,
    pub contact: Option<WireContact>,
    pub profile: Option<WireMemberProfile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireContact {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireMemberProfile {
    pub nickname: Option<String>,
}

/// Error body shape shared by Wix REST APIs.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireErrorBody {
    pub message: Option<String>,
    pub details: Option<WireErrorDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireErrorDetails {
    pub application_error: Option<WireApplicationError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireApplicationError {
    pub code: String,
    #[serde(default)]
    pub description: String,
}

// =============================================================================
// Conversions
// =============================================================================

impl WirePrice {
    fn into_money(self, currency: CurrencyCode) -> Money {
        let amount = self
            .converted_amount
            .or(self.amount)
            .and_then(|raw| raw.parse::<Decimal>().ok())
            .unwrap_or(Decimal::ZERO);
        let formatted = self.formatted_converted_amount.or(self.formatted_amount);

        Money {
            amount,
            currency,
            formatted,
        }
    }
}

impl WireDescriptionLine {
    fn into_text(self) -> Option<String> {
        let name = self.name.and_then(Translatable::text);
        let value = self
            .plain_text
            .or(self.color_info)
            .and_then(Translatable::text);
        match (name, value) {
            (Some(name), Some(value)) => Some(format!("{name}: {value}")),
            (None, Some(value)) => Some(value),
            (Some(name), None) => Some(name),
            (None, None) => None,
        }
    }
}

impl WireLineItem {
    fn into_line_item(self, currency: CurrencyCode) -> LineItem {
        let (product_id, options) = self.catalog_reference.map_or_else(
            || (String::new(), BTreeMap::new()),
            |reference| {
                let options = reference
                    .options
                    .map(|o| {
                        o.options
                            .into_iter()
                            .map(|(key, value)| match value {
                                serde_json::Value::String(s) => (key, s),
                                other => (key, other.to_string()),
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                (reference.catalog_item_id, options)
            },
        );

        LineItem {
            id: LineItemId::new(self.id),
            product_id: ProductId::new(product_id),
            product_name: self
                .product_name
                .and_then(Translatable::text)
                .unwrap_or_default(),
            slug: self.url.as_deref().and_then(slug_from_url),
            options,
            description_lines: self
                .description_lines
                .into_iter()
                .filter_map(WireDescriptionLine::into_text)
                .collect(),
            quantity: self.quantity,
            price: self.price.map_or_else(
                || Money::zero(currency),
                |p| p.into_money(currency),
            ),
            full_price: self.full_price.map(|p| p.into_money(currency)),
            image: self.image.filter(|s| !s.is_empty()),
            availability: self.availability.map_or_else(Availability::default, |a| {
                Availability {
                    status: a.status,
                    quantity_available: a.quantity_available,
                }
            }),
        }
    }
}

impl From<WireCart> for CartSnapshot {
    fn from(cart: WireCart) -> Self {
        let currency = cart
            .currency
            .as_deref()
            .map(CurrencyCode::parse_or_default)
            .unwrap_or_default();

        Self {
            id: cart.id.map(CartId::new),
            line_items: cart
                .line_items
                .into_iter()
                .map(|item| item.into_line_item(currency))
                .collect(),
            subtotal: cart.subtotal.map(|p| p.into_money(currency)),
            currency,
        }
    }
}

impl WireMedia {
    fn into_image(self) -> Option<String> {
        self.main_media
            .and_then(|m| m.image)
            .and_then(|i| i.url)
            .filter(|url| !url.is_empty())
    }
}

impl From<WireCollection> for Collection {
    fn from(collection: WireCollection) -> Self {
        Self {
            id: CollectionId::new(collection.id),
            name: collection.name,
            slug: collection.slug,
            description: collection.description.filter(|d| !d.is_empty()),
            image: collection.media.and_then(WireMedia::into_image),
            product_count: collection.number_of_products,
        }
    }
}

impl From<WireProduct> for ProductSummary {
    fn from(product: WireProduct) -> Self {
        let (price, discounted_price) = product.price_data.map_or_else(
            || (Money::zero(CurrencyCode::default()), None),
            WirePriceData::into_prices,
        );

        Self {
            id: ProductId::new(product.id),
            name: product.name,
            slug: product.slug,
            price,
            discounted_price,
            image: product.media.and_then(WireMedia::into_image),
            ribbon: product.ribbon.filter(|r| !r.is_empty()),
            in_stock: product.stock.is_some_and(|s| s.in_stock),
        }
    }
}

impl WirePriceData {
    /// List price, plus the sale price when it is lower.
    fn into_prices(self) -> (Money, Option<Money>) {
        let currency = self
            .currency
            .as_deref()
            .map(CurrencyCode::parse_or_default)
            .unwrap_or_default();
        let (formatted_price, formatted_discount) = self
            .formatted
            .map_or((None, None), |f| (f.price, f.discounted_price));

        let price = Money {
            amount: self.price.unwrap_or(Decimal::ZERO),
            currency,
            formatted: formatted_price,
        };
        let discounted = self
            .discounted_price
            .filter(|d| *d < price.amount)
            .map(|amount| Money {
                amount,
                currency,
                formatted: formatted_discount,
            });
        (price, discounted)
    }
}

impl From<WireMember> for MemberProfile {
    fn from(member: WireMember) -> Self {
        let (first_name, last_name) = member
            .contact
            .map_or((None, None), |c| (c.first_name, c.last_name));
        Self {
            id: MemberId::new(member.id),
            login_email: member.login_email,
            first_name,
            last_name,
            nickname: member.profile.and_then(|p| p.nickname),
        }
    }
}

impl TokenResponse {
    /// Build a session token pair issued at `now` (Unix seconds).
    ///
    /// Refresh responses may omit the refresh token, in which case the one
    /// used for the request stays valid.
    pub fn into_tokens(
        self,
        role: TokenRole,
        fallback_refresh: Option<&str>,
        now: i64,
    ) -> Option<SessionTokens> {
        let refresh = self
            .refresh_token
            .filter(|r| !r.is_empty())
            .or_else(|| fallback_refresh.map(str::to_string))?;

        Some(SessionTokens {
            access_token: AccessToken {
                value: self.access_token,
                expires_at: now.saturating_add(self.expires_in),
            },
            refresh_token: RefreshToken {
                value: refresh,
                role,
            },
        })
    }
}

/// Product slug from a line item URL (last non-empty path segment).
fn slug_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
        .map(str::to_string)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_cart() -> serde_json::Value {
        serde_json::json!({
            "cart": {
                "_id": "cart-123",
                "currency": "EUR",
                "lineItems": [{
                    "_id": "line-1",
                    "quantity": 2,
                    "catalogReference": {
                        "catalogItemId": "prod-1",
                        "appId": "app",
                        "options": { "options": { "Size": "M" }, "variantId": "v1" }
                    },
                    "productName": { "original": "Linen Shirt", "translated": "Linen Shirt" },
                    "url": "https://shop.example.com/products/linen-shirt?ref=cart",
                    "price": {
                        "amount": "40", "convertedAmount": "40",
                        "formattedAmount": "€40.00", "formattedConvertedAmount": "€40.00"
                    },
                    "fullPrice": { "amount": "50", "convertedAmount": "50" },
                    "descriptionLines": [
                        { "name": { "original": "Size" }, "plainText": { "original": "M" } },
                        { "name": { "original": "Color" }, "colorInfo": { "original": "Sand" } }
                    ],
                    "image": "wix:image://v1/abc.jpg",
                    "availability": { "status": "AVAILABLE", "quantityAvailable": 7 }
                }],
                "subtotal": { "amount": "80", "formattedConvertedAmount": "€80.00" }
            }
        })
    }

    #[test]
    fn test_cart_conversion() {
        let envelope: CartEnvelope = serde_json::from_value(sample_cart()).unwrap();
        let cart = CartSnapshot::from(envelope.cart);

        assert_eq!(cart.id.as_ref().map(CartId::as_str), Some("cart-123"));
        assert_eq!(cart.currency, CurrencyCode::EUR);
        assert_eq!(cart.subtotal.as_ref().unwrap().display(), "€80.00");

        let line = &cart.line_items[0];
        assert_eq!(line.id.as_str(), "line-1");
        assert_eq!(line.product_id.as_str(), "prod-1");
        assert_eq!(line.product_name, "Linen Shirt");
        assert_eq!(line.slug.as_deref(), Some("linen-shirt"));
        assert_eq!(line.options.get("Size").map(String::as_str), Some("M"));
        assert_eq!(line.description_lines, ["Size: M", "Color: Sand"]);
        assert_eq!(line.quantity, 2);
        assert_eq!(line.price.display(), "€40.00");
        assert!(line.is_discounted());
        assert_eq!(line.availability.ceiling(), Some(7));
    }

    #[test]
    fn test_unknown_availability_status() {
        let item: WireLineItem = serde_json::from_value(serde_json::json!({
            "id": "line-1",
            "quantity": 1,
            "availability": { "status": "SOMETHING_NEW" }
        }))
        .unwrap();
        let line = item.into_line_item(CurrencyCode::USD);
        assert_eq!(line.availability.status, AvailabilityStatus::Unknown);
        assert_eq!(line.price, Money::zero(CurrencyCode::USD));
    }

    #[test]
    fn test_add_to_cart_body() {
        let values = AddToCartValues {
            product_id: ProductId::new("prod-1"),
            options: BTreeMap::from([("Size".to_string(), "L".to_string())]),
            quantity: 2,
        };
        let body = AddToCartBody {
            line_items: [LineItemInput::from_values("app", &values)],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "lineItems": [{
                    "catalogReference": {
                        "appId": "app",
                        "catalogItemId": "prod-1",
                        "options": { "options": { "Size": "L" } }
                    },
                    "quantity": 2
                }]
            })
        );
    }

    #[test]
    fn test_token_request_shape() {
        let body = TokenRequest {
            client_id: "client",
            grant_type: "refresh_token",
            refresh_token: Some("r-1"),
            code: None,
            code_verifier: None,
            redirect_uri: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "clientId": "client",
                "grantType": "refresh_token",
                "refresh_token": "r-1"
            })
        );
    }

    #[test]
    fn test_token_response_keeps_refresh_token() {
        let response = TokenResponse {
            access_token: "a-2".to_string(),
            expires_in: 14_400,
            refresh_token: None,
        };
        let tokens = response
            .into_tokens(TokenRole::Member, Some("r-1"), 1_000)
            .unwrap();
        assert_eq!(tokens.access_token.expires_at, 15_400);
        assert_eq!(tokens.refresh_token.value, "r-1");
        assert_eq!(tokens.role(), TokenRole::Member);

        let anonymous = TokenResponse {
            access_token: "a".to_string(),
            expires_in: 10,
            refresh_token: None,
        };
        assert!(anonymous.into_tokens(TokenRole::Visitor, None, 0).is_none());
    }

    #[test]
    fn test_slug_from_url() {
        assert_eq!(slug_from_url("https://x.com/products/tee/").as_deref(), Some("tee"));
        assert_eq!(slug_from_url("/product-page/mug#top").as_deref(), Some("mug"));
        assert_eq!(slug_from_url(""), None);
    }

    #[test]
    fn test_error_body_application_code() {
        let body: WireErrorBody = serde_json::from_str(
            r#"{"message":"exists","details":{"applicationError":{"code":"BACK_IN_STOCK_NOTIFICATION_ALREADY_EXISTS","description":"Already subscribed"}}}"#,
        )
        .unwrap();
        let app = body.details.unwrap().application_error.unwrap();
        assert_eq!(app.code, "BACK_IN_STOCK_NOTIFICATION_ALREADY_EXISTS");
        assert_eq!(app.description, "Already subscribed");
    }
}
