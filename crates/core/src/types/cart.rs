//! Cart snapshots and line items.
//!
//! A [`CartSnapshot`] is the last observed state of a shopper's cart. The
//! storefront never edits one in place: optimistic edits build a new snapshot
//! from the old one, and confirmed responses from the platform replace the
//! snapshot wholesale.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::id::{CartId, LineItemId, ProductId};
use super::price::{CurrencyCode, Money};

/// Stock status reported by the platform for a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvailabilityStatus {
    Available,
    PartiallyAvailable,
    NotAvailable,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Availability of a line item's merchandise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Availability {
    /// Stock status.
    pub status: AvailabilityStatus,
    /// Units left in stock, when inventory is tracked.
    pub quantity_available: Option<u32>,
}

impl Availability {
    /// Availability with a known stock ceiling.
    #[must_use]
    pub const fn limited(quantity_available: u32) -> Self {
        Self {
            status: AvailabilityStatus::Available,
            quantity_available: Some(quantity_available),
        }
    }

    /// Availability without inventory tracking.
    #[must_use]
    pub const fn untracked() -> Self {
        Self {
            status: AvailabilityStatus::Available,
            quantity_available: None,
        }
    }

    /// The quantity ceiling, if one is known.
    ///
    /// A reported ceiling of zero is treated as unknown, matching how the
    /// platform reports untracked inventory on some catalogs.
    #[must_use]
    pub fn ceiling(&self) -> Option<u32> {
        self.quantity_available.filter(|&n| n > 0)
    }
}

/// A line item in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Line item ID (unique within the cart).
    pub id: LineItemId,
    /// Catalog product the line refers to.
    pub product_id: ProductId,
    /// Display name of the product.
    pub product_name: String,
    /// Product page slug, derived from the item URL.
    pub slug: Option<String>,
    /// Selected options (e.g., "Size" -> "M").
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    /// Human-readable description lines (chosen colour, size, ...).
    #[serde(default)]
    pub description_lines: Vec<String>,
    /// Quantity in the cart.
    pub quantity: u32,
    /// Current unit price.
    pub price: Money,
    /// Unit price before discounts, when different from `price`.
    pub full_price: Option<Money>,
    /// Media identifier or URL of the product image.
    pub image: Option<String>,
    /// Stock information.
    #[serde(default)]
    pub availability: Availability,
}

impl LineItem {
    /// Whether this line holds the same merchandise an add-to-cart targets.
    #[must_use]
    pub fn matches(&self, values: &AddToCartValues) -> bool {
        self.product_id == values.product_id && self.options == values.options
    }

    /// Whether the line is currently discounted.
    #[must_use]
    pub fn is_discounted(&self) -> bool {
        self.full_price
            .as_ref()
            .is_some_and(|full| full.amount != self.price.amount)
    }

    /// Line total (unit price times quantity).
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.price.times(self.quantity)
    }
}

/// Input for adding merchandise to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddToCartValues {
    /// Catalog product to add.
    pub product_id: ProductId,
    /// Selected product options.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    /// Quantity to add.
    pub quantity: u32,
}

/// The last observed cart state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CartSnapshot {
    /// Platform cart ID (absent for an optimistic snapshot of a cart that
    /// does not exist yet).
    pub id: Option<CartId>,
    /// Ordered line items.
    pub line_items: Vec<LineItem>,
    /// Subtotal as computed by the platform.
    pub subtotal: Option<Money>,
    /// Cart currency.
    pub currency: CurrencyCode,
}

impl CartSnapshot {
    /// Badge label shown once the cart holds this many units or more.
    pub const BADGE_OVERFLOW: u32 = 10;

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.line_items
            .iter()
            .fold(0_u32, |acc, item| acc.saturating_add(item.quantity))
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.line_items.is_empty()
    }

    /// Look up a line by ID.
    #[must_use]
    pub fn item(&self, id: &LineItemId) -> Option<&LineItem> {
        self.line_items.iter().find(|item| &item.id == id)
    }

    /// Label for the cart badge ("9+" once the count reaches ten).
    #[must_use]
    pub fn badge_label(&self) -> String {
        let total = self.total_quantity();
        if total < Self::BADGE_OVERFLOW {
            total.to_string()
        } else {
            format!("{}+", Self::BADGE_OVERFLOW - 1)
        }
    }

    /// A new snapshot with one line's quantity replaced.
    ///
    /// Lines other than `id` are untouched; an unknown `id` yields an equal
    /// snapshot.
    #[must_use]
    pub fn with_quantity(&self, id: &LineItemId, quantity: u32) -> Self {
        Self {
            line_items: self
                .line_items
                .iter()
                .map(|item| {
                    if &item.id == id {
                        LineItem {
                            quantity,
                            ..item.clone()
                        }
                    } else {
                        item.clone()
                    }
                })
                .collect(),
            ..self.clone()
        }
    }

    /// A new snapshot without the given line.
    #[must_use]
    pub fn without_item(&self, id: &LineItemId) -> Self {
        Self {
            line_items: self
                .line_items
                .iter()
                .filter(|item| &item.id != id)
                .cloned()
                .collect(),
            ..self.clone()
        }
    }

    /// A new snapshot with an add-to-cart folded into a matching line.
    ///
    /// Returns `None` when no existing line matches: the platform has to
    /// price and identify a brand-new line, so there is nothing sensible to
    /// guess locally.
    #[must_use]
    pub fn with_added(&self, values: &AddToCartValues) -> Option<Self> {
        let existing = self.line_items.iter().find(|item| item.matches(values))?;
        let quantity = existing.quantity.saturating_add(values.quantity);
        Some(self.with_quantity(&existing.id, quantity))
    }
}

/// Line and cart builders for tests in this and dependent crates.
#[cfg(any(test, feature = "test-support"))]
pub mod fixtures {
    use super::*;

    pub fn line(id: &str, quantity: u32, available: Option<u32>) -> LineItem {
        LineItem {
            id: LineItemId::new(id),
            product_id: ProductId::new(format!("product-{id}")),
            product_name: format!("Product {id}"),
            slug: Some(format!("product-{id}")),
            options: BTreeMap::new(),
            description_lines: Vec::new(),
            quantity,
            price: Money::from_minor_units(1000, CurrencyCode::USD),
            full_price: None,
            image: None,
            availability: Availability {
                status: AvailabilityStatus::Available,
                quantity_available: available,
            },
        }
    }

    pub fn cart(lines: Vec<LineItem>) -> CartSnapshot {
        CartSnapshot {
            id: Some(CartId::new("cart-1")),
            line_items: lines,
            subtotal: None,
            currency: CurrencyCode::USD,
        }
    }
}
