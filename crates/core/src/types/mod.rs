//! Core types for Docet Shop.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod catalog;
pub mod email;
pub mod id;
pub mod member;
pub mod price;
pub mod quantity;
pub mod tokens;

pub use cart::{AddToCartValues, Availability, AvailabilityStatus, CartSnapshot, LineItem};
pub use catalog::{
    Collection, PRODUCTS_PAGE_SIZE, ProductPage, ProductQuery, ProductSummary, ProductsSort,
};
pub use email::{Email, EmailError};
pub use id::*;
pub use member::{MemberProfile, MemberUpdate};
pub use price::{CurrencyCode, Money};
pub use quantity::{MIN_LINE_QUANTITY, QuantityControls, QuantityError};
pub use tokens::{AccessToken, RefreshToken, SessionTokens, TokenRole};
