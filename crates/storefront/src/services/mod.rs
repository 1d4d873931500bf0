//! Storefront services built on the Wix platform traits.
//!
//! # Services
//!
//! - `back_in_stock` - Restock notification subscriptions
//! - `catalog` - Shop listing pages and collection lookups
//! - `checkout` - Hosted checkout redirects for the cart and quick buy
//! - `members` - Member profile edits

pub mod back_in_stock;
pub mod catalog;
pub mod checkout;
pub mod members;
