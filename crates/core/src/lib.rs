//! Docet Core - Shared domain types library.
//!
//! This crate provides the types shared by the storefront and its tests:
//! - `storefront` - Public-facing shop and cart synchronization layer
//! - `integration-tests` - End-to-end tests against a mocked commerce platform
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no HTTP
//! clients, no caches. Cart snapshots are immutable values; every edit
//! produces a new snapshot.
//!
//! # Modules
//!
//! - [`types`] - IDs, money, email, cart snapshots, quantity rules, catalog
//!   queries, member profiles and session tokens

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
