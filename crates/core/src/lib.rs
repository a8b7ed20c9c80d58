//! Bazaar Core - Shared domain types.
//!
//! This crate provides the types used by both Bazaar binaries:
//! - `storefront` - Public catalogue, cart, checkout and order history
//! - `admin` - User management screen
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. Everything that talks to the REST backend lives in the binaries.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails, passwords, prices and statuses
//! - [`pricing`] - Discount arithmetic and order totals
//! - [`reconcile`](mod@reconcile) - Comparing an abandoned order with the current cart

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pricing;
pub mod reconcile;
pub mod types;

pub use pricing::{LineItem, OrderTotals};
pub use reconcile::{OrderSnapshot, Reconciliation, reconcile};
pub use types::*;
