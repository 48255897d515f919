//! DWA Market Core - Shared types and rules.
//!
//! This crate provides the domain model used by every DWA Market component:
//! - `client` - HTTP access layer, client store, cart sync and checkout
//! - `cli` - Terminal front-end for buyers, vendors and admins
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no HTTP
//! clients, no storage. This keeps it lightweight and trivially testable.
//!
//! # Modules
//!
//! - [`types`] - IDs, emails, users, items, cart lines and the cart itself
//! - [`pricing`] - Subtotal, delivery fee, tax and total of a cart
//! - [`validation`] - Form checks performed before any request is made
//! - [`route`] - Client routes the session logic can redirect to

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pricing;
pub mod route;
pub mod types;
pub mod validation;

pub use pricing::{PriceBreakdown, Pricing};
pub use route::{NavigationMode, Route};
pub use types::*;
pub use validation::ValidationError;
