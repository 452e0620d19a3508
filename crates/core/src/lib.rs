//! Craftcart Core - Shared types library.
//!
//! This crate provides common types used across all Craftcart components:
//! - `cart` - Cart & pricing engine (state, coupons, pricing, cross-tab sync)
//! - `cli` - Command-line front end for a file-backed cart
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access,
//! no event channels. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and money amounts

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
