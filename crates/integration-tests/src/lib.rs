//! Integration tests for Craftcart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p craftcart-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_persistence` - Rehydrating carts from memory and file stores
//! - `pricing_scenarios` - Totals, coupon eligibility and invariants through `CartStore`
//! - `cross_tab_sync` - Convergence of carts sharing one durable store
//!
//! This library holds the shared fixtures.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use craftcart_cart::{
    CartKeys, CartStore, CouponCatalog, DurableStore, PricingEngine, PricingRules, Product, Result,
};
use craftcart_core::{Money, ProductId};

/// Pricing with the default rules and built-in coupons.
#[must_use]
pub fn default_pricing() -> PricingEngine {
    PricingEngine::new(PricingRules::default(), Arc::new(CouponCatalog::default()))
}

/// A product priced in whole rupees.
#[must_use]
pub fn product(id: i32, name: &str, price: i64) -> Product {
    Product::new(
        ProductId::new(id),
        name,
        Money::from_major(price),
        format!("/images/{id}.jpg"),
    )
}

/// Open a cart with default keys and pricing.
///
/// # Errors
///
/// Returns `CartError::Storage` if the store cannot be read.
pub fn open_cart(storage: impl DurableStore + 'static) -> Result<CartStore> {
    CartStore::open(CartKeys::default(), default_pricing(), storage)
}
