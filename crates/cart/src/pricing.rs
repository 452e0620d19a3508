//! Pricing engine.
//!
//! A pure function of the cart snapshot and the coupon catalog. Nothing is
//! cached: every query recomputes from the current state.
//!
//! A coupon whose minimum order is no longer met (items were removed after it
//! was applied) stays recorded on the cart but contributes no discount.

use std::sync::Arc;

use craftcart_core::Money;
use serde::Serialize;

use crate::cart::{CartState, LineItem, checked_subtotal};
use crate::catalog::{Coupon, CouponCatalog, CouponKind};

/// Flat shipping settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingRules {
    /// Charged when shipping is not waived.
    pub shipping_rate: Money,
    /// Subtotals at or above this ship free.
    pub free_shipping_threshold: Money,
}

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            shipping_rate: Money::from_major(99),
            free_shipping_threshold: Money::from_major(699),
        }
    }
}

/// Derived price breakdown. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PricingSnapshot {
    pub subtotal: Money,
    pub shipping_cost: Money,
    pub discount: Money,
    pub total: Money,
}

/// Computes [`PricingSnapshot`]s from cart state.
#[derive(Debug, Clone)]
pub struct PricingEngine {
    rules: PricingRules,
    catalog: Arc<CouponCatalog>,
}

impl PricingEngine {
    #[must_use]
    pub const fn new(rules: PricingRules, catalog: Arc<CouponCatalog>) -> Self {
        Self { rules, catalog }
    }

    #[must_use]
    pub const fn rules(&self) -> &PricingRules {
        &self.rules
    }

    #[must_use]
    pub fn catalog(&self) -> &CouponCatalog {
        &self.catalog
    }

    /// Full breakdown for a cart: `total = subtotal + shipping - discount`.
    ///
    /// A free-shipping coupon both waives shipping and subtracts the shipping
    /// rate as its discount. On a subtotal below the shipping rate that would
    /// go negative, so the total stops at zero (which is then also the
    /// shipping cost). Percentage and fixed discounts never exceed the
    /// subtotal, so for them the floor never applies.
    #[must_use]
    pub fn quote(&self, state: &CartState) -> PricingSnapshot {
        let subtotal = state.subtotal();
        let coupon = self.applied_coupon(state);
        let shipping_cost = self.shipping_for(subtotal, coupon);
        let discount = self.discount_for_subtotal(subtotal, coupon);

        PricingSnapshot {
            subtotal,
            shipping_cost,
            discount,
            total: subtotal.saturating_add(shipping_cost).saturating_sub(discount),
        }
    }

    /// Whether `items` can be priced exactly, shipping included.
    #[must_use]
    pub fn fits(&self, items: &[LineItem]) -> bool {
        checked_subtotal(items)
            .and_then(|subtotal| subtotal.checked_add(self.rules.shipping_rate))
            .is_some()
    }

    /// Discount the applied coupon is currently worth.
    #[must_use]
    pub fn discount_for(&self, state: &CartState) -> Money {
        self.discount_for_subtotal(state.subtotal(), self.applied_coupon(state))
    }

    /// Shipping cost for a cart.
    #[must_use]
    pub fn shipping_for_state(&self, state: &CartState) -> Money {
        self.shipping_for(state.subtotal(), self.applied_coupon(state))
    }

    /// Amount still needed to reach free shipping, if below the threshold.
    #[must_use]
    pub fn free_shipping_gap(&self, subtotal: Money) -> Option<Money> {
        (subtotal < self.rules.free_shipping_threshold)
            .then(|| self.rules.free_shipping_threshold - subtotal)
    }

    /// Discount a specific coupon yields on a subtotal, ignoring eligibility.
    #[must_use]
    pub fn coupon_value(&self, coupon: &Coupon, subtotal: Money) -> Money {
        match coupon.kind {
            CouponKind::Percentage(percent) => subtotal.percent_floor(percent),
            CouponKind::FixedAmount(value) => value.min(subtotal),
            CouponKind::FreeShipping => self.rules.shipping_rate,
        }
    }

    fn applied_coupon(&self, state: &CartState) -> Option<&Coupon> {
        state
            .applied_coupon
            .as_deref()
            .and_then(|code| self.catalog.lookup(code))
    }

    fn shipping_for(&self, subtotal: Money, coupon: Option<&Coupon>) -> Money {
        let waived = coupon.is_some_and(|c| {
            matches!(c.kind, CouponKind::FreeShipping) && c.is_eligible(subtotal)
        });
        if waived || subtotal >= self.rules.free_shipping_threshold {
            Money::zero()
        } else {
            self.rules.shipping_rate
        }
    }

    fn discount_for_subtotal(&self, subtotal: Money, coupon: Option<&Coupon>) -> Money {
        match coupon {
            Some(coupon) if coupon.is_eligible(subtotal) => self.coupon_value(coupon, subtotal),
            _ => Money::zero(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use craftcart_core::ProductId;

    use super::*;
    use crate::cart::{LineItem, Product};

    fn engine() -> PricingEngine {
        PricingEngine::new(PricingRules::default(), Arc::new(CouponCatalog::default()))
    }

    fn cart(subtotal: i64, coupon: Option<&str>) -> CartState {
        let product = Product::new(
            ProductId::new(1),
            "Woven basket",
            Money::from_major(subtotal),
            "basket.jpg",
        );
        CartState {
            items: vec![LineItem::new(product, 1, Utc::now())],
            applied_coupon: coupon.map(str::to_string),
        }
    }

    #[test]
    fn test_shipping_charged_below_threshold() {
        let quote = engine().quote(&cart(698, None));
        assert_eq!(quote.shipping_cost, Money::from_major(99));
        assert_eq!(quote.discount, Money::zero());
        assert_eq!(quote.total, Money::from_major(797));
    }

    #[test]
    fn test_free_shipping_at_threshold() {
        let quote = engine().quote(&cart(699, None));
        assert_eq!(quote.shipping_cost, Money::zero());
        assert_eq!(quote.total, Money::from_major(699));
    }

    #[test]
    fn test_percentage_discount_is_floored() {
        // 15% of 805 = 120.75
        let quote = engine().quote(&cart(805, Some("NEWBIE15")));
        assert_eq!(quote.discount, Money::from_major(120));
        assert_eq!(quote.total, Money::from_major(685));
    }

    #[test]
    fn test_save10_on_500() {
        let quote = engine().quote(&cart(500, Some("SAVE10")));
        assert_eq!(quote.discount, Money::from_major(50));
        assert_eq!(quote.shipping_cost, Money::from_major(99));
        assert_eq!(quote.total, Money::from_major(549));
    }

    #[test]
    fn test_fixed_discount_capped_at_subtotal() {
        let rules = PricingRules::default();
        let catalog = CouponCatalog::new([Coupon::new(
            "BIG",
            CouponKind::FixedAmount(Money::from_major(500)),
            Money::zero(),
            "",
        )])
        .unwrap();
        let engine = PricingEngine::new(rules, Arc::new(catalog));
        let quote = engine.quote(&cart(120, Some("BIG")));
        assert_eq!(quote.discount, Money::from_major(120));
        assert_eq!(quote.total, quote.shipping_cost);
    }

    #[test]
    fn test_free_shipping_coupon() {
        // Shipping is waived and the shipping rate is also taken off.
        let quote = engine().quote(&cart(200, Some("FREESHIP")));
        assert_eq!(quote.shipping_cost, Money::zero());
        assert_eq!(quote.discount, Money::from_major(99));
        assert_eq!(quote.total, Money::from_major(101));
    }

    #[test]
    fn test_free_shipping_coupon_on_tiny_order_stops_at_zero() {
        let quote = engine().quote(&cart(1, Some("FREESHIP")));
        assert_eq!(quote.discount, Money::from_major(99));
        assert_eq!(quote.total, Money::zero());
        assert!(quote.total >= quote.shipping_cost);

        let quote = engine().quote(&cart(99, Some("FREESHIP")));
        assert_eq!(quote.total, Money::zero());
    }

    #[test]
    fn test_huge_cart_prices_without_panicking() {
        let mut state = cart(1, Some("WELCOME20"));
        state.items[0].price = "100000000000000000000".parse().unwrap();
        state.items[0].quantity = u32::MAX;
        let engine = engine();
        assert!(!engine.fits(&state.items));

        let quote = engine.quote(&state);
        assert!(quote.discount <= quote.subtotal);
        assert!(quote.total >= quote.shipping_cost);
    }

    #[test]
    fn test_fits_leaves_room_for_shipping() {
        let engine = engine();
        assert!(engine.fits(&cart(500, None).items));
        assert!(engine.fits(&[]));

        let mut state = cart(1, None);
        state.items[0].price = Money::new(rust_decimal::Decimal::MAX);
        assert!(!engine.fits(&state.items));
    }

    #[test]
    fn test_free_shipping_coupon_on_empty_cart_waives_nothing() {
        let quote = engine().quote(&CartState {
            items: Vec::new(),
            applied_coupon: Some("FREESHIP".to_string()),
        });
        assert_eq!(quote.shipping_cost, Money::from_major(99));
        assert_eq!(quote.discount, Money::zero());
        assert_eq!(quote.total, Money::from_major(99));
    }

    #[test]
    fn test_ineligible_coupon_contributes_nothing() {
        let quote = engine().quote(&cart(499, Some("SAVE10")));
        assert_eq!(quote.discount, Money::zero());
        assert_eq!(quote.total, Money::from_major(598));
    }

    #[test]
    fn test_unknown_coupon_code_is_ignored() {
        let quote = engine().quote(&cart(800, Some("GONE")));
        assert_eq!(quote.discount, Money::zero());
        assert_eq!(quote.total, Money::from_major(800));
    }

    #[test]
    fn test_empty_cart_still_charges_shipping() {
        let quote = engine().quote(&CartState::default());
        assert_eq!(quote.subtotal, Money::zero());
        assert_eq!(quote.shipping_cost, Money::from_major(99));
        assert_eq!(quote.total, Money::from_major(99));
    }

    #[test]
    fn test_free_shipping_gap() {
        let engine = engine();
        assert_eq!(
            engine.free_shipping_gap(Money::from_major(600)),
            Some(Money::from_major(99))
        );
        assert_eq!(engine.free_shipping_gap(Money::from_major(699)), None);
    }

    #[test]
    fn test_invariants_over_a_range_of_subtotals() {
        let engine = engine();
        let codes = [None, Some("SAVE10"), Some("FLAT50"), Some("WELCOME20"), Some("FREESHIP"), Some("NEWBIE15")];
        for subtotal in (0..=1500).step_by(7) {
            for code in codes {
                let quote = engine.quote(&cart(subtotal, code));
                assert!(!quote.shipping_cost.is_negative());
                assert!(quote.total >= quote.shipping_cost, "{subtotal} {code:?}");
                let free_ship = code == Some("FREESHIP");
                if free_ship && !quote.discount.is_zero() {
                    assert_eq!(quote.discount, engine.rules().shipping_rate);
                } else {
                    assert!(quote.discount <= quote.subtotal);
                }
            }
        }
    }
}
