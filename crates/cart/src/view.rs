//! Display data for a presentation layer.
//!
//! These types turn engine state into ready-to-render strings: formatted
//! prices, the order summary, coupon feedback, and short-lived notifications.
//! They hold no behavior of their own.

use craftcart_core::{CurrencyCode, Money, ProductId};
use serde::Serialize;

use crate::cart::{CartState, LineItem};
use crate::catalog::CouponCatalog;
use crate::error::{CartError, Result};
use crate::pricing::PricingEngine;
use crate::store::CartChange;

/// Cart item display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItemView {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub image: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
}

impl CartItemView {
    fn new(item: &LineItem, currency: CurrencyCode) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            category: item.category_or_default().to_string(),
            image: item.image.clone(),
            quantity: item.quantity,
            price: item.price.display_in(currency),
            line_price: item.line_total().display_in(currency),
        }
    }
}

/// Applied coupon display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedCouponView {
    pub code: String,
    pub description: String,
}

/// Order summary display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryView {
    pub subtotal: String,
    /// "Free!" when waived.
    pub shipping: String,
    /// Only present when a discount applies.
    pub discount: Option<String>,
    pub total: String,
    /// "Add ₹X more for free shipping!" below the threshold.
    pub free_shipping_hint: Option<String>,
}

/// Cart display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub item_count: u64,
    pub summary: SummaryView,
    pub coupon: Option<AppliedCouponView>,
}

impl CartView {
    /// Build the view for a cart snapshot.
    #[must_use]
    pub fn build(state: &CartState, pricing: &PricingEngine, currency: CurrencyCode) -> Self {
        let quote = pricing.quote(state);
        let summary = SummaryView {
            subtotal: quote.subtotal.display_in(currency),
            shipping: if quote.shipping_cost.is_zero() {
                "Free!".to_string()
            } else {
                quote.shipping_cost.display_in(currency)
            },
            discount: (!quote.discount.is_zero())
                .then(|| format!("-{}", quote.discount.display_in(currency))),
            total: quote.total.display_in(currency),
            free_shipping_hint: pricing.free_shipping_gap(quote.subtotal).map(|gap| {
                format!("Add {} more for free shipping!", gap.display_in(currency))
            }),
        };

        let coupon = state
            .applied_coupon
            .as_deref()
            .and_then(|code| pricing.catalog().lookup(code))
            .map(|coupon| AppliedCouponView {
                code: coupon.code.clone(),
                description: coupon.description.clone(),
            });

        Self {
            items: state
                .items
                .iter()
                .map(|item| CartItemView::new(item, currency))
                .collect(),
            item_count: state.total_item_count(),
            summary,
            coupon,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Result of a coupon application, phrased for the shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CouponOutcome {
    pub success: bool,
    pub message: String,
    pub discount: Option<Money>,
}

impl CouponOutcome {
    /// Phrase the result of `CartStore::apply_coupon(code)`.
    #[must_use]
    pub fn from_result(
        code: &str,
        result: &Result<Money>,
        catalog: &CouponCatalog,
        currency: CurrencyCode,
    ) -> Self {
        match result {
            Ok(discount) => {
                let description = catalog
                    .lookup(code)
                    .map(|coupon| coupon.description.as_str())
                    .unwrap_or_default();
                Self {
                    success: true,
                    message: format!("Coupon applied! {description}").trim_end().to_string(),
                    discount: Some(*discount),
                }
            }
            Err(err) => Self {
                success: false,
                message: rejection_message(err, currency),
                discount: None,
            },
        }
    }
}

fn rejection_message(err: &CartError, currency: CurrencyCode) -> String {
    match err {
        CartError::InvalidCoupon(_) => "Invalid coupon code".to_string(),
        CartError::MinimumOrderNotMet { min_order, .. } => format!(
            "Minimum order of {} required for this coupon",
            min_order.display_in(currency)
        ),
        CartError::CouponAlreadyApplied(_) => "Coupon already applied".to_string(),
        CartError::AmountOverflow => "Your cart total is too large".to_string(),
        CartError::Storage(_) => "Could not save your cart. Please try again.".to_string(),
    }
}

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Info,
    Error,
}

/// A short-lived message for the shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    /// Notification for a cart change, if the change warrants one.
    #[must_use]
    pub fn for_change(change: &CartChange) -> Option<Self> {
        let (level, message) = match change {
            CartChange::ItemAdded { name, .. } => {
                (NotificationLevel::Success, format!("{name} added to cart!"))
            }
            CartChange::ItemRemoved { name, .. } => {
                (NotificationLevel::Info, format!("{name} removed from cart"))
            }
            CartChange::Cleared => (NotificationLevel::Info, "Cart cleared".to_string()),
            CartChange::QuantityChanged { .. }
            | CartChange::CouponApplied { .. }
            | CartChange::CouponRemoved
            | CartChange::Reloaded => return None,
        };
        Some(Self { level, message })
    }

    /// Notification echoing a coupon outcome.
    #[must_use]
    pub fn for_coupon(outcome: &CouponOutcome) -> Self {
        Self {
            level: if outcome.success {
                NotificationLevel::Success
            } else {
                NotificationLevel::Error
            },
            message: outcome.message.clone(),
        }
    }
}
