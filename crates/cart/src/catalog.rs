//! Coupon catalog.
//!
//! The catalog is fixed when the process starts: either the storefront's
//! built-in coupons ([`CouponCatalog::default`]) or a JSON document loaded
//! once at startup. There is no runtime mutation and no expiry. Lookups are
//! case-insensitive; codes are stored uppercase.

use std::collections::BTreeMap;

use craftcart_core::Money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// How a coupon computes its discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CouponKind {
    /// Percent of the subtotal, rounded down.
    Percentage(Decimal),
    /// Fixed amount off, capped at the subtotal.
    FixedAmount(Money),
    /// Waives the flat shipping rate.
    FreeShipping,
}

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub code: String,
    pub kind: CouponKind,
    pub min_order: Money,
    pub description: String,
}

impl Coupon {
    /// Create a coupon definition.
    pub fn new(
        code: impl Into<String>,
        kind: CouponKind,
        min_order: Money,
        description: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            kind,
            min_order,
            description: description.into(),
        }
    }

    /// Whether a cart with this subtotal qualifies.
    #[must_use]
    pub fn is_eligible(&self, subtotal: Money) -> bool {
        subtotal >= self.min_order
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.code.trim().is_empty() {
            return Err(CatalogError::EmptyCode);
        }
        if self.min_order.is_negative() {
            return Err(CatalogError::NegativeAmount(self.code.clone()));
        }
        match self.kind {
            CouponKind::Percentage(value) if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED => {
                Err(CatalogError::PercentageOutOfRange(self.code.clone()))
            }
            CouponKind::FixedAmount(value) if value.is_negative() => {
                Err(CatalogError::NegativeAmount(self.code.clone()))
            }
            _ => Ok(()),
        }
    }
}

/// Immutable, case-insensitive registry of coupons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponCatalog {
    coupons: BTreeMap<String, Coupon>,
}

impl CouponCatalog {
    /// Build a catalog, normalizing codes to uppercase.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` for empty or duplicate codes, percentages
    /// outside `0..=100`, or negative amounts.
    pub fn new(coupons: impl IntoIterator<Item = Coupon>) -> Result<Self, CatalogError> {
        let mut by_code = BTreeMap::new();
        for mut coupon in coupons {
            coupon.validate()?;
            coupon.code = normalize_code(&coupon.code);
            if by_code.contains_key(&coupon.code) {
                return Err(CatalogError::DuplicateCode(coupon.code));
            }
            by_code.insert(coupon.code.clone(), coupon);
        }
        Ok(Self { coupons: by_code })
    }

    /// Parse a catalog from a JSON array of coupons.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` for malformed JSON, or any validation
    /// error from [`CouponCatalog::new`].
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let coupons: Vec<Coupon> =
            serde_json::from_str(json).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::new(coupons)
    }

    /// Case-insensitive lookup.
    #[must_use]
    pub fn lookup(&self, code: &str) -> Option<&Coupon> {
        self.coupons.get(&normalize_code(code))
    }

    /// All coupons, ordered by code.
    pub fn iter(&self) -> impl Iterator<Item = &Coupon> {
        self.coupons.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.coupons.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coupons.is_empty()
    }
}

impl Default for CouponCatalog {
    /// The storefront's built-in coupons.
    fn default() -> Self {
        let coupons = [
            Coupon::new(
                "SAVE10",
                CouponKind::Percentage(Decimal::from(10)),
                Money::from_major(500),
                "10% off on orders above ₹500",
            ),
            Coupon::new(
                "FLAT50",
                CouponKind::FixedAmount(Money::from_major(50)),
                Money::from_major(300),
                "₹50 off on orders above ₹300",
            ),
            Coupon::new(
                "WELCOME20",
                CouponKind::Percentage(Decimal::from(20)),
                Money::from_major(1000),
                "20% off on orders above ₹1000",
            ),
            Coupon::new(
                "FREESHIP",
                CouponKind::FreeShipping,
                Money::from_major(1),
                "Free shipping on any order",
            ),
            Coupon::new(
                "NEWBIE15",
                CouponKind::Percentage(Decimal::from(15)),
                Money::from_major(799),
                "15% off for new customers",
            ),
        ];
        Self {
            coupons: coupons
                .into_iter()
                .map(|coupon| (coupon.code.clone(), coupon))
                .collect(),
        }
    }
}

/// Canonical form of a coupon code.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}
