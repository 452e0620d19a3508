//! Error types for the cart engine.
//!
//! Coupon failures are ordinary domain outcomes reported to the caller; the
//! presentation layer turns them into user-facing messages (see
//! [`crate::view::CouponOutcome`]). Storage failures are fail-fast: a mutation
//! whose write is rejected leaves the in-memory cart untouched.

use craftcart_core::Money;
use thiserror::Error;

/// Durable store operation failed.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A document could not be encoded for storage.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store refused the operation (quota, permissions, poisoned lock).
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Coupon catalog definition is invalid.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("coupon code cannot be empty")]
    EmptyCode,

    #[error("duplicate coupon code: {0}")]
    DuplicateCode(String),

    #[error("coupon {0}: percentage must be between 0 and 100")]
    PercentageOutOfRange(String),

    #[error("coupon {0}: amounts cannot be negative")]
    NegativeAmount(String),

    #[error("invalid catalog document: {0}")]
    Parse(String),
}

/// Cart operation error.
#[derive(Debug, Error)]
pub enum CartError {
    /// Coupon code is not in the catalog.
    #[error("invalid coupon code: {0}")]
    InvalidCoupon(String),

    /// Cart subtotal is below the coupon's minimum order.
    #[error("minimum order of {min_order} required for coupon {code}")]
    MinimumOrderNotMet { code: String, min_order: Money },

    /// The coupon is already the active one.
    #[error("coupon already applied: {0}")]
    CouponAlreadyApplied(String),

    /// The cart's total would exceed the largest representable amount.
    #[error("cart total is too large")]
    AmountOverflow,

    /// Persisting the cart failed; the mutation was not applied.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl CartError {
    /// Whether this is a coupon validation outcome rather than an I/O failure.
    #[must_use]
    pub const fn is_coupon_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidCoupon(_) | Self::MinimumOrderNotMet { .. } | Self::CouponAlreadyApplied(_)
        )
    }
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;
