//! Cart data model.
//!
//! The persisted document is the ordered list of [`LineItem`]s, serialized
//! with camelCase keys. The applied coupon code is stored separately as a
//! bare string.

use chrono::{DateTime, Utc};
use craftcart_core::{Money, ProductId};
use serde::{Deserialize, Serialize};

/// Category shown for products that were added without one.
pub const DEFAULT_CATEGORY: &str = "Handmade";

/// A product as offered to the cart by the catalog pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub image: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl Product {
    /// Create a product without a category.
    pub fn new(id: ProductId, name: impl Into<String>, price: Money, image: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            image: image.into(),
            category: None,
        }
    }

    /// Set the product category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// One product entry in the cart with an accumulated quantity.
///
/// Unique by `id` within a cart; `quantity` is always at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
}

impl LineItem {
    /// Create a line item for a product added at `added_at`.
    #[must_use]
    pub fn new(product: Product, quantity: u32, added_at: DateTime<Utc>) -> Self {
        Self {
            id: product.id,
            name: product.name,
            price: product.price,
            image: product.image,
            category: product.category,
            quantity,
            added_at,
        }
    }

    /// `price × quantity`, saturating.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.price.saturating_mul(self.quantity)
    }

    /// `price × quantity`, or `None` if it does not fit.
    #[must_use]
    pub fn checked_line_total(&self) -> Option<Money> {
        self.price.checked_mul(self.quantity)
    }

    /// Category for display, falling back to [`DEFAULT_CATEGORY`].
    #[must_use]
    pub fn category_or_default(&self) -> &str {
        self.category.as_deref().unwrap_or(DEFAULT_CATEGORY)
    }
}

/// Exact subtotal of `items`, or `None` on overflow.
#[must_use]
pub fn checked_subtotal(items: &[LineItem]) -> Option<Money> {
    items.iter().try_fold(Money::zero(), |sum, item| {
        sum.checked_add(item.checked_line_total()?)
    })
}

/// Snapshot of the cart: items in insertion order plus the applied coupon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartState {
    pub items: Vec<LineItem>,
    pub applied_coupon: Option<String>,
}

impl CartState {
    /// Look up an item by product id.
    #[must_use]
    pub fn item(&self, id: ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Sum of all quantities.
    #[must_use]
    pub fn total_item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Sum of `price × quantity` over all items, saturating.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Sum of `price × quantity`, or `None` if it does not fit.
    #[must_use]
    pub fn checked_subtotal(&self) -> Option<Money> {
        checked_subtotal(&self.items)
    }

    /// Whether the cart holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(id: i32, price: i64, quantity: u32) -> LineItem {
        let product = Product::new(
            ProductId::new(id),
            format!("Product {id}"),
            Money::from_major(price),
            format!("/images/{id}.jpg"),
        );
        LineItem::new(product, quantity, Utc::now())
    }

    #[test]
    fn test_subtotal_and_count() {
        let state = CartState {
            items: vec![item(1, 250, 2), item(2, 99, 3)],
            applied_coupon: None,
        };
        assert_eq!(state.subtotal(), Money::from_major(797));
        assert_eq!(state.total_item_count(), 5);
    }

    #[test]
    fn test_empty_state() {
        let state = CartState::default();
        assert!(state.is_empty());
        assert_eq!(state.subtotal(), Money::zero());
        assert_eq!(state.total_item_count(), 0);
    }

    #[test]
    fn test_item_lookup() {
        let state = CartState {
            items: vec![item(1, 10, 1), item(2, 20, 1)],
            applied_coupon: None,
        };
        assert_eq!(state.item(ProductId::new(2)).unwrap().price, Money::from_major(20));
        assert!(state.item(ProductId::new(3)).is_none());
    }

    #[test]
    fn test_subtotal_overflow_is_detected() {
        let mut huge = item(1, 1, 1);
        huge.price = "100000000000000000000".parse().unwrap();
        huge.quantity = u32::MAX;
        let state = CartState {
            items: vec![huge, item(2, 10, 1)],
            applied_coupon: None,
        };
        assert_eq!(state.checked_subtotal(), None);
        // The saturating form still answers.
        assert!(state.subtotal() > Money::zero());

        let fine = CartState {
            items: vec![item(1, 250, 2)],
            applied_coupon: None,
        };
        assert_eq!(fine.checked_subtotal(), Some(Money::from_major(500)));
    }

    #[test]
    fn test_category_fallback() {
        let plain = item(1, 10, 1);
        assert_eq!(plain.category_or_default(), DEFAULT_CATEGORY);

        let product = Product::new(ProductId::new(2), "Vase", Money::from_major(10), "v.jpg")
            .with_category("Pottery");
        let categorized = LineItem::new(product, 1, Utc::now());
        assert_eq!(categorized.category_or_default(), "Pottery");
    }

    #[test]
    fn test_line_item_uses_camel_case_keys() {
        let json = serde_json::to_value(item(5, 100, 1)).unwrap();
        assert!(json.get("addedAt").is_some());
        assert!(json.get("added_at").is_none());
        assert!(json.get("category").is_none());
    }

    #[test]
    fn test_line_item_accepts_numeric_prices() {
        let json = r#"{"id":9,"name":"Candle","price":349,"image":"c.jpg",
            "category":"Decor","quantity":2,"addedAt":"2024-05-01T10:00:00Z"}"#;
        let parsed: LineItem = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.line_total(), Money::from_major(698));
        assert_eq!(parsed.category_or_default(), "Decor");
    }
}
