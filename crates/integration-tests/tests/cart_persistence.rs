//! Carts survive being closed and reopened.

#![allow(clippy::unwrap_used)]

use craftcart_cart::{CartKeys, DurableStore, FileStore, MemoryStore};
use craftcart_core::ProductId;
use craftcart_integration_tests::{open_cart, product};
use serde_json::Value;

#[test]
fn test_memory_store_round_trip_preserves_order_and_quantities() {
    let storage = MemoryStore::new();
    let mut cart = open_cart(storage.clone()).unwrap();
    cart.add_item(product(3, "Terracotta planter", 420), 1).unwrap();
    cart.add_item(product(1, "Block-print scarf", 650), 2).unwrap();
    cart.add_item(product(3, "Terracotta planter", 420), 1).unwrap();
    cart.apply_coupon("flat50").unwrap();

    let reopened = open_cart(storage).unwrap();
    assert_eq!(reopened.snapshot(), cart.snapshot());

    let ids: Vec<_> = reopened.state().items.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![ProductId::new(3), ProductId::new(1)]);
    assert_eq!(reopened.state().applied_coupon.as_deref(), Some("FLAT50"));
}

#[test]
fn test_file_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut cart = open_cart(FileStore::open(dir.path()).unwrap()).unwrap();
        cart.add_item(product(9, "Cane lamp", 899), 1).unwrap();
        cart.apply_coupon("SAVE10").unwrap();
    }

    let reopened = open_cart(FileStore::open(dir.path()).unwrap()).unwrap();
    assert_eq!(reopened.total_item_count(), 1);
    assert_eq!(reopened.state().applied_coupon.as_deref(), Some("SAVE10"));
    assert_eq!(reopened.pricing().discount.to_string(), "89");
}

#[test]
fn test_stored_document_layout() {
    let storage = MemoryStore::new();
    let mut cart = open_cart(storage.clone()).unwrap();
    cart.add_item(product(4, "Jute rug", 1200).with_category("Home"), 2)
        .unwrap();
    cart.apply_coupon("welcome20").unwrap();

    let keys = CartKeys::default();
    let items: Value = serde_json::from_str(&storage.get(&keys.items).unwrap().unwrap()).unwrap();
    let line = &items[0];
    assert_eq!(line["id"], 4);
    assert_eq!(line["name"], "Jute rug");
    assert_eq!(line["quantity"], 2);
    assert_eq!(line["category"], "Home");
    assert!(line.get("addedAt").is_some());

    // The coupon is a bare string, not JSON.
    assert_eq!(storage.get(&keys.coupon).unwrap().as_deref(), Some("WELCOME20"));
}

#[test]
fn test_clear_removes_both_documents() {
    let storage = MemoryStore::new();
    let mut cart = open_cart(storage.clone()).unwrap();
    cart.add_item(product(1, "Clay mug", 349), 2).unwrap();
    cart.apply_coupon("SAVE10").unwrap();
    cart.clear().unwrap();

    assert!(storage.is_empty());
    let reopened = open_cart(storage).unwrap();
    assert!(reopened.state().is_empty());
    assert_eq!(reopened.state().applied_coupon, None);
}

#[test]
fn test_unknown_stored_coupon_is_dropped() {
    let storage = MemoryStore::new();
    storage.set("appliedCoupon", "RETIRED").unwrap();
    let cart = open_cart(storage).unwrap();
    assert_eq!(cart.state().applied_coupon, None);
}

#[test]
fn test_malformed_items_document_yields_empty_cart() {
    let storage = MemoryStore::new();
    storage.set("cart", "{not json").unwrap();
    let mut cart = open_cart(storage.clone()).unwrap();
    assert!(cart.state().is_empty());

    // The next write replaces the bad document.
    cart.add_item(product(2, "Brass bell", 199), 1).unwrap();
    assert_eq!(open_cart(storage).unwrap().total_item_count(), 1);
}
