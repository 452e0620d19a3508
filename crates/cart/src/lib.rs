//! Craftcart cart engine.
//!
//! The client-side cart of the storefront: it tracks selected items, prices
//! them with shipping and coupon rules, persists state to a durable key-value
//! store, and keeps several open instances ("tabs") sharing that store
//! eventually consistent.
//!
//! # Architecture
//!
//! - [`catalog`] - Immutable coupon catalog with case-insensitive lookup
//! - [`store`] - `CartStore`, the only owner of mutable cart state
//! - [`pricing`] - Pure subtotal/shipping/discount/total computation
//! - [`sync`] - Origin-wide storage bus and the per-tab `SyncChannel`
//! - [`storage`] - Durable key-value backends (in-memory, file)
//! - [`view`] - Display-ready view models for a presentation layer
//!
//! Control flow: user action -> `CartStore` mutation -> persist -> change
//! event -> presentation re-renders (pricing is recomputed on demand) ->
//! other tabs reload through their `SyncChannel`.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod pricing;
pub mod storage;
pub mod store;
pub mod sync;
pub mod view;

pub use cart::{CartState, LineItem, Product};
pub use catalog::{Coupon, CouponCatalog, CouponKind};
pub use config::{CartConfig, ConfigError};
pub use error::{CartError, CatalogError, Result, StorageError};
pub use pricing::{PricingEngine, PricingRules, PricingSnapshot};
pub use storage::{CartKeys, DurableStore, FileStore, MemoryStore};
pub use store::{CartChange, CartEvent, CartStore};
pub use sync::{Origin, StorageBus, StorageEvent, StorageNotifier, SyncChannel, TabId, TabStorage};
