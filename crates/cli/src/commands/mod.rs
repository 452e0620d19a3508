//! Cart commands.
//!
//! Each invocation opens the persisted cart, applies one command, prints the
//! resulting notifications and cart, and exits.

mod render;

use std::io::{self, Write};
use std::sync::Arc;

use craftcart_cart::view::{CartView, CouponOutcome, Notification};
use craftcart_cart::{CartConfig, CartEvent, CartStore, FileStore, PricingEngine, Product};
use craftcart_core::{CurrencyCode, ProductId};
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// An opened cart plus output settings.
pub struct Session {
    store: CartStore,
    events: broadcast::Receiver<CartEvent>,
    currency: CurrencyCode,
    json: bool,
}

impl Session {
    /// Open the cart persisted under the configured data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid or storage is unreadable.
    pub fn open(json: bool) -> Result<Self, Box<dyn std::error::Error>> {
        let config = CartConfig::from_env()?;
        let catalog = config.load_catalog()?;
        let storage = FileStore::open(&config.data_dir)?;
        info!(data_dir = %config.data_dir.display(), coupons = catalog.len(), "Opening cart");

        let pricing = PricingEngine::new(config.rules, Arc::new(catalog));
        let store = CartStore::open(config.keys, pricing, storage)?;
        let events = store.subscribe();

        Ok(Self {
            store,
            events,
            currency: config.currency,
            json,
        })
    }

    pub fn show(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.print(&[])
    }

    pub fn add(&mut self, product: Product, quantity: u32) -> Result<(), Box<dyn std::error::Error>> {
        if !self.store.add_item(product, quantity)? {
            debug!("Nothing added");
        }
        self.print_changes()
    }

    pub fn remove(&mut self, id: ProductId) -> Result<(), Box<dyn std::error::Error>> {
        if !self.store.remove_item(id)? {
            debug!(%id, "Product not in cart");
        }
        self.print_changes()
    }

    pub fn set_quantity(
        &mut self,
        id: ProductId,
        quantity: i64,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if !self.store.set_quantity(id, quantity)? {
            debug!(%id, "Product not in cart");
        }
        self.print_changes()
    }

    /// Apply a coupon. Rejections are reported to the shopper, storage
    /// failures are returned.
    pub fn apply_coupon(&mut self, code: &str) -> Result<(), Box<dyn std::error::Error>> {
        let result = self.store.apply_coupon(code);
        let outcome =
            CouponOutcome::from_result(code, &result, self.store.catalog(), self.currency);
        if let Err(err) = result
            && !err.is_coupon_rejection()
        {
            return Err(err.into());
        }
        self.drain_events();
        self.print(&[Notification::for_coupon(&outcome)])
    }

    pub fn remove_coupon(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.store.remove_coupon()?;
        self.print_changes()
    }

    pub fn clear(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.store.clear()?;
        self.print_changes()
    }

    pub fn coupons(&self) -> Result<(), Box<dyn std::error::Error>> {
        let mut out = io::stdout().lock();
        if self.json {
            let coupons: Vec<_> = self.store.catalog().iter().collect();
            writeln!(out, "{}", serde_json::to_string_pretty(&coupons)?)?;
        } else {
            render::coupons(&mut out, self.store.catalog().iter(), self.currency)?;
        }
        Ok(())
    }

    fn drain_events(&mut self) -> Vec<CartEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }

    fn print_changes(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let notifications: Vec<_> = self
            .drain_events()
            .iter()
            .filter_map(|event| Notification::for_change(&event.change))
            .collect();
        self.print(&notifications)
    }

    fn print(&self, notifications: &[Notification]) -> Result<(), Box<dyn std::error::Error>> {
        let view = CartView::build(
            self.store.state(),
            self.store.pricing_engine(),
            self.currency,
        );
        let mut out = io::stdout().lock();
        if self.json {
            let document = json!({ "notifications": notifications, "cart": view });
            writeln!(out, "{}", serde_json::to_string_pretty(&document)?)?;
        } else {
            for notification in notifications {
                render::notification(&mut out, notification)?;
            }
            render::cart(&mut out, &view)?;
        }
        Ok(())
    }
}
