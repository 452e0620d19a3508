//! Cart store.
//!
//! `CartStore` is the only owner of mutable cart state. Every mutation builds
//! the next state, writes it to the durable store, and only then commits it in
//! memory and emits a [`CartEvent`]. A rejected write leaves both the in-memory
//! state and the listeners untouched.

use chrono::Utc;
use craftcart_core::{Money, ProductId};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::cart::{CartState, LineItem, Product};
use crate::catalog::{CouponCatalog, normalize_code};
use crate::error::{CartError, Result, StorageError};
use crate::pricing::{PricingEngine, PricingSnapshot};
use crate::storage::{CartKeys, DurableStore};

/// Buffered change events per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 64;

/// What a mutation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartChange {
    /// A product was added or its quantity increased.
    ItemAdded {
        id: ProductId,
        name: String,
        quantity: u32,
    },
    /// A line item was removed.
    ItemRemoved { id: ProductId, name: String },
    /// A line item's quantity was set.
    QuantityChanged { id: ProductId, quantity: u32 },
    /// A coupon became the active one.
    CouponApplied { code: String, discount: Money },
    /// The active coupon was cleared.
    CouponRemoved,
    /// All items and the coupon were cleared.
    Cleared,
    /// Items were reloaded after another instance changed storage.
    Reloaded,
}

/// Emitted after every persisted mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartEvent {
    pub change: CartChange,
    pub snapshot: CartState,
}

/// Which stored documents a commit touches.
#[derive(Debug, Clone, Copy)]
enum Persist {
    Items,
    Coupon,
    Nothing,
}

/// The cart state container.
pub struct CartStore {
    keys: CartKeys,
    storage: Box<dyn DurableStore>,
    pricing: PricingEngine,
    state: CartState,
    events: broadcast::Sender<CartEvent>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("keys", &self.keys)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Rehydrate a cart from durable storage.
    ///
    /// Missing documents yield an empty cart. A stored coupon code is only
    /// restored if it is still in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the store cannot be read.
    #[instrument(skip_all, fields(items_key = %keys.items))]
    pub fn open(
        keys: CartKeys,
        pricing: PricingEngine,
        storage: impl DurableStore + 'static,
    ) -> Result<Self> {
        let items = load_items(&storage, &keys.items, &pricing)?;
        let applied_coupon = storage
            .get(&keys.coupon)?
            .map(|code| normalize_code(&code))
            .filter(|code| pricing.catalog().lookup(code).is_some());

        debug!(
            items = items.len(),
            coupon = applied_coupon.as_deref().unwrap_or("-"),
            "Cart rehydrated"
        );

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            keys,
            storage: Box::new(storage),
            pricing,
            state: CartState {
                items,
                applied_coupon,
            },
            events,
        })
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` of a product, accumulating onto an existing line.
    ///
    /// Returns `false` without touching storage if `quantity` is zero.
    ///
    /// # Errors
    ///
    /// - `CartError::AmountOverflow` if the new total would not fit
    /// - `CartError::Storage` if the cart cannot be persisted
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn add_item(&mut self, product: Product, quantity: u32) -> Result<bool> {
        if quantity < 1 {
            debug!("Ignoring add with zero quantity");
            return Ok(false);
        }

        let mut next = self.state.clone();
        let change = CartChange::ItemAdded {
            id: product.id,
            name: product.name.clone(),
            quantity,
        };
        match next.items.iter_mut().find(|item| item.id == product.id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(quantity),
            None => next.items.push(LineItem::new(product, quantity, Utc::now())),
        }

        self.ensure_priceable(&next)?;
        self.commit(next, Persist::Items, change)?;
        Ok(true)
    }

    /// Remove a line item. Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the cart cannot be persisted.
    #[instrument(skip(self))]
    pub fn remove_item(&mut self, id: ProductId) -> Result<bool> {
        let Some(position) = self.state.items.iter().position(|item| item.id == id) else {
            return Ok(false);
        };

        let mut next = self.state.clone();
        let removed = next.items.remove(position);
        self.commit(
            next,
            Persist::Items,
            CartChange::ItemRemoved {
                id,
                name: removed.name,
            },
        )?;
        Ok(true)
    }

    /// Set a line item's quantity; zero or below removes it.
    ///
    /// Returns `false` if the product is not in the cart.
    ///
    /// # Errors
    ///
    /// - `CartError::AmountOverflow` if the new total would not fit
    /// - `CartError::Storage` if the cart cannot be persisted
    #[instrument(skip(self))]
    pub fn set_quantity(&mut self, id: ProductId, quantity: i64) -> Result<bool> {
        if self.state.item(id).is_none() {
            return Ok(false);
        }
        if quantity <= 0 {
            return self.remove_item(id);
        }

        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        let mut next = self.state.clone();
        if let Some(item) = next.items.iter_mut().find(|item| item.id == id) {
            item.quantity = quantity;
        }
        self.ensure_priceable(&next)?;
        self.commit(next, Persist::Items, CartChange::QuantityChanged { id, quantity })?;
        Ok(true)
    }

    /// Apply a coupon, replacing any previously applied one.
    ///
    /// Returns the discount the coupon is worth on the current cart.
    ///
    /// # Errors
    ///
    /// - `CartError::InvalidCoupon` if the code is not in the catalog
    /// - `CartError::MinimumOrderNotMet` if the subtotal is too low
    /// - `CartError::CouponAlreadyApplied` if it is already the active coupon
    /// - `CartError::Storage` if the code cannot be persisted
    #[instrument(skip(self))]
    pub fn apply_coupon(&mut self, code: &str) -> Result<Money> {
        let code = normalize_code(code);
        let coupon = self
            .pricing
            .catalog()
            .lookup(&code)
            .ok_or_else(|| CartError::InvalidCoupon(code.clone()))?;

        if !coupon.is_eligible(self.state.subtotal()) {
            return Err(CartError::MinimumOrderNotMet {
                code,
                min_order: coupon.min_order,
            });
        }
        if self.state.applied_coupon.as_deref() == Some(code.as_str()) {
            return Err(CartError::CouponAlreadyApplied(code));
        }

        let mut next = self.state.clone();
        next.applied_coupon = Some(code.clone());
        let discount = self.pricing.discount_for(&next);

        self.commit(
            next,
            Persist::Coupon,
            CartChange::CouponApplied {
                code: code.clone(),
                discount,
            },
        )?;
        info!(%code, %discount, "Coupon applied");
        Ok(discount)
    }

    /// Clear the applied coupon. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the coupon key cannot be removed.
    #[instrument(skip(self))]
    pub fn remove_coupon(&mut self) -> Result<()> {
        let mut next = self.state.clone();
        next.applied_coupon = None;
        self.commit(next, Persist::Coupon, CartChange::CouponRemoved)
    }

    /// Empty the cart and clear the coupon.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if either document cannot be removed.
    /// The coupon key is restored if removing the items fails.
    #[instrument(skip(self))]
    pub fn clear(&mut self) -> Result<()> {
        self.storage.remove(&self.keys.coupon)?;
        if let Err(e) = self.storage.remove(&self.keys.items) {
            if let Some(code) = &self.state.applied_coupon {
                if let Err(rollback) = self.storage.set(&self.keys.coupon, code) {
                    warn!(error = %rollback, "Failed to restore coupon after aborted clear");
                }
            }
            return Err(e.into());
        }
        self.commit(CartState::default(), Persist::Nothing, CartChange::Cleared)
    }

    /// Re-read items from storage after another instance changed them.
    ///
    /// The applied coupon is kept as-is; it is only read at startup.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the store cannot be read.
    #[instrument(skip(self))]
    pub fn reload(&mut self) -> Result<()> {
        let items = load_items(self.storage.as_ref(), &self.keys.items, &self.pricing)?;
        let next = CartState {
            items,
            applied_coupon: self.state.applied_coupon.clone(),
        };
        self.commit(next, Persist::Nothing, CartChange::Reloaded)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Immutable copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> CartState {
        self.state.clone()
    }

    /// Borrow the current state.
    #[must_use]
    pub const fn state(&self) -> &CartState {
        &self.state
    }

    /// Sum of all quantities.
    #[must_use]
    pub fn total_item_count(&self) -> u64 {
        self.state.total_item_count()
    }

    /// Sum of `price × quantity`.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.state.subtotal()
    }

    /// Price breakdown of the current state.
    #[must_use]
    pub fn pricing(&self) -> PricingSnapshot {
        self.pricing.quote(&self.state)
    }

    #[must_use]
    pub const fn pricing_engine(&self) -> &PricingEngine {
        &self.pricing
    }

    #[must_use]
    pub fn catalog(&self) -> &CouponCatalog {
        self.pricing.catalog()
    }

    #[must_use]
    pub const fn keys(&self) -> &CartKeys {
        &self.keys
    }

    /// Subscribe to change events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn ensure_priceable(&self, next: &CartState) -> Result<()> {
        if self.pricing.fits(&next.items) {
            Ok(())
        } else {
            warn!("Rejecting mutation, cart total would overflow");
            Err(CartError::AmountOverflow)
        }
    }

    fn commit(&mut self, next: CartState, persist: Persist, change: CartChange) -> Result<()> {
        match persist {
            Persist::Items => {
                let json = serde_json::to_string(&next.items).map_err(StorageError::from)?;
                self.storage.set(&self.keys.items, &json)?;
            }
            Persist::Coupon => match &next.applied_coupon {
                Some(code) => self.storage.set(&self.keys.coupon, code)?,
                None => self.storage.remove(&self.keys.coupon)?,
            },
            Persist::Nothing => {}
        }
        debug!(?persist, items = next.items.len(), "Cart persisted");

        self.state = next;
        // Having no subscribers is not an error.
        let _ = self.events.send(CartEvent {
            change,
            snapshot: self.state.clone(),
        });
        Ok(())
    }
}

/// Read the stored items, treating a malformed or unpriceable document as
/// an empty cart.
fn load_items(
    storage: &dyn DurableStore,
    key: &str,
    pricing: &PricingEngine,
) -> Result<Vec<LineItem>> {
    let Some(json) = storage.get(key)? else {
        return Ok(Vec::new());
    };
    match serde_json::from_str::<Vec<LineItem>>(&json) {
        Ok(items) => {
            let items = normalize_items(items);
            if pricing.fits(&items) {
                Ok(items)
            } else {
                warn!(key, "Discarding stored cart whose total overflows");
                Ok(Vec::new())
            }
        }
        Err(e) => {
            warn!(key, error = %e, "Discarding malformed stored cart");
            Ok(Vec::new())
        }
    }
}

/// Drop zero-quantity lines and merge duplicate ids, keeping first-seen order.
fn normalize_items(items: Vec<LineItem>) -> Vec<LineItem> {
    let mut merged: Vec<LineItem> = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity == 0 {
            warn!(product_id = %item.id, "Dropping stored line with zero quantity");
            continue;
        }
        match merged.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
            None => merged.push(item),
        }
    }
    merged
}
