//! Cross-instance synchronization.
//!
//! All instances ("tabs") of the same origin share one durable store. Every
//! write through a tab's [`TabStorage`] publishes a [`StorageEvent`] on the
//! origin's [`StorageBus`] after the write lands. Each tab's [`SyncChannel`]
//! listens for events from *other* tabs on the cart items key and reloads its
//! `CartStore` from storage.
//!
//! The model is eventually consistent, last writer wins: concurrent additions
//! from two tabs are not merged, every tab converges on whatever was persisted
//! last. The applied coupon is not synchronized; it is only read at startup.

use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Result, StorageError};
use crate::storage::{DurableStore, MemoryStore};
use crate::store::CartStore;

/// Buffered storage events per tab before it starts lagging.
const BUS_CAPACITY: usize = 256;

/// Identity of one cart instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabId(Uuid);

impl TabId {
    /// Generate a fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A key was written or removed by some tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub origin: TabId,
}

/// Publish side of the storage change channel.
pub trait StorageNotifier: Send + Sync {
    fn notify(&self, event: StorageEvent);
}

/// In-process storage change channel backed by a tokio broadcast.
#[derive(Debug, Clone)]
pub struct StorageBus {
    sender: broadcast::Sender<StorageEvent>,
}

impl StorageBus {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self { sender }
    }

    /// Receive every event published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.sender.subscribe()
    }
}

impl Default for StorageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageNotifier for StorageBus {
    fn notify(&self, event: StorageEvent) {
        // No listening tabs is fine.
        let _ = self.sender.send(event);
    }
}

/// A tab's handle on the shared store. Writes are announced on the bus.
#[derive(Clone)]
pub struct TabStorage {
    id: TabId,
    backing: Arc<dyn DurableStore>,
    notifier: Arc<dyn StorageNotifier>,
}

impl TabStorage {
    pub fn new(
        id: TabId,
        backing: Arc<dyn DurableStore>,
        notifier: Arc<dyn StorageNotifier>,
    ) -> Self {
        Self {
            id,
            backing,
            notifier,
        }
    }

    #[must_use]
    pub const fn id(&self) -> TabId {
        self.id
    }

    fn announce(&self, key: &str) {
        debug!(tab = %self.id, key, "Announcing storage change");
        self.notifier.notify(StorageEvent {
            key: key.to_string(),
            origin: self.id,
        });
    }
}

impl DurableStore for TabStorage {
    fn get(&self, key: &str) -> std::result::Result<Option<String>, StorageError> {
        self.backing.get(key)
    }

    fn set(&self, key: &str, value: &str) -> std::result::Result<(), StorageError> {
        self.backing.set(key, value)?;
        self.announce(key);
        Ok(())
    }

    fn remove(&self, key: &str) -> std::result::Result<(), StorageError> {
        self.backing.remove(key)?;
        self.announce(key);
        Ok(())
    }
}

/// A shared durable store plus its change bus.
#[derive(Clone)]
pub struct Origin {
    backing: Arc<dyn DurableStore>,
    bus: StorageBus,
}

impl Origin {
    pub fn new(backing: impl DurableStore + 'static) -> Self {
        Self {
            backing: Arc::new(backing),
            bus: StorageBus::new(),
        }
    }

    /// Origin backed by a fresh [`MemoryStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    #[must_use]
    pub const fn bus(&self) -> &StorageBus {
        &self.bus
    }

    /// Open a new tab: its storage handle and its sync channel.
    ///
    /// The channel is subscribed before the handle is returned, so it sees
    /// every write made after this call.
    #[must_use]
    pub fn open_tab(&self) -> (TabStorage, SyncChannel) {
        let id = TabId::new();
        let channel = SyncChannel::new(id, self.bus.subscribe());
        let storage = TabStorage::new(id, Arc::clone(&self.backing), Arc::new(self.bus.clone()));
        (storage, channel)
    }
}

/// Applies other tabs' storage changes to a local `CartStore`.
#[derive(Debug)]
pub struct SyncChannel {
    tab: TabId,
    receiver: broadcast::Receiver<StorageEvent>,
}

impl SyncChannel {
    #[must_use]
    pub const fn new(tab: TabId, receiver: broadcast::Receiver<StorageEvent>) -> Self {
        Self { tab, receiver }
    }

    #[must_use]
    pub const fn tab(&self) -> TabId {
        self.tab
    }

    /// Drain pending events without waiting. Reloads at most once, since a
    /// reload always reads the whole cart. Returns whether it reloaded.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the reload cannot read the store.
    pub fn poll(&mut self, store: &mut CartStore) -> Result<bool> {
        let mut stale = false;
        loop {
            match self.receiver.try_recv() {
                Ok(event) => stale |= self.is_relevant(&event, store),
                Err(TryRecvError::Lagged(missed)) => {
                    warn!(tab = %self.tab, missed, "Sync channel lagged, reloading");
                    stale = true;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }

        if stale {
            store.reload()?;
        }
        Ok(stale)
    }

    /// Wait for the next relevant change and reload.
    ///
    /// Returns `false` once the bus is gone and no more changes can arrive.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if the reload cannot read the store.
    pub async fn next(&mut self, store: &mut CartStore) -> Result<bool> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.is_relevant(&event, store) => break,
                Ok(_) => {}
                Err(RecvError::Lagged(missed)) => {
                    warn!(tab = %self.tab, missed, "Sync channel lagged, reloading");
                    break;
                }
                Err(RecvError::Closed) => return Ok(false),
            }
        }
        store.reload()?;
        Ok(true)
    }

    fn is_relevant(&self, event: &StorageEvent, store: &CartStore) -> bool {
        event.origin != self.tab && event.key == store.keys().items
    }
}
