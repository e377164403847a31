//! Trade Cache - keyed source collection for the view pipeline
//!
//! Holds the current set of trades and publishes every mutation as one
//! atomic `TradeChanges` batch. New connections receive the current
//! contents as a batch of adds before any live change.

use crate::transport::channel::{ChannelPublisher, ChannelSubscriber};
use blotter_core::{Trade, TradeChanges, TradeId};
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Keyed, observable collection of trades
pub struct TradeCache {
    items: Mutex<BTreeMap<TradeId, Trade>>,
    publisher: ChannelPublisher<TradeChanges>,
}

/// Mutation scope handed to [`TradeCache::edit`]
///
/// Changes recorded here are published together when the scope ends.
pub struct CacheUpdater<'a> {
    items: &'a mut BTreeMap<TradeId, Trade>,
    changes: TradeChanges,
}

impl CacheUpdater<'_> {
    /// Insert a new trade or replace the existing one with the same id
    pub fn add_or_update(&mut self, trade: Trade) {
        let id = trade.id;
        match self.items.insert(id, trade.clone()) {
            Some(previous) => self.changes.update(id, trade, previous),
            None => self.changes.add(id, trade),
        }
    }

    pub fn remove(&mut self, id: TradeId) -> Option<Trade> {
        let removed = self.items.remove(&id)?;
        self.changes.remove(id, removed.clone());
        Some(removed)
    }

    /// Ask downstream operators to re-evaluate a trade. Returns false if unknown.
    pub fn refresh(&mut self, id: TradeId) -> bool {
        match self.items.get(&id) {
            Some(trade) => {
                self.changes.refresh(id, trade.clone());
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: TradeId) -> Option<&Trade> {
        self.items.get(&id)
    }

    pub fn trades(&self) -> impl Iterator<Item = &Trade> {
        self.items.values()
    }

    pub fn clear(&mut self) {
        let items = std::mem::take(&mut *self.items);
        for (id, trade) in items {
            self.changes.remove(id, trade);
        }
    }
}

impl Default for TradeCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TradeCache {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(BTreeMap::new()),
            publisher: ChannelPublisher::new(),
        }
    }

    /// Subscribe to the cache: a snapshot batch first (if non-empty), then live batches
    pub fn connect(&self) -> ChannelSubscriber<TradeChanges> {
        let items = self.items.lock();
        let mut snapshot = TradeChanges::with_capacity(items.len());
        for (id, trade) in items.iter() {
            snapshot.add(*id, trade.clone());
        }
        let initial = (!snapshot.is_empty()).then_some(snapshot);
        // Lock is held so no edit can publish between snapshot and registration
        self.publisher.subscribe_with(initial)
    }

    /// Apply several mutations as one atomic batch
    pub fn edit<R>(&self, f: impl FnOnce(&mut CacheUpdater<'_>) -> R) -> R {
        let mut items = self.items.lock();
        let mut updater = CacheUpdater {
            items: &mut *items,
            changes: TradeChanges::new(),
        };
        let result = f(&mut updater);
        let changes = updater.changes;
        if !changes.is_empty() {
            log::trace!(
                "Trade cache batch: {} adds, {} updates, {} removes, {} refreshes",
                changes.adds(),
                changes.updates(),
                changes.removes(),
                changes.refreshes()
            );
            // Published under the lock to keep batch order identical for all subscribers
            self.publisher.send(&changes);
        }
        result
    }

    pub fn add_or_update(&self, trades: impl IntoIterator<Item = Trade>) {
        self.edit(|updater| {
            for trade in trades {
                updater.add_or_update(trade);
            }
        });
    }

    pub fn remove(&self, ids: impl IntoIterator<Item = TradeId>) {
        self.edit(|updater| {
            for id in ids {
                updater.remove(id);
            }
        });
    }

    pub fn refresh(&self, ids: impl IntoIterator<Item = TradeId>) {
        self.edit(|updater| {
            for id in ids {
                updater.refresh(id);
            }
        });
    }

    pub fn get(&self, id: TradeId) -> Option<Trade> {
        self.items.lock().get(&id).cloned()
    }

    pub fn trades(&self) -> Vec<Trade> {
        self.items.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn subscriber_count(&self) -> usize {
        self.publisher.subscriber_count()
    }
}
