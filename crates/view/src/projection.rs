//! Trade projections
//!
//! [`TradeProxy`] is the display-side projection of a trade. Each proxy
//! holds a [`Lease`] for as long as it is live; the [`LeaseTracker`] counts
//! leases per trade so leaks and duplicates are observable.

use blotter_core::{Trade, TradeId};
use blotter_ports::{Projection, ProjectionFactory, ProjectionResult};
use chrono::{Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
struct LeaseCounters {
    live: DashMap<TradeId, usize>,
    acquired: AtomicU64,
    released: AtomicU64,
}

/// Counts leases handed out to projections
#[derive(Debug, Clone, Default)]
pub struct LeaseTracker {
    counters: Arc<LeaseCounters>,
}

impl LeaseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, trade_id: TradeId) -> Lease {
        *self.counters.live.entry(trade_id).or_insert(0) += 1;
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        Lease {
            trade_id,
            tracker: self.clone(),
        }
    }

    /// Leases currently held
    pub fn live(&self) -> usize {
        self.counters.live.iter().map(|entry| *entry.value()).sum()
    }

    pub fn live_for(&self, trade_id: TradeId) -> usize {
        self.counters.live.get(&trade_id).map_or(0, |c| *c)
    }

    /// Trades that currently hold more than one lease
    pub fn duplicated(&self) -> Vec<TradeId> {
        self.counters
            .live
            .iter()
            .filter(|entry| *entry.value() > 1)
            .map(|entry| *entry.key())
            .collect()
    }

    pub fn acquired(&self) -> u64 {
        self.counters.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> u64 {
        self.counters.released.load(Ordering::SeqCst)
    }

    fn give_back(&self, trade_id: TradeId) {
        self.counters
            .live
            .remove_if_mut(&trade_id, |_, count| {
                *count -= 1;
                *count == 0
            });
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Per-projection resource; returned to its tracker on drop
#[derive(Debug)]
pub struct Lease {
    trade_id: TradeId,
    tracker: LeaseTracker,
}

impl Lease {
    pub fn trade_id(&self) -> TradeId {
        self.trade_id
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.tracker.give_back(self.trade_id);
    }
}

/// Display projection of a live trade
#[derive(Debug)]
pub struct TradeProxy {
    id: TradeId,
    trade: RwLock<Trade>,
    lease: Mutex<Option<Lease>>,
    recent_window: Duration,
}

impl TradeProxy {
    pub fn new(trade: Trade, lease: Lease, recent_window: Duration) -> Self {
        Self {
            id: trade.id,
            trade: RwLock::new(trade),
            lease: Mutex::new(Some(lease)),
            recent_window,
        }
    }

    pub fn customer(&self) -> String {
        self.trade.read().customer.clone()
    }

    pub fn currency_pair(&self) -> String {
        self.trade.read().currency_pair.clone()
    }

    pub fn percent_from_market(&self) -> Decimal {
        self.trade.read().percent_from_market()
    }

    /// Booked within the recent window
    pub fn is_recent(&self) -> bool {
        let Ok(window) = ChronoDuration::from_std(self.recent_window) else {
            return false;
        };
        Utc::now() - self.trade.read().timestamp <= window
    }
}

impl Projection for TradeProxy {
    fn id(&self) -> TradeId {
        self.id
    }

    fn trade(&self) -> Trade {
        self.trade.read().clone()
    }

    fn update(&self, trade: &Trade) {
        *self.trade.write() = trade.clone();
    }

    fn release(&self) {
        if self.lease.lock().take().is_some() {
            log::trace!("Released projection for trade {}", self.id);
        }
    }

    fn is_released(&self) -> bool {
        self.lease.lock().is_none()
    }
}

/// Builds [`TradeProxy`] projections backed by a shared [`LeaseTracker`]
#[derive(Debug, Clone)]
pub struct TradeProxyFactory {
    tracker: LeaseTracker,
    recent_window: Duration,
}

impl Default for TradeProxyFactory {
    fn default() -> Self {
        Self::new(LeaseTracker::new())
    }
}

impl TradeProxyFactory {
    pub const DEFAULT_RECENT_WINDOW: Duration = Duration::from_secs(60);

    pub fn new(tracker: LeaseTracker) -> Self {
        Self {
            tracker,
            recent_window: Self::DEFAULT_RECENT_WINDOW,
        }
    }

    pub fn with_recent_window(mut self, window: Duration) -> Self {
        self.recent_window = window;
        self
    }

    pub fn tracker(&self) -> &LeaseTracker {
        &self.tracker
    }
}

impl ProjectionFactory for TradeProxyFactory {
    type Output = TradeProxy;

    fn create(&self, trade: &Trade) -> ProjectionResult<TradeProxy> {
        let lease = self.tracker.acquire(trade.id);
        Ok(TradeProxy::new(trade.clone(), lease, self.recent_window))
    }
}
