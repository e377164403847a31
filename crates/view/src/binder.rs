//! Sink binder
//!
//! Applies each pipeline batch to the bound container on the consumption
//! context. Within one job it applies the list changes, releases the
//! projections that left the view, publishes the page response and finally
//! bumps the container version so observers see a consistent state.

use crate::context::ConsumptionContext;
use crate::error::Result;
use crate::params::PageParameters;
use crate::pipeline::ViewBatch;
use blotter_core::ListChange;
use blotter_ports::Projection;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::watch;

/// Ordered container the display layer reads
pub struct BoundList<P> {
    items: Arc<RwLock<Vec<Arc<P>>>>,
    version: Arc<watch::Sender<u64>>,
}

impl<P> Clone for BoundList<P> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            version: self.version.clone(),
        }
    }
}

impl<P> Default for BoundList<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> BoundList<P> {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            items: Arc::new(RwLock::new(Vec::new())),
            version: Arc::new(version),
        }
    }

    pub fn snapshot(&self) -> Vec<Arc<P>> {
        self.items.read().clone()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Number of batches applied so far
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    /// Notified after every applied batch
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    /// Apply edits; falls back to the full window if they do not line up
    fn apply(&self, changes: Vec<ListChange<Arc<P>>>, window: &[Arc<P>]) {
        let mut items = self.items.write();
        let applied = changes.into_iter().all(|change| change.apply_to(&mut items));
        let in_sync = applied
            && items.len() == window.len()
            && items.iter().zip(window).all(|(a, b)| Arc::ptr_eq(a, b));
        if !in_sync {
            log::error!(
                "Bound list out of sync with view window; resynchronising {} items",
                window.len()
            );
            *items = window.to_vec();
        }
    }

    fn publish(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

/// Delivers batches to a [`BoundList`] on the consumption context
pub struct SinkBinder<P> {
    list: BoundList<P>,
    page: PageParameters,
    consumption: ConsumptionContext,
}

impl<P: Projection> SinkBinder<P> {
    pub fn new(list: BoundList<P>, page: PageParameters, consumption: ConsumptionContext) -> Self {
        Self {
            list,
            page,
            consumption,
        }
    }

    /// Apply a batch and wait until the consumption context has run it
    pub async fn deliver(&self, batch: ViewBatch<P>) -> Result<()> {
        let list = self.list.clone();
        let response = self.page.response.clone();
        self.consumption
            .invoke(move || {
                let ViewBatch {
                    changes,
                    window,
                    response: page_response,
                    released,
                } = batch;
                log::debug!(
                    "Applying view batch: {} changes, {} released, page {}/{} ({} items)",
                    changes.len(),
                    released.len(),
                    page_response.page,
                    page_response.pages,
                    page_response.total_size
                );
                list.apply(changes, &window);
                for projection in released {
                    projection.release();
                }
                response.set(page_response);
                list.publish();
            })
            .await
    }
}
