//! View pipeline
//!
//! ```text
//! source batches ──► Filter ──► Transform ──► Sort ──► Page ──► ViewBatch ──► SinkBinder
//!                      ▲                        ▲        ▲
//!              filter controller        sort controller  page controller
//! ```
//!
//! One task owns all stage state. It takes source batches and controller
//! changes one at a time, so every batch reflects a single consistent set
//! of controller values, and waits for the binder to apply each batch
//! before taking the next input.

pub mod filter;
pub mod page;
pub mod sort;
pub mod transform;

use crate::binder::SinkBinder;
use crate::context::WorkerContext;
use crate::controller::{FilterPredicate, SortComparer};
use blotter_core::{ListChange, PageRequest, PageResponse, Trade, TradeChanges, TradeId};
use blotter_feed::Subscriber;
use blotter_ports::{FaultObserver, ProjectionFactory};
use filter::FilterStage;
use page::PageStage;
use serde::{Deserialize, Serialize};
use sort::SortStage;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;
use transform::{ProjectionRegistry, TransformOptions, TransformStage};

/// How in-place source updates interact with filtering and sorting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdatePolicy {
    /// Every update re-evaluates filter membership and sort position
    #[default]
    Reevaluate,
    /// Updates change values only; membership and position follow on refresh
    RefreshOnly,
}

/// A trade value paired with its live projection
pub struct Projected<P> {
    pub trade: Trade,
    pub projection: Arc<P>,
}

impl<P> Projected<P> {
    pub fn new(trade: Trade, projection: Arc<P>) -> Self {
        Self { trade, projection }
    }
}

impl<P> Clone for Projected<P> {
    fn clone(&self) -> Self {
        Self {
            trade: self.trade.clone(),
            projection: self.projection.clone(),
        }
    }
}

/// One emission of the pipeline
pub struct ViewBatch<P> {
    /// Edits turning the previous window into the new one
    pub changes: Vec<ListChange<Arc<P>>>,
    /// The full new window, for verification and resync
    pub window: Vec<Arc<P>>,
    pub response: PageResponse,
    /// Projections that left the filtered set; released when the batch is applied
    pub released: Vec<Arc<P>>,
}

/// Stage state owned by the pipeline task
pub struct PipelineState<F: ProjectionFactory> {
    predicate: FilterPredicate,
    filter: FilterStage,
    transform: TransformStage<F>,
    sort: SortStage<F::Output>,
    page: PageStage<F::Output>,
}

impl<F: ProjectionFactory> PipelineState<F> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        factory: Arc<F>,
        registry: Arc<ProjectionRegistry<F::Output>>,
        predicate: FilterPredicate,
        comparer: SortComparer,
        request: PageRequest,
        policy: UpdatePolicy,
        transform: TransformOptions,
        worker: WorkerContext,
        faults: Arc<dyn FaultObserver>,
    ) -> Self {
        Self {
            predicate,
            filter: FilterStage::new(policy),
            transform: TransformStage::new(factory, registry, transform, worker, faults),
            sort: SortStage::new(comparer, policy),
            page: PageStage::new(request),
        }
    }

    /// Trades passing the filter (including any whose projection failed)
    pub fn filtered_len(&self) -> usize {
        self.filter.len()
    }

    /// Projected trades in sorted order
    pub fn sorted(&self) -> impl Iterator<Item = &Projected<F::Output>> {
        self.sort.iter()
    }

    /// Batch describing the current window, emitted once at start-up
    pub fn initial(&mut self) -> Option<ViewBatch<F::Output>> {
        self.emit(Vec::new(), HashSet::new())
    }

    pub async fn apply_source(&mut self, changes: TradeChanges) -> Option<ViewBatch<F::Output>> {
        let filtered = self.filter.apply_source(changes, &self.predicate);
        self.project(filtered).await
    }

    pub async fn apply_predicate(&mut self, predicate: FilterPredicate) -> Option<ViewBatch<F::Output>> {
        log::debug!("Applying filter: {}", predicate.description());
        let filtered = self.filter.apply_predicate(&predicate);
        self.predicate = predicate;
        self.project(filtered).await
    }

    pub fn apply_comparer(&mut self, comparer: SortComparer) -> Option<ViewBatch<F::Output>> {
        log::debug!("Applying sort: {}", comparer.name());
        self.sort.set_comparer(comparer);
        self.emit(Vec::new(), HashSet::new())
    }

    pub fn apply_page(&mut self, request: PageRequest) -> Option<ViewBatch<F::Output>> {
        log::debug!("Applying page {} (size {})", request.page(), request.size());
        self.page.set_request(request);
        self.emit(Vec::new(), HashSet::new())
    }

    async fn project(&mut self, filtered: TradeChanges) -> Option<ViewBatch<F::Output>> {
        if filtered.is_empty() {
            return None;
        }
        let output = self.transform.apply(filtered).await;
        let touched = self.sort.apply(output.changes);
        self.emit(output.released, touched)
    }

    fn emit(
        &mut self,
        released: Vec<Arc<F::Output>>,
        touched: HashSet<TradeId>,
    ) -> Option<ViewBatch<F::Output>> {
        let delta = self.page.recompute(&self.sort, &touched);
        if delta.changes.is_empty() && !delta.response_changed && released.is_empty() {
            return None;
        }
        Some(ViewBatch {
            changes: delta.changes,
            window: self.page.window(),
            response: delta.response,
            released,
        })
    }
}

/// Everything the pipeline task listens to
pub struct PipelineInputs {
    pub source: Box<dyn Subscriber<TradeChanges>>,
    pub filter: watch::Receiver<FilterPredicate>,
    pub sort: watch::Receiver<SortComparer>,
    pub page: watch::Receiver<PageRequest>,
}

/// Pipeline task body. Returns when the source or the binder goes away.
pub async fn run<F: ProjectionFactory>(
    mut state: PipelineState<F>,
    mut inputs: PipelineInputs,
    binder: SinkBinder<F::Output>,
) {
    log::info!("View pipeline started");

    if let Some(batch) = state.initial() {
        if let Err(e) = binder.deliver(batch).await {
            log::warn!("View pipeline stopped before first batch: {}", e);
            return;
        }
    }

    loop {
        // Controller changes first so a batch never lags a newer control value
        let batch = tokio::select! {
            biased;
            changed = inputs.filter.changed() => {
                if changed.is_err() {
                    break;
                }
                let predicate = inputs.filter.borrow_and_update().clone();
                state.apply_predicate(predicate).await
            }
            changed = inputs.sort.changed() => {
                if changed.is_err() {
                    break;
                }
                let comparer = inputs.sort.borrow_and_update().clone();
                state.apply_comparer(comparer)
            }
            changed = inputs.page.changed() => {
                if changed.is_err() {
                    break;
                }
                let request = *inputs.page.borrow_and_update();
                state.apply_page(request)
            }
            next = inputs.source.next() => match next {
                Ok(changes) => state.apply_source(changes).await,
                Err(e) => {
                    log::info!("Trade source ended: {}", e);
                    break;
                }
            },
        };

        if let Some(batch) = batch {
            if let Err(e) = binder.deliver(batch).await {
                log::warn!("View pipeline stopping: {}", e);
                break;
            }
        }
    }

    log::info!("View pipeline stopped");
}
