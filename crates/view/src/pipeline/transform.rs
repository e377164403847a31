//! Transform stage
//!
//! Turns filtered trades into projections. Exactly one live projection
//! exists per trade identity:
//!
//! - Add builds a projection (in parallel for large batches)
//! - Update refreshes the existing projection in place
//! - Remove takes the projection out of the registry; the binder releases
//!   it in the same consumption job that drops it from the container
//!
//! A trade whose projection cannot be built is reported and left out.

use super::Projected;
use crate::context::WorkerContext;
use blotter_core::{Change, Trade, TradeChanges, TradeId};
use blotter_ports::{Fault, FaultObserver, Projection, ProjectionError, ProjectionFactory, ProjectionResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Parallel construction settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    /// Batches with at least this many new projections are built in parallel
    pub parallel_threshold: usize,
    pub max_workers: usize,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            parallel_threshold: 5,
            max_workers: 4,
        }
    }
}

/// Live projections by trade identity.
///
/// Once closed, nothing can be inserted: late inserts are handed back so the
/// caller can release them.
pub struct ProjectionRegistry<P> {
    live: Mutex<Option<HashMap<TradeId, Arc<P>>>>,
}

impl<P: Projection> Default for ProjectionRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Projection> ProjectionRegistry<P> {
    pub fn new() -> Self {
        Self {
            live: Mutex::new(Some(HashMap::new())),
        }
    }

    pub fn insert(&self, id: TradeId, projection: Arc<P>) -> Result<(), Arc<P>> {
        match self.live.lock().as_mut() {
            Some(live) => {
                live.insert(id, projection);
                Ok(())
            }
            None => Err(projection),
        }
    }

    pub fn get(&self, id: TradeId) -> Option<Arc<P>> {
        self.live.lock().as_ref()?.get(&id).cloned()
    }

    pub fn remove(&self, id: TradeId) -> Option<Arc<P>> {
        self.live.lock().as_mut()?.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.live.lock().as_ref().map_or(0, HashMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.live.lock().is_none()
    }

    /// Close the registry and release everything still live
    pub fn close(&self) -> usize {
        let Some(live) = self.live.lock().take() else {
            return 0;
        };
        let count = live.len();
        for projection in live.into_values() {
            projection.release();
        }
        count
    }
}

/// Projected changes for the sort stage plus projections awaiting release
pub struct TransformOutput<P> {
    pub changes: Vec<Change<TradeId, Projected<P>>>,
    pub released: Vec<Arc<P>>,
}

enum Step<P> {
    Ready(Change<TradeId, Projected<P>>),
    Create { key: TradeId, slot: usize },
}

/// Projections taken out of the registry but not yet handed downstream.
/// Released on drop, so an aborted batch does not strand them.
struct PendingRelease<P: Projection> {
    items: Vec<Arc<P>>,
}

impl<P: Projection> PendingRelease<P> {
    fn new() -> Self {
        Self { items: Vec::new() }
    }

    fn find(&self, key: TradeId) -> Option<&Arc<P>> {
        self.items.iter().find(|p| p.id() == key)
    }

    fn push(&mut self, projection: Arc<P>) {
        self.items.push(projection);
    }

    fn hand_over(mut self) -> Vec<Arc<P>> {
        std::mem::take(&mut self.items)
    }
}

impl<P: Projection> Drop for PendingRelease<P> {
    fn drop(&mut self) {
        if !self.items.is_empty() {
            log::debug!("Releasing {} undelivered projections", self.items.len());
        }
        for projection in self.items.drain(..) {
            projection.release();
        }
    }
}

pub struct TransformStage<F: ProjectionFactory> {
    factory: Arc<F>,
    registry: Arc<ProjectionRegistry<F::Output>>,
    options: TransformOptions,
    worker: WorkerContext,
    faults: Arc<dyn FaultObserver>,
}

impl<F: ProjectionFactory> TransformStage<F> {
    pub fn new(
        factory: Arc<F>,
        registry: Arc<ProjectionRegistry<F::Output>>,
        options: TransformOptions,
        worker: WorkerContext,
        faults: Arc<dyn FaultObserver>,
    ) -> Self {
        Self {
            factory,
            registry,
            options,
            worker,
            faults,
        }
    }

    pub fn registry(&self) -> &Arc<ProjectionRegistry<F::Output>> {
        &self.registry
    }

    /// Project one filtered batch.
    ///
    /// A key may appear several times in a batch. While its construction is
    /// pending, later changes to it only replace the value to build, and a
    /// remove cancels the construction, so each identity is built at most once.
    pub async fn apply(&self, changes: TradeChanges) -> TransformOutput<F::Output> {
        let mut steps: Vec<Option<Step<F::Output>>> = Vec::with_capacity(changes.len());
        let mut to_create: Vec<Option<Trade>> = Vec::new();
        // Key -> index into `steps` of its pending create
        let mut pending: HashMap<TradeId, usize> = HashMap::new();
        let mut released: PendingRelease<F::Output> = PendingRelease::new();

        for change in changes {
            let key = *change.key();
            if let Some(&at) = pending.get(&key) {
                let Some(Step::Create { slot, .. }) = &steps[at] else {
                    continue;
                };
                let slot = *slot;
                match change {
                    Change::Remove { .. } => {
                        steps[at] = None;
                        to_create[slot] = None;
                        pending.remove(&key);
                    }
                    Change::Add { current, .. }
                    | Change::Update { current, .. }
                    | Change::Refresh { current, .. } => {
                        to_create[slot] = Some(current);
                    }
                }
                continue;
            }

            match change {
                Change::Add { key, current } | Change::Refresh { key, current }
                    if self.registry.get(key).is_none() =>
                {
                    // Re-entry within one batch: the old projection goes first
                    if let Some(old) = released.find(key) {
                        old.release();
                    }
                    pending.insert(key, steps.len());
                    steps.push(Some(Step::Create {
                        key,
                        slot: to_create.len(),
                    }));
                    to_create.push(Some(current));
                }
                Change::Add { key, current } => {
                    // Duplicate add for a live identity is an update
                    if let Some(projection) = self.registry.get(key) {
                        projection.update(&current);
                        let previous = current.clone();
                        steps.push(Some(Step::Ready(Change::Update {
                            key,
                            current: Projected::new(current, projection.clone()),
                            previous: Projected::new(previous, projection),
                        })));
                    }
                }
                Change::Update {
                    key,
                    current,
                    previous,
                } => match self.registry.get(key) {
                    Some(projection) => {
                        projection.update(&current);
                        steps.push(Some(Step::Ready(Change::Update {
                            key,
                            current: Projected::new(current, projection.clone()),
                            previous: Projected::new(previous, projection),
                        })));
                    }
                    None => {
                        // An earlier construction failed; try again
                        pending.insert(key, steps.len());
                        steps.push(Some(Step::Create {
                            key,
                            slot: to_create.len(),
                        }));
                        to_create.push(Some(current));
                    }
                },
                Change::Remove { key, current } => {
                    if let Some(projection) = self.registry.remove(key) {
                        released.push(projection.clone());
                        steps.push(Some(Step::Ready(Change::Remove {
                            key,
                            current: Projected::new(current, projection),
                        })));
                    }
                }
                Change::Refresh { key, current } => {
                    if let Some(projection) = self.registry.get(key) {
                        projection.update(&current);
                        steps.push(Some(Step::Ready(Change::Refresh {
                            key,
                            current: Projected::new(current, projection),
                        })));
                    }
                }
            }
        }

        // Cancelled slots are skipped; `trades` holds only what gets built
        let mut trades = Vec::with_capacity(to_create.len());
        let mut position = vec![None; to_create.len()];
        for (slot, trade) in to_create.into_iter().enumerate() {
            if let Some(trade) = trade {
                position[slot] = Some(trades.len());
                trades.push(trade);
            }
        }
        let results = self.construct(trades.clone()).await;
        let mut built: Vec<Option<(Trade, ProjectionResult<F::Output>)>> =
            trades.into_iter().zip(results).map(Some).collect();

        let mut out = Vec::with_capacity(steps.len());
        for step in steps.into_iter().flatten() {
            match step {
                Step::Ready(change) => out.push(change),
                Step::Create { key, slot } => {
                    let Some((trade, result)) = position[slot]
                        .and_then(|at| built.get_mut(at))
                        .and_then(Option::take)
                    else {
                        continue;
                    };
                    match result {
                        Ok(projection) => {
                            let projection = Arc::new(projection);
                            match self.registry.insert(key, projection.clone()) {
                                Ok(()) => out.push(Change::Add {
                                    key,
                                    current: Projected::new(trade, projection),
                                }),
                                Err(late) => late.release(),
                            }
                        }
                        Err(error) => {
                            self.faults.on_fault(Fault::Projection {
                                trade_id: key,
                                error,
                            });
                        }
                    }
                }
            }
        }

        TransformOutput {
            changes: out,
            released: released.hand_over(),
        }
    }

    /// Build projections, results in input order
    async fn construct(&self, trades: Vec<Trade>) -> Vec<ProjectionResult<F::Output>> {
        let total = trades.len();
        let workers = self.options.max_workers.max(1);
        if total < self.options.parallel_threshold.max(1) || workers == 1 {
            return trades
                .iter()
                .map(|trade| create_guarded(&*self.factory, trade))
                .collect();
        }

        let chunk_size = total.div_ceil(workers);
        let mut pool = JoinSet::new();
        let indexed: Vec<(usize, Trade)> = trades.into_iter().enumerate().collect();
        for chunk in indexed.chunks(chunk_size) {
            let chunk = chunk.to_vec();
            let factory = self.factory.clone();
            pool.spawn_blocking_on(
                move || {
                    chunk
                        .into_iter()
                        .map(|(position, trade)| (position, create_guarded(&*factory, &trade)))
                        .collect::<Vec<_>>()
                },
                self.worker.handle(),
            );
        }

        // Workers finish in any order; reassemble by original position
        let mut reorder = BTreeMap::new();
        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok(results) => reorder.extend(results),
                Err(e) => log::error!("Projection worker failed: {}", e),
            }
        }
        log::debug!(
            "Built {} projections on {} workers",
            total,
            total.div_ceil(chunk_size)
        );

        (0..total)
            .map(|position| {
                reorder.remove(&position).unwrap_or_else(|| {
                    Err(ProjectionError::Panicked("projection worker lost".into()))
                })
            })
            .collect()
    }
}

fn create_guarded<F: ProjectionFactory>(factory: &F, trade: &Trade) -> ProjectionResult<F::Output> {
    match catch_unwind(AssertUnwindSafe(|| factory.create(trade))) {
        Ok(result) => result,
        Err(payload) => Err(ProjectionError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
