//! Paged trade view
//!
//! Assembles parameter stores, control streams, controllers, the pipeline
//! task and the sink binder into one disposable unit.

use crate::binder::{BoundList, SinkBinder};
use crate::context::{ConsumptionContext, WorkerContext};
use crate::controller::{
    Controller, FilterController, FilterPredicate, PageController, SortComparer, SortController,
};
use crate::controls::ControlWiring;
use crate::lifecycle::Teardown;
use crate::params::ViewParameters;
use crate::pipeline::transform::{ProjectionRegistry, TransformOptions};
use crate::pipeline::{self, PipelineInputs, PipelineState, UpdatePolicy};
use blotter_core::TradeChanges;
use blotter_feed::Subscriber;
use blotter_ports::{Fault, FaultObserver, Projection, ProjectionFactory};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Timing and pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewOptions {
    /// Quiet period before search text is applied
    pub search_debounce_ms: u64,
    /// Sampling period for page changes
    pub page_sample_ms: u64,
    pub transform: TransformOptions,
    pub update_policy: UpdatePolicy,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            search_debounce_ms: 250,
            page_sample_ms: 100,
            transform: TransformOptions::default(),
            update_policy: UpdatePolicy::default(),
        }
    }
}

impl ViewOptions {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn page_sample(&self) -> Duration {
        Duration::from_millis(self.page_sample_ms)
    }
}

/// Execution environment injected by the owner
#[derive(Clone)]
pub struct ViewContexts {
    pub worker: WorkerContext,
    pub consumption: ConsumptionContext,
    pub faults: Arc<dyn FaultObserver>,
}

/// Live filtered, sorted and paged view over a trade source
pub struct PagedTradeView<P: Projection> {
    params: ViewParameters,
    list: BoundList<P>,
    filter: Arc<FilterController>,
    sort: Arc<SortController>,
    page: Arc<PageController>,
    registry: Arc<ProjectionRegistry<P>>,
    teardown: Teardown,
}

impl<P: Projection> PagedTradeView<P> {
    /// Wire everything up and start the pipeline on the worker context
    pub fn start<S, F>(
        source: S,
        factory: F,
        params: ViewParameters,
        options: ViewOptions,
        contexts: ViewContexts,
    ) -> Self
    where
        S: Subscriber<TradeChanges> + 'static,
        F: ProjectionFactory<Output = P>,
    {
        let ViewContexts {
            worker,
            consumption,
            faults,
        } = contexts;

        // Seed the controllers from whatever the stores hold right now
        let predicate =
            FilterPredicate::from_search_text(&params.search_text.get()).unwrap_or_else(|e| {
                faults.on_fault(Fault::Control {
                    control: "search_text".into(),
                    reason: e.to_string(),
                });
                FilterPredicate::always()
            });
        let comparer = SortComparer::try_from_selection(&params.sort.get()).unwrap_or_else(|e| {
            faults.on_fault(Fault::Control {
                control: "sort".into(),
                reason: e.to_string(),
            });
            SortComparer::default()
        });
        let request = params.page.request().unwrap_or_default();

        let filter = Arc::new(Controller::new("filter", predicate.clone()));
        let sort = Arc::new(Controller::new("sort", comparer.clone()));
        let page = Arc::new(Controller::new("page", request));

        let teardown = Teardown::new("paged-trade-view");
        let wiring = ControlWiring {
            worker: &worker,
            teardown: &teardown,
            faults: faults.clone(),
        };
        wiring.search_text(
            params.search_text.subscribe(),
            filter.clone(),
            options.search_debounce(),
        );
        wiring.sort(params.sort.subscribe(), sort.clone());
        wiring.paging(
            params.page.current_page.subscribe(),
            params.page.page_size.subscribe(),
            page.clone(),
            options.page_sample(),
        );

        let registry = Arc::new(ProjectionRegistry::new());
        let state = PipelineState::new(
            Arc::new(factory),
            registry.clone(),
            predicate,
            comparer,
            request,
            options.update_policy,
            options.transform,
            worker.clone(),
            faults,
        );
        let inputs = PipelineInputs {
            source: Box::new(source),
            filter: filter.subscribe(),
            sort: sort.subscribe(),
            page: page.subscribe(),
        };
        let list = BoundList::new();
        let binder = SinkBinder::new(list.clone(), params.page.clone(), consumption);
        teardown.add_task(worker.spawn(pipeline::run(state, inputs, binder)));

        {
            let registry = registry.clone();
            teardown.add_action(move || {
                let released = registry.close();
                log::debug!("Released {} projections on teardown", released);
            });
        }

        log::info!(
            "Paged trade view started (page size {}, sort '{}')",
            request.size(),
            sort.current().name()
        );

        Self {
            params,
            list,
            filter,
            sort,
            page,
            registry,
            teardown,
        }
    }

    pub fn params(&self) -> &ViewParameters {
        &self.params
    }

    /// The bound container, mutated only on the consumption context
    pub fn list(&self) -> &BoundList<P> {
        &self.list
    }

    pub fn items(&self) -> Vec<Arc<P>> {
        self.list.snapshot()
    }

    pub fn filter_controller(&self) -> &FilterController {
        &self.filter
    }

    pub fn sort_controller(&self) -> &SortController {
        &self.sort
    }

    pub fn page_controller(&self) -> &PageController {
        &self.page
    }

    /// Projections alive in the pipeline (filtered set, not just the window)
    pub fn live_projections(&self) -> usize {
        self.registry.len()
    }

    /// Stop all control streams and the pipeline, then release every live
    /// projection. Safe to call any number of times.
    pub fn dispose(&self) {
        self.teardown.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.teardown.is_disposed()
    }
}

impl<P: Projection> Drop for PagedTradeView<P> {
    fn drop(&mut self) {
        self.dispose();
    }
}
