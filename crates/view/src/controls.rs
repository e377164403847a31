//! Control streams
//!
//! Wires each parameter store to its controller:
//!
//! ```text
//! search_text ─► changes ─► debounce(250ms) ─► predicate ─────────────► filter controller
//! sort        ─► changes ─────────────────────► comparer ─────────────► sort controller
//! page, size  ─► combine_latest ─► request ─► distinct ─► sample(100ms) ─► page controller
//! ```
//!
//! Values that cannot be turned into a controller value are reported as
//! control faults. Search text falls back to match-all; a bad sort
//! selection leaves the previous comparer in effect; an unusable page
//! request is skipped.

use crate::context::WorkerContext;
use crate::controller::{FilterController, FilterPredicate, PageController, SortComparer, SortController};
use crate::lifecycle::Teardown;
use crate::operators;
use blotter_core::{PageRequest, SortSelection};
use blotter_ports::{Fault, FaultObserver};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

#[derive(Clone)]
struct ControlFaults(Arc<dyn FaultObserver>);

impl ControlFaults {
    fn report(&self, control: &str, reason: String) {
        self.0.on_fault(Fault::Control {
            control: control.to_string(),
            reason,
        });
    }
}

/// Spawns control tasks on the worker context and hands them to a teardown
pub struct ControlWiring<'a> {
    pub worker: &'a WorkerContext,
    pub teardown: &'a Teardown,
    pub faults: Arc<dyn FaultObserver>,
}

impl ControlWiring<'_> {
    fn spawn(&self, task: impl Future<Output = ()> + Send + 'static) {
        self.teardown.add_task(self.worker.spawn(task));
    }

    fn reporter(&self) -> ControlFaults {
        ControlFaults(self.faults.clone())
    }

    pub fn search_text(
        &self,
        source: watch::Receiver<String>,
        controller: Arc<FilterController>,
        quiet: Duration,
    ) {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (settled_tx, mut settled_rx) = mpsc::unbounded_channel::<String>();
        self.spawn(operators::changes(source, raw_tx));
        self.spawn(operators::debounce(raw_rx, settled_tx, quiet));

        let faults = self.reporter();
        self.spawn(async move {
            while let Some(text) = settled_rx.recv().await {
                let predicate = FilterPredicate::from_search_text(&text).unwrap_or_else(|e| {
                    faults.report("search_text", e.to_string());
                    FilterPredicate::always()
                });
                controller.change(predicate);
            }
        });
    }

    pub fn sort(&self, mut source: watch::Receiver<SortSelection>, controller: Arc<SortController>) {
        let faults = self.reporter();
        self.spawn(async move {
            while source.changed().await.is_ok() {
                let selection = source.borrow_and_update().clone();
                match SortComparer::try_from_selection(&selection) {
                    Ok(comparer) => controller.change(comparer),
                    Err(e) => faults.report("sort", e.to_string()),
                }
            }
        });
    }

    pub fn paging(
        &self,
        page: watch::Receiver<u32>,
        size: watch::Receiver<u32>,
        controller: Arc<PageController>,
        period: Duration,
    ) {
        let (pairs_tx, mut pairs_rx) = mpsc::unbounded_channel();
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        let (distinct_tx, distinct_rx) = mpsc::unbounded_channel();
        let (sampled_tx, mut sampled_rx) = mpsc::unbounded_channel::<PageRequest>();

        self.spawn(operators::combine_latest(page, size, pairs_tx));
        let faults = self.reporter();
        self.spawn(async move {
            while let Some((page, size)) = pairs_rx.recv().await {
                match PageRequest::new(page, size) {
                    Some(request) => {
                        if requests_tx.send(request).is_err() {
                            break;
                        }
                    }
                    None => faults.report(
                        "page",
                        format!("page={} size={} ignored; both must be positive", page, size),
                    ),
                }
            }
        });
        self.spawn(operators::distinct_until_changed(requests_rx, distinct_tx));
        self.spawn(operators::sample(distinct_rx, sampled_tx, period));
        self.spawn(async move {
            while let Some(request) = sampled_rx.recv().await {
                controller.change(request);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Controller;
    use crate::fault::RecordingFaultObserver;
    use crate::params::ViewParameters;
    use blotter_core::SortField;

    struct Fixture {
        params: ViewParameters,
        faults: Arc<RecordingFaultObserver>,
        teardown: Teardown,
        worker: WorkerContext,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                params: ViewParameters::default(),
                faults: Arc::new(RecordingFaultObserver::new()),
                teardown: Teardown::new("controls"),
                worker: WorkerContext::try_current("worker").unwrap(),
            }
        }

        fn wiring(&self) -> ControlWiring<'_> {
            ControlWiring {
                worker: &self.worker,
                teardown: &self.teardown,
                faults: self.faults.clone(),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_text_debounced_to_one_change() {
        let fixture = Fixture::new();
        let filter = Arc::new(Controller::new("filter", FilterPredicate::always()));
        fixture.wiring().search_text(
            fixture.params.search_text.subscribe(),
            filter.clone(),
            Duration::from_millis(250),
        );

        for text in ["g", "gb", "gbp", "gbpu", "gbpus", "gbpusd", "gbpus", "gbpu", "gbp", "gb"] {
            fixture.params.search_text.set(text.to_string());
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(filter.applied(), 0);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(filter.applied(), 1);
        assert_eq!(filter.current().description(), "contains 'gb'");
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_search_falls_back_to_all() {
        let fixture = Fixture::new();
        let filter = Arc::new(Controller::new("filter", FilterPredicate::always()));
        fixture.wiring().search_text(
            fixture.params.search_text.subscribe(),
            filter.clone(),
            Duration::from_millis(250),
        );

        fixture.params.search_text.set("x".repeat(300));
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(filter.applied(), 1);
        assert_eq!(filter.current().description(), "all");
        assert!(matches!(fixture.faults.faults()[0], Fault::Control { .. }));
    }

    #[tokio::test]
    async fn test_invalid_sort_keeps_previous_comparer() {
        let fixture = Fixture::new();
        let sort = Arc::new(Controller::new("sort", SortComparer::default()));
        fixture.wiring().sort(fixture.params.sort.subscribe(), sort.clone());
        let mut applied = sort.subscribe();

        fixture.params.sort.set(SortSelection::new("broken"));
        fixture.params.sort.set(SortSelection::by_id());
        applied.changed().await.unwrap();

        assert_eq!(sort.current().name(), "Identifier");
        // The broken selection may coalesce away; it never reaches the controller
        assert_eq!(sort.applied(), 1);

        fixture
            .params
            .sort
            .set(SortSelection::new("repeat").then_by(SortField::Id).then_by(SortField::Id));
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(sort.current().name(), "Identifier");
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_changes_sampled() {
        let fixture = Fixture::new();
        let page = Arc::new(Controller::new("page", PageRequest::default()));
        fixture.wiring().paging(
            fixture.params.page.current_page.subscribe(),
            fixture.params.page.page_size.subscribe(),
            page.clone(),
            Duration::from_millis(100),
        );

        for p in 2..=6 {
            fixture.params.page.current_page.set(p);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(page.applied(), 1);
        assert_eq!(page.current().page(), 6);

        // Size zero is skipped and reported
        fixture.params.page.page_size.set(0);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(page.applied(), 1);
        assert_eq!(fixture.faults.len(), 1);
    }

    #[tokio::test]
    async fn test_teardown_stops_control_tasks() {
        let fixture = Fixture::new();
        let filter = Arc::new(Controller::new("filter", FilterPredicate::always()));
        fixture.wiring().search_text(
            fixture.params.search_text.subscribe(),
            filter,
            Duration::from_millis(250),
        );
        assert_eq!(fixture.teardown.task_count(), 3);
        assert!(fixture.teardown.dispose());
        assert_eq!(fixture.teardown.task_count(), 0);
    }
}
