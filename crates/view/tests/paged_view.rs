//! Integration test: TradeCache -> PagedTradeView -> BoundList
//!
//! Drives the full view through its parameter stores and checks what ends
//! up in the bound container and the published page response.

use blotter_core::{PageResponse, Side, SortField, SortSelection, Trade, TradeId};
use blotter_feed::{GeneratorConfig, TradeCache, TradeGenerator};
use blotter_ports::{Fault, Projection, ProjectionError, ProjectionFactory, ProjectionResult};
use blotter_view::{
    ConsumptionContext, FilterPredicate, LeaseTracker, PagedTradeView, RecordingFaultObserver,
    SortComparer, TradeProxy, TradeProxyFactory, UpdatePolicy, ViewContexts, ViewOptions,
    ViewParameters, WorkerContext,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

fn trade(id: TradeId, customer: &str, pair: &str) -> Trade {
    Trade::new(id, customer, pair, Side::Buy, dec!(1.10), dec!(1000))
}

fn ids<P: Projection>(items: &[Arc<P>]) -> Vec<TradeId> {
    items.iter().map(|p| p.id()).collect()
}

fn fast_options() -> ViewOptions {
    ViewOptions {
        search_debounce_ms: 20,
        page_sample_ms: 10,
        ..Default::default()
    }
}

struct Harness<P: Projection> {
    cache: TradeCache,
    faults: Arc<RecordingFaultObserver>,
    view: PagedTradeView<P>,
}

impl<P: Projection> Harness<P> {
    fn start<F>(cache: TradeCache, factory: F, params: ViewParameters, options: ViewOptions) -> Self
    where
        F: ProjectionFactory<Output = P>,
    {
        let _ = env_logger::try_init();

        let (consumption, ui_loop) = ConsumptionContext::new("ui");
        tokio::spawn(ui_loop.run());
        let faults = Arc::new(RecordingFaultObserver::new());
        let view = PagedTradeView::start(
            cache.connect(),
            factory,
            params,
            options,
            ViewContexts {
                worker: WorkerContext::try_current("worker").expect("inside runtime"),
                consumption,
                faults: faults.clone(),
            },
        );
        Self { cache, faults, view }
    }

    fn response(&self) -> PageResponse {
        self.view.params().page.response.get()
    }

    /// Wait until the bound container and page response satisfy `condition`
    async fn settle(&self, condition: impl Fn(&[Arc<P>], PageResponse) -> bool) {
        let mut version = self.view.list().subscribe();
        let wait = async {
            loop {
                if condition(&self.view.items(), self.response()) {
                    return;
                }
                version.changed().await.expect("view alive");
            }
        };
        tokio::time::timeout(Duration::from_secs(10), wait)
            .await
            .expect("view did not settle");
    }
}

fn by_id_params(page_size: u32) -> ViewParameters {
    ViewParameters::new(SortSelection::by_id(), page_size)
}

fn acme_and_beta() -> TradeCache {
    let cache = TradeCache::new();
    cache.add_or_update([trade(1, "Acme", "EURUSD"), trade(2, "Beta", "GBPUSD")]);
    cache
}

#[tokio::test(start_paused = true)]
async fn test_search_narrows_the_page() {
    let tracker = LeaseTracker::new();
    let harness = Harness::start(
        acme_and_beta(),
        TradeProxyFactory::new(tracker.clone()),
        by_id_params(25),
        ViewOptions::default(),
    );

    harness
        .settle(|items, r| ids(items) == vec![1, 2] && r.total_size == 2)
        .await;
    assert_eq!(harness.response().pages, 1);
    assert_eq!(harness.response().page, 1);

    harness.view.params().search_text.set("gbp".into());
    harness
        .settle(|items, r| ids(items) == vec![2] && r.total_size == 1)
        .await;
    assert_eq!(harness.response().pages, 1);
    assert_eq!(tracker.live(), 1);
    assert_eq!(tracker.live_for(1), 0);

    harness.view.params().search_text.set(String::new());
    harness
        .settle(|items, r| ids(items) == vec![1, 2] && r.total_size == 2)
        .await;
    assert!(tracker.duplicated().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rapid_search_edits_apply_once() {
    let harness = Harness::start(
        acme_and_beta(),
        TradeProxyFactory::default(),
        by_id_params(25),
        ViewOptions::default(),
    );
    harness.settle(|items, _| items.len() == 2).await;

    let filter = harness.view.filter_controller();
    for text in ["b", "be", "bet", "beta", "bet", "be", "b", "gb", "gbp", "acm"] {
        harness.view.params().search_text.set(text.into());
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(filter.applied(), 0);

    harness.settle(|items, _| ids(items) == vec![1]).await;
    assert_eq!(filter.applied(), 1);
    assert_eq!(filter.current().description(), "contains 'acm'");
}

#[tokio::test]
async fn test_paging_round_trip() {
    let cache = TradeCache::new();
    cache.add_or_update((1..=60).map(|id| trade(id, "Acme", "EURUSD")));
    let harness = Harness::start(
        cache,
        TradeProxyFactory::default(),
        by_id_params(25),
        fast_options(),
    );
    let page = &harness.view.params().page;

    harness
        .settle(|items, r| items.len() == 25 && r.total_size == 60)
        .await;
    let first = harness.view.items();
    assert_eq!(ids(&first), (1..=25).collect::<Vec<_>>());
    assert_eq!(harness.response().pages, 3);
    assert!(page.can_next());
    assert!(!page.can_previous());

    assert!(page.next_page());
    harness.settle(|_, r| r.page == 2).await;
    assert_eq!(ids(&harness.view.items()), (26..=50).collect::<Vec<_>>());

    assert!(page.next_page());
    harness.settle(|_, r| r.page == 3).await;
    assert_eq!(ids(&harness.view.items()), (51..=60).collect::<Vec<_>>());
    assert!(!page.next_page());

    assert!(page.previous_page());
    assert!(page.previous_page());
    harness.settle(|_, r| r.page == 1).await;
    let back = harness.view.items();
    assert_eq!(ids(&back), ids(&first));
    // Same projections: paging does not rebuild them
    assert!(back.iter().zip(&first).all(|(a, b)| Arc::ptr_eq(a, b)));
}

#[tokio::test]
async fn test_removal_releases_exactly_one_projection() {
    let tracker = LeaseTracker::new();
    let cache = TradeCache::new();
    cache.add_or_update((1..=3).map(|id| trade(id, "Acme", "EURUSD")));
    let harness = Harness::start(
        cache,
        TradeProxyFactory::new(tracker.clone()),
        by_id_params(25),
        fast_options(),
    );
    harness.settle(|items, _| items.len() == 3).await;
    let removed = harness.view.items()[1].clone();

    harness.cache.remove([2]);
    harness.settle(|items, _| ids(items) == vec![1, 3]).await;

    assert!(removed.is_released());
    assert_eq!(tracker.released(), 1);
    assert_eq!(tracker.live(), 2);
    assert_eq!(harness.view.live_projections(), 2);
    assert_eq!(harness.response().total_size, 2);
}

#[tokio::test]
async fn test_sort_change_reorders_monotonically() {
    let cache = TradeCache::new();
    cache.add_or_update((1..=12u64).map(|id| {
        let pair = ["USDJPY", "EURUSD", "GBPUSD"][(id % 3) as usize];
        Trade::new(id, "Acme", pair, Side::Sell, dec!(1.10), Decimal::from((id * 7) % 5 + 1) * dec!(1000))
    }));
    let harness = Harness::start(
        cache,
        TradeProxyFactory::default(),
        by_id_params(25),
        fast_options(),
    );
    harness.settle(|items, _| items.len() == 12).await;

    let selection = SortSelection::pair_then_amount();
    let comparer = SortComparer::try_from_selection(&selection).unwrap();
    harness.view.params().sort.set(selection);
    harness
        .settle(|items, _| {
            items
                .windows(2)
                .all(|w| comparer.compare(&w[0].trade(), &w[1].trade()).is_le())
        })
        .await;

    let first = harness.view.items()[0].trade();
    assert_eq!(first.currency_pair, "EURUSD");
    assert_eq!(harness.view.sort_controller().current().name(), "Currency Pair, Amount");
}

#[tokio::test]
async fn test_invalid_sort_keeps_order() {
    let harness = Harness::start(
        acme_and_beta(),
        TradeProxyFactory::default(),
        by_id_params(25),
        fast_options(),
    );
    harness.settle(|items, _| items.len() == 2).await;

    harness
        .view
        .params()
        .sort
        .set(SortSelection::new("broken").then_by(SortField::Amount).then_by(SortField::Amount));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(harness.view.sort_controller().current().name(), "Identifier");
    assert_eq!(ids(&harness.view.items()), vec![1, 2]);
    assert!(matches!(harness.faults.faults()[0], Fault::Control { .. }));
}

#[tokio::test]
async fn test_reevaluate_policy_drops_updated_trade() {
    let params = by_id_params(25);
    params.search_text.set("gbp".into());
    let harness = Harness::start(
        acme_and_beta(),
        TradeProxyFactory::default(),
        params,
        fast_options(),
    );
    harness.settle(|items, _| ids(items) == vec![2]).await;

    harness.cache.add_or_update([trade(2, "Beta", "EURUSD")]);
    harness
        .settle(|items, r| items.is_empty() && r.total_size == 0)
        .await;
    assert_eq!(harness.response().pages, 0);
}

#[tokio::test]
async fn test_refresh_only_policy_waits_for_refresh() {
    let params = by_id_params(25);
    params.search_text.set("gbp".into());
    let harness = Harness::start(
        acme_and_beta(),
        TradeProxyFactory::default(),
        params,
        ViewOptions {
            update_policy: UpdatePolicy::RefreshOnly,
            ..fast_options()
        },
    );
    harness.settle(|items, _| ids(items) == vec![2]).await;
    let proxy = harness.view.items()[0].clone();

    harness.cache.add_or_update([trade(2, "Beta", "EURUSD")]);
    harness
        .settle(|items, _| items.len() == 1 && items[0].currency_pair() == "EURUSD")
        .await;
    assert!(Arc::ptr_eq(&proxy, &harness.view.items()[0]));

    harness.cache.refresh([2]);
    harness.settle(|items, _| items.is_empty()).await;
    assert!(proxy.is_released());
}

#[tokio::test]
async fn test_page_beyond_range_is_empty() {
    let harness = Harness::start(
        acme_and_beta(),
        TradeProxyFactory::default(),
        by_id_params(25),
        fast_options(),
    );
    harness.settle(|items, _| items.len() == 2).await;

    harness.view.params().page.current_page.set(5);
    harness.settle(|items, r| r.page == 5 && items.is_empty()).await;
    assert_eq!(harness.response().total_size, 2);
    assert_eq!(harness.response().pages, 1);
}

struct FlakyFactory {
    inner: TradeProxyFactory,
    fail: TradeId,
}

impl ProjectionFactory for FlakyFactory {
    type Output = TradeProxy;

    fn create(&self, trade: &Trade) -> ProjectionResult<TradeProxy> {
        if trade.id == self.fail {
            return Err(ProjectionError::ResourceUnavailable {
                trade_id: trade.id,
                reason: "no market data".into(),
            });
        }
        self.inner.create(trade)
    }
}

#[tokio::test]
async fn test_failed_projection_is_excluded_and_reported() {
    let cache = TradeCache::new();
    cache.add_or_update((1..=3).map(|id| trade(id, "Acme", "EURUSD")));
    let harness = Harness::start(
        cache,
        FlakyFactory {
            inner: TradeProxyFactory::default(),
            fail: 2,
        },
        by_id_params(25),
        fast_options(),
    );

    harness
        .settle(|items, r| ids(items) == vec![1, 3] && r.total_size == 2)
        .await;
    let faults = harness.faults.faults();
    assert_eq!(faults.len(), 1);
    assert!(matches!(faults[0], Fault::Projection { trade_id: 2, .. }));
}

#[tokio::test]
async fn test_dispose_releases_everything_once() {
    let tracker = LeaseTracker::new();
    let cache = TradeCache::new();
    cache.add_or_update((1..=30).map(|id| trade(id, "Acme", "EURUSD")));
    let harness = Harness::start(
        cache,
        TradeProxyFactory::new(tracker.clone()),
        by_id_params(10),
        fast_options(),
    );
    harness
        .settle(|items, r| items.len() == 10 && r.total_size == 30)
        .await;
    assert_eq!(tracker.live(), 30);

    harness.view.dispose();
    harness.view.dispose();
    assert!(harness.view.is_disposed());
    assert_eq!(tracker.live(), 0);
    assert_eq!(tracker.released(), tracker.acquired());
    assert_eq!(harness.view.live_projections(), 0);

    // Nothing flows after teardown
    let version = harness.view.list().version();
    harness.cache.add_or_update([trade(31, "Acme", "EURUSD")]);
    harness.view.params().search_text.set("nothing".into());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.view.list().version(), version);
    assert_eq!(tracker.live(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_live_flow_converges_to_expected_window() {
    let tracker = LeaseTracker::new();
    let cache = Arc::new(TradeCache::new());
    let mut generator = TradeGenerator::new(GeneratorConfig {
        initial_trades: 200,
        trades_per_tick: 5,
        close_probability: 0.05,
        price_volatility: 0.01,
        seed: Some(99),
        ..Default::default()
    })
    .expect("valid config");
    generator.seed(&cache);

    let (consumption, ui_loop) = ConsumptionContext::new("ui");
    tokio::spawn(ui_loop.run());
    let view = PagedTradeView::start(
        cache.connect(),
        TradeProxyFactory::new(tracker.clone()),
        ViewParameters::new(SortSelection::pair_then_amount(), 20),
        fast_options(),
        ViewContexts {
            worker: WorkerContext::try_current("worker").unwrap(),
            consumption,
            faults: Arc::new(RecordingFaultObserver::new()),
        },
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let feed = tokio::spawn(generator.run(cache.clone(), Duration::from_millis(5), shutdown_rx));

    for (i, text) in ["usd", "eur", "", "acme", "gbp"].into_iter().enumerate() {
        view.params().search_text.set(text.into());
        view.params().page.current_page.set((i % 3) as u32 + 1);
        tokio::time::sleep(Duration::from_millis(30)).await;
    }
    view.params().page.current_page.set(2);
    shutdown_tx.send_replace(true);
    feed.await.unwrap();

    let predicate = FilterPredicate::from_search_text("gbp").unwrap();
    let comparer = SortComparer::try_from_selection(&SortSelection::pair_then_amount()).unwrap();
    let mut expected: Vec<Trade> = cache.trades().into_iter().filter(|t| predicate.matches(t)).collect();
    expected.sort_by(|a, b| comparer.compare(a, b));
    let expected_ids: Vec<TradeId> = expected.iter().skip(20).take(20).map(|t| t.id).collect();
    let expected_total = expected.len();

    let mut version = view.list().subscribe();
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let response = view.params().page.response.get();
            if ids(&view.items()) == expected_ids
                && response.total_size == expected_total
                && response.page == 2
            {
                return;
            }
            version.changed().await.unwrap();
        }
    })
    .await
    .expect("view converged");

    // Quiet period: nothing left in flight
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(ids(&view.items()), expected_ids);
    assert!(tracker.duplicated().is_empty());
    assert_eq!(tracker.live(), expected_total);
    view.dispose();
    assert_eq!(tracker.live(), 0);
}
