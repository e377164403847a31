//! Blotter session - wires trade flow, cache and paged view together
//!
//! Owns everything a running blotter needs:
//! - `TradeCache` fed by a `TradeGenerator` task
//! - `PagedTradeView` over the cache, producing `TradeProxy` rows
//! - The consumption loop that applies view batches
//! - Scripted control changes from the configuration

use crate::config::{BlotterConfig, ConfigError, ScriptStep, resolve_sort};
use blotter_core::{PageResponse, Side, TradeId};
use blotter_feed::{FeedError, TradeCache, TradeGenerator};
use blotter_ports::Projection;
use blotter_view::{
    ConsumptionContext, LeaseTracker, LogFaultObserver, PagedTradeView, TradeProxy,
    TradeProxyFactory, ViewContexts, ViewError, ViewParameters, WorkerContext,
};
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("View error: {0}")]
    View(#[from] ViewError),
}

/// One displayed row
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRow {
    pub id: TradeId,
    pub customer: String,
    pub currency_pair: String,
    pub side: Side,
    pub amount: Decimal,
    pub trade_price: Decimal,
    pub market_price: Decimal,
    pub percent_from_market: Decimal,
    pub recent: bool,
}

impl TradeRow {
    fn from_proxy(proxy: &TradeProxy) -> Self {
        let trade = proxy.trade();
        Self {
            id: trade.id,
            percent_from_market: trade.percent_from_market(),
            customer: trade.customer,
            currency_pair: trade.currency_pair,
            side: trade.side,
            amount: trade.amount,
            trade_price: trade.trade_price,
            market_price: trade.market_price,
            recent: proxy.is_recent(),
        }
    }
}

impl fmt::Display for TradeRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>6} {:<18} {:<6} {:?} {:>10} @ {:<9} mkt {:<9} {:>8}%{}",
            self.id,
            self.customer,
            self.currency_pair,
            self.side,
            self.amount,
            self.trade_price,
            self.market_price,
            self.percent_from_market,
            if self.recent { " *" } else { "" }
        )
    }
}

/// What the display shows at one point in time
#[derive(Debug, Clone, PartialEq)]
pub struct PageSnapshot {
    pub response: PageResponse,
    pub rows: Vec<TradeRow>,
}

/// Totals reported when a session ends
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub batches_applied: u64,
    pub trades_in_cache: usize,
    pub projections_acquired: u64,
    pub projections_released: u64,
    /// Projections still holding a lease after teardown; zero unless leaked
    pub projections_live: usize,
}

pub struct BlotterSession {
    config: BlotterConfig,
    cache: Arc<TradeCache>,
    tracker: LeaseTracker,
    view: PagedTradeView<TradeProxy>,
    consumption: ConsumptionContext,
    shutdown: watch::Sender<bool>,
    generator: Option<JoinHandle<()>>,
}

impl BlotterSession {
    /// Seed the cache, start the view and the trade flow. Must run inside a tokio runtime.
    pub fn start(config: BlotterConfig) -> Result<Self, SessionError> {
        config.validate()?;

        let cache = Arc::new(TradeCache::new());
        let mut generator = TradeGenerator::new(config.generator.clone())?;
        generator.seed(&cache);

        let worker = WorkerContext::try_current("blotter-worker")?;
        let (consumption, ui_loop) = ConsumptionContext::new("blotter-ui");
        worker.spawn(ui_loop.run());

        let params = ViewParameters::new(config.sort_selection()?, config.page_size);
        params.search_text.set(config.search_text.clone());

        let tracker = LeaseTracker::new();
        let view = PagedTradeView::start(
            cache.connect(),
            TradeProxyFactory::new(tracker.clone()),
            params,
            config.view.clone(),
            ViewContexts {
                worker: worker.clone(),
                consumption: consumption.clone(),
                faults: Arc::new(LogFaultObserver),
            },
        );

        let (shutdown, shutdown_rx) = watch::channel(false);
        let generator =
            worker.spawn(generator.run(cache.clone(), config.tick_interval(), shutdown_rx));

        log::info!(
            "Blotter session started: {} trades, page size {}, sort '{}'",
            cache.len(),
            config.page_size,
            config.sort
        );

        Ok(Self {
            config,
            cache,
            tracker,
            view,
            consumption,
            shutdown,
            generator: Some(generator),
        })
    }

    pub fn view(&self) -> &PagedTradeView<TradeProxy> {
        &self.view
    }

    pub fn cache(&self) -> &TradeCache {
        &self.cache
    }

    pub fn tracker(&self) -> &LeaseTracker {
        &self.tracker
    }

    pub fn snapshot(&self) -> PageSnapshot {
        PageSnapshot {
            response: self.view.params().page.response.get(),
            rows: self
                .view
                .items()
                .iter()
                .map(|proxy| TradeRow::from_proxy(proxy))
                .collect(),
        }
    }

    /// Apply one scripted control change through the parameter stores
    pub fn apply_step(&self, step: &ScriptStep) -> Result<(), SessionError> {
        let params = self.view.params();
        if let Some(text) = &step.search_text {
            params.search_text.set(text.clone());
        }
        if let Some(size) = step.page_size {
            params.page.page_size.set(size);
        }
        if let Some(page) = step.page {
            params.page.current_page.set(page);
        }
        if let Some(sort) = &step.sort {
            params.sort.set(resolve_sort(sort)?);
        }
        log::info!("Applied script step at {} ms", step.at_ms);
        Ok(())
    }

    /// Log page snapshots as the view changes, until the configured run time
    /// elapses or Ctrl-C, then shut down.
    pub async fn run(mut self) -> Result<SessionSummary, SessionError> {
        let started = tokio::time::Instant::now();
        let deadline = self.config.run_for().map(|d| started + d);
        let mut script = self.config.script.clone();
        script.sort_by_key(|s| s.at_ms);
        let mut script = script.into_iter().peekable();
        let mut version = self.view.list().subscribe();
        let mut last_logged: Option<PageResponse> = None;

        loop {
            let next_step = script
                .peek()
                .map(|s| started + Duration::from_millis(s.at_ms));

            tokio::select! {
                _ = sleep_until_opt(deadline) => break,
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Ctrl-C received");
                    break;
                }
                _ = sleep_until_opt(next_step) => {
                    if let Some(step) = script.next() {
                        self.apply_step(&step)?;
                    }
                }
                changed = version.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = self.snapshot();
                    if last_logged != Some(snapshot.response) {
                        self.log_snapshot(&snapshot);
                        last_logged = Some(snapshot.response);
                    } else {
                        log::debug!("Page {} updated", snapshot.response.page);
                    }
                }
            }
        }

        Ok(self.shutdown().await)
    }

    fn log_snapshot(&self, snapshot: &PageSnapshot) {
        let r = snapshot.response;
        log::info!(
            "Page {}/{} ({} of {} trades shown)",
            r.page,
            r.pages,
            snapshot.rows.len(),
            r.total_size
        );
        for row in snapshot.rows.iter().take(self.config.rows_shown) {
            log::info!("  {}", row);
        }
    }

    /// Stop the trade flow and dispose the view
    pub async fn shutdown(&mut self) -> SessionSummary {
        self.shutdown.send_replace(true);
        if let Some(generator) = self.generator.take() {
            if let Err(e) = generator.await {
                log::warn!("Trade generator ended abnormally: {}", e);
            }
        }
        self.view.dispose();
        // Let batches already queued for the display apply their releases
        if let Err(e) = self.consumption.invoke(|| ()).await {
            log::warn!("Consumption loop gone before shutdown: {}", e);
        }

        let summary = SessionSummary {
            batches_applied: self.view.list().version(),
            trades_in_cache: self.cache.len(),
            projections_acquired: self.tracker.acquired(),
            projections_released: self.tracker.released(),
            projections_live: self.tracker.live(),
        };
        log::info!("Blotter session stopped: {:?}", summary);
        summary
    }
}

async fn sleep_until_opt(at: Option<tokio::time::Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
