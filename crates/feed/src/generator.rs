//! Trade Generator - simulated live trade flow
//!
//! Drives a [`TradeCache`] the way a booking system would:
//! - New trades are booked for random customers and currency pairs
//! - Market rates random-walk and live trades are marked to market (updates)
//! - Trades are closed out and leave the live cache (removes)

use crate::cache::TradeCache;
use crate::error::FeedError;
use crate::market::{CurrencyPairConfig, MarketPrices};
use blotter_core::{Side, Trade, TradeId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;

/// Configuration for trade flow simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub customers: Vec<String>,
    pub currency_pairs: Vec<CurrencyPairConfig>,
    /// Trades booked before the first tick
    pub initial_trades: usize,
    /// Trades booked on every tick
    pub trades_per_tick: usize,
    /// Probability per tick that any given live trade is closed (0.0 to 1.0)
    pub close_probability: f64,
    /// Maximum relative market move per tick
    pub price_volatility: f64,
    /// Largest trade size in lots of 1,000
    pub max_lots: u32,
    /// Seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            customers: [
                "Acme Corp",
                "Beta Capital",
                "Contoso Bank",
                "Dunder Mifflin",
                "Globex",
                "Initech",
                "Stark Industries",
                "Wayne Enterprises",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
            currency_pairs: vec![
                CurrencyPairConfig::new("EURUSD", dec!(1.0850), 4),
                CurrencyPairConfig::new("GBPUSD", dec!(1.2700), 4),
                CurrencyPairConfig::new("USDJPY", dec!(151.20), 2),
                CurrencyPairConfig::new("AUDUSD", dec!(0.6550), 4),
                CurrencyPairConfig::new("USDCHF", dec!(0.9050), 4),
                CurrencyPairConfig::new("EURGBP", dec!(0.8550), 4),
            ],
            initial_trades: 100,
            trades_per_tick: 2,
            close_probability: 0.01,
            price_volatility: 0.0005,
            max_lots: 5_000,
            seed: None,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<(), FeedError> {
        if self.customers.is_empty() {
            return Err(FeedError::InvalidConfig("no customers configured".into()));
        }
        if self.currency_pairs.is_empty() {
            return Err(FeedError::InvalidConfig("no currency pairs configured".into()));
        }
        if !(0.0..=1.0).contains(&self.close_probability) {
            return Err(FeedError::InvalidConfig(format!(
                "close_probability {} outside [0, 1]",
                self.close_probability
            )));
        }
        if self.max_lots == 0 {
            return Err(FeedError::InvalidConfig("max_lots must be positive".into()));
        }
        Ok(())
    }
}

/// Outcome of one simulation tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub booked: usize,
    pub marked: usize,
    pub closed: usize,
}

/// Generates trades and market moves into a trade cache
pub struct TradeGenerator {
    config: GeneratorConfig,
    market: MarketPrices,
    rng: StdRng,
    next_id: TradeId,
}

impl TradeGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self, FeedError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let market = MarketPrices::new(&config.currency_pairs, config.price_volatility);
        Ok(Self {
            config,
            market,
            rng,
            next_id: 1,
        })
    }

    pub fn market(&self) -> &MarketPrices {
        &self.market
    }

    /// Book a new trade at the current market rate
    pub fn next_trade(&mut self) -> Trade {
        let id = self.next_id;
        self.next_id += 1;

        let customer = &self.config.customers[self.rng.gen_range(0..self.config.customers.len())];
        let pair =
            &self.config.currency_pairs[self.rng.gen_range(0..self.config.currency_pairs.len())];
        let side = if self.rng.gen_bool(0.5) {
            Side::Buy
        } else {
            Side::Sell
        };
        let lots = self.rng.gen_range(1..=self.config.max_lots);
        let price = self.market.price(&pair.code).unwrap_or(pair.base_price);

        Trade::new(
            id,
            customer.clone(),
            pair.code.clone(),
            side,
            price,
            Decimal::from(lots) * dec!(1000),
        )
    }

    /// Book the configured initial trades into the cache as one batch
    pub fn seed(&mut self, cache: &TradeCache) -> usize {
        let trades: Vec<Trade> = (0..self.config.initial_trades)
            .map(|_| self.next_trade())
            .collect();
        let count = trades.len();
        cache.add_or_update(trades);
        log::info!("Seeded trade cache with {} trades", count);
        count
    }

    /// Advance the simulation by one step, applied to the cache as one batch
    pub fn tick(&mut self, cache: &TradeCache) -> TickSummary {
        let moved = self.market.tick(&mut self.rng);
        let booked: Vec<Trade> = (0..self.config.trades_per_tick)
            .map(|_| self.next_trade())
            .collect();
        let close_probability = self.config.close_probability;
        let rng = &mut self.rng;

        cache.edit(|updater| {
            let mut summary = TickSummary::default();

            let live: Vec<Trade> = updater.trades().filter(|t| t.is_live()).cloned().collect();
            for trade in live {
                if rng.gen_bool(close_probability) {
                    updater.remove(trade.id);
                    summary.closed += 1;
                    continue;
                }
                if let Some((_, price)) = moved.iter().find(|(pair, _)| *pair == trade.currency_pair)
                {
                    updater.add_or_update(trade.with_market_price(*price));
                    summary.marked += 1;
                }
            }

            for trade in booked {
                updater.add_or_update(trade);
                summary.booked += 1;
            }
            summary
        })
    }

    /// Tick on a fixed interval until `shutdown` flips to true or its sender drops
    pub async fn run(
        mut self,
        cache: std::sync::Arc<TradeCache>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        log::info!("Trade generator started ({:?} interval)", interval);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let summary = self.tick(&cache);
                    log::debug!(
                        "Generator tick: {} booked, {} marked, {} closed",
                        summary.booked,
                        summary.marked,
                        summary.closed
                    );
                }
            }
        }

        log::info!("Trade generator stopped");
    }
}
