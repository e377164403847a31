//! Market Prices - simulated mid rates per currency pair
//!
//! Random-walks each configured pair so live trades can be marked to market.

use blotter_core::CurrencyPair;
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Static description of a tradeable currency pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyPairConfig {
    pub code: CurrencyPair,
    /// Starting mid rate
    pub base_price: Decimal,
    /// Decimal places quoted for this pair
    pub decimals: u32,
}

impl CurrencyPairConfig {
    pub fn new(code: impl Into<CurrencyPair>, base_price: Decimal, decimals: u32) -> Self {
        Self {
            code: code.into(),
            base_price,
            decimals,
        }
    }
}

/// Current mid rate per currency pair
#[derive(Debug, Clone)]
pub struct MarketPrices {
    prices: BTreeMap<CurrencyPair, (Decimal, u32)>,
    /// Maximum relative move per tick, e.g. 0.0005 = 5 bps
    volatility: f64,
}

impl MarketPrices {
    pub fn new(pairs: &[CurrencyPairConfig], volatility: f64) -> Self {
        let prices = pairs
            .iter()
            .map(|p| (p.code.clone(), (p.base_price.round_dp(p.decimals), p.decimals)))
            .collect();
        Self { prices, volatility }
    }

    pub fn price(&self, pair: &str) -> Option<Decimal> {
        self.prices.get(pair).map(|(price, _)| *price)
    }

    pub fn pairs(&self) -> impl Iterator<Item = &CurrencyPair> {
        self.prices.keys()
    }

    pub fn set_price(&mut self, pair: &str, price: Decimal) {
        if let Some(entry) = self.prices.get_mut(pair) {
            entry.0 = price.round_dp(entry.1);
        }
    }

    /// Move every pair by a random step and return the pairs whose quoted rate changed
    pub fn tick<R: Rng>(&mut self, rng: &mut R) -> Vec<(CurrencyPair, Decimal)> {
        let mut moved = Vec::new();
        for (pair, (price, decimals)) in self.prices.iter_mut() {
            let step: f64 = rng.gen_range(-1.0..1.0) * self.volatility;
            let current = price.to_f64().unwrap_or(0.0);
            let Some(next) = Decimal::from_f64(current * (1.0 + step)) else {
                continue;
            };
            let next = next.round_dp(*decimals);
            if next != *price && next > Decimal::ZERO {
                *price = next;
                moved.push((pair.clone(), next));
            }
        }
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rust_decimal_macros::dec;

    fn pairs() -> Vec<CurrencyPairConfig> {
        vec![
            CurrencyPairConfig::new("EURUSD", dec!(1.0850), 4),
            CurrencyPairConfig::new("USDJPY", dec!(151.20), 2),
        ]
    }

    #[test]
    fn test_initial_prices() {
        let market = MarketPrices::new(&pairs(), 0.001);
        assert_eq!(market.price("EURUSD"), Some(dec!(1.0850)));
        assert_eq!(market.price("GBPUSD"), None);
        assert_eq!(market.pairs().count(), 2);
    }

    #[test]
    fn test_tick_stays_near_base() {
        let mut market = MarketPrices::new(&pairs(), 0.001);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            for (_, price) in market.tick(&mut rng) {
                assert!(price > Decimal::ZERO);
            }
        }
        let eur = market.price("EURUSD").unwrap();
        assert!(eur > dec!(0.8) && eur < dec!(1.4));
        assert!(eur.scale() <= 4);
    }

    #[test]
    fn test_set_price_rounds_to_pair_decimals() {
        let mut market = MarketPrices::new(&pairs(), 0.001);
        market.set_price("USDJPY", dec!(150.1234));
        assert_eq!(market.price("USDJPY"), Some(dec!(150.12)));
    }
}
