use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Side, TradeStatus};
use crate::values::{CurrencyPair, Price, Quantity, Timestamp};

/// Unique identifier for a trade, stable across updates
pub type TradeId = u64;

/// A booked trade as it arrives from the source feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub customer: String,
    pub currency_pair: CurrencyPair,
    pub side: Side,
    pub status: TradeStatus,
    /// Rate the trade was booked at
    pub trade_price: Price,
    /// Latest market rate for the currency pair
    pub market_price: Price,
    pub amount: Quantity,
    pub timestamp: Timestamp,
}

impl Trade {
    /// Create a new live trade with explicit timestamp
    pub fn new_with_time(
        id: TradeId,
        customer: impl Into<String>,
        currency_pair: impl Into<CurrencyPair>,
        side: Side,
        trade_price: Price,
        amount: Quantity,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id,
            customer: customer.into(),
            currency_pair: currency_pair.into(),
            side,
            status: TradeStatus::Live,
            trade_price,
            market_price: trade_price,
            amount,
            timestamp,
        }
    }

    /// Create a new live trade using current system time
    pub fn new(
        id: TradeId,
        customer: impl Into<String>,
        currency_pair: impl Into<CurrencyPair>,
        side: Side,
        trade_price: Price,
        amount: Quantity,
    ) -> Self {
        Self::new_with_time(
            id,
            customer,
            currency_pair,
            side,
            trade_price,
            amount,
            Utc::now(),
        )
    }

    /// Return a copy marked to the given market price
    pub fn with_market_price(mut self, market_price: Price) -> Self {
        self.market_price = market_price;
        self
    }

    /// Return a copy with the trade closed out
    pub fn closed(mut self) -> Self {
        self.status = TradeStatus::Closed;
        self
    }

    pub fn is_live(&self) -> bool {
        self.status.is_live()
    }

    /// Distance of the market from the booked rate, in percent
    pub fn percent_from_market(&self) -> Decimal {
        if self.trade_price.is_zero() {
            return Decimal::ZERO;
        }
        ((self.market_price - self.trade_price) / self.trade_price * Decimal::ONE_HUNDRED).round_dp(4)
    }

    /// Notional value at the booked rate
    pub fn notional(&self) -> Decimal {
        self.amount * self.trade_price
    }

    /// Case-insensitive match of `needle` against currency pair or customer.
    ///
    /// `needle` must already be lowercase.
    pub fn matches_text(&self, needle: &str) -> bool {
        self.currency_pair.to_lowercase().contains(needle)
            || self.customer.to_lowercase().contains(needle)
    }
}
