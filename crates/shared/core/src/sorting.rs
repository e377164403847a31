//! Sort selections for the trade view
//!
//! A selection is a named list of keys. Comparisons always finish with the
//! trade identifier so the resulting order is total.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::entities::Trade;

/// Trade field a view can be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortField {
    Id,
    Customer,
    CurrencyPair,
    Side,
    Status,
    TradePrice,
    MarketPrice,
    PercentFromMarket,
    Amount,
    Timestamp,
}

impl SortField {
    /// Compare two trades on this field only
    pub fn compare(&self, a: &Trade, b: &Trade) -> Ordering {
        match self {
            SortField::Id => a.id.cmp(&b.id),
            SortField::Customer => a.customer.cmp(&b.customer),
            SortField::CurrencyPair => a.currency_pair.cmp(&b.currency_pair),
            SortField::Side => a.side.cmp(&b.side),
            SortField::Status => a.status.cmp(&b.status),
            SortField::TradePrice => a.trade_price.cmp(&b.trade_price),
            SortField::MarketPrice => a.market_price.cmp(&b.market_price),
            SortField::PercentFromMarket => a.percent_from_market().cmp(&b.percent_from_market()),
            SortField::Amount => a.amount.cmp(&b.amount),
            SortField::Timestamp => a.timestamp.cmp(&b.timestamp),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// One level of a sort selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn ascending(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Descending,
        }
    }

    pub fn compare(&self, a: &Trade, b: &Trade) -> Ordering {
        let ordering = self.field.compare(a, b);
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// Named sort selection as chosen in the parameter store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSelection {
    pub name: String,
    pub keys: Vec<SortKey>,
}

impl SortSelection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: Vec::new(),
        }
    }

    pub fn then_by(mut self, field: SortField) -> Self {
        self.keys.push(SortKey::ascending(field));
        self
    }

    pub fn then_by_descending(mut self, field: SortField) -> Self {
        self.keys.push(SortKey::descending(field));
        self
    }

    /// A selection is well formed when it has at least one key and no field repeats
    pub fn is_well_formed(&self) -> bool {
        if self.keys.is_empty() {
            return false;
        }
        self.keys
            .iter()
            .enumerate()
            .all(|(i, key)| self.keys[..i].iter().all(|k| k.field != key.field))
    }

    /// Compare by the selection keys, then by identifier
    pub fn compare(&self, a: &Trade, b: &Trade) -> Ordering {
        self.keys
            .iter()
            .map(|key| key.compare(a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a.id.cmp(&b.id))
    }

    pub fn by_id() -> Self {
        Self::new("Identifier").then_by(SortField::Id)
    }

    pub fn customer_then_pair() -> Self {
        Self::new("Customer, Currency Pair")
            .then_by(SortField::Customer)
            .then_by(SortField::CurrencyPair)
    }

    pub fn pair_then_amount() -> Self {
        Self::new("Currency Pair, Amount")
            .then_by(SortField::CurrencyPair)
            .then_by_descending(SortField::Amount)
    }

    pub fn recent_first() -> Self {
        Self::new("Recent Trades")
            .then_by_descending(SortField::Timestamp)
            .then_by(SortField::Customer)
    }

    /// Selections offered to the user
    pub fn presets() -> Vec<SortSelection> {
        vec![
            Self::customer_then_pair(),
            Self::pair_then_amount(),
            Self::recent_first(),
            Self::by_id(),
        ]
    }

    /// Look up a preset by name
    pub fn preset(name: &str) -> Option<SortSelection> {
        Self::presets().into_iter().find(|s| s.name == name)
    }
}

impl Default for SortSelection {
    fn default() -> Self {
        Self::customer_then_pair()
    }
}
