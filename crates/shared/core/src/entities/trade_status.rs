use serde::{Deserialize, Serialize};

/// Trade lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum TradeStatus {
    /// Trade is open and still marked to market
    #[default]
    Live,
    /// Trade has been closed out
    Closed,
}

impl TradeStatus {
    pub fn is_live(&self) -> bool {
        matches!(self, TradeStatus::Live)
    }
}
