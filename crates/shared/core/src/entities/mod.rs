mod side;
mod trade;
mod trade_status;

pub use side::Side;
pub use trade::{Trade, TradeId};
pub use trade_status::TradeStatus;
