use blotter_core::{Trade, TradeId};

use crate::error::ProjectionResult;

/// Port for display projections of a trade
///
/// A projection is shared between the pipeline and the bound container, so
/// all mutation goes through `&self`. Implementations must make `release`
/// idempotent: the first call frees held resources, later calls do nothing.
pub trait Projection: Send + Sync + 'static {
    /// Identity of the underlying trade
    fn id(&self) -> TradeId;

    /// Snapshot of the trade this projection currently shows
    fn trade(&self) -> Trade;

    /// Apply an update to the underlying trade in place
    fn update(&self, trade: &Trade);

    /// Free held resources
    fn release(&self);

    fn is_released(&self) -> bool;
}

/// Port for constructing projections
///
/// Called from worker threads; one call per trade entering the filtered set.
pub trait ProjectionFactory: Send + Sync + 'static {
    type Output: Projection;

    fn create(&self, trade: &Trade) -> ProjectionResult<Self::Output>;
}
