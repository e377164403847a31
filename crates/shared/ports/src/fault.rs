use blotter_core::TradeId;

use crate::error::ProjectionError;

/// A recoverable fault inside the view pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// A trade could not be projected and was left out of the batch
    Projection {
        trade_id: TradeId,
        error: ProjectionError,
    },
    /// A control value could not be applied; the named fallback is in effect
    Control { control: String, reason: String },
}

/// Port for reporting faults without failing the pipeline
pub trait FaultObserver: Send + Sync {
    fn on_fault(&self, fault: Fault);
}
