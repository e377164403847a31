use blotter_core::TradeId;
use thiserror::Error;

/// Errors raised while building or maintaining a projection
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("Projection construction failed: {0}")]
    Construction(String),

    #[error("Projection worker panicked: {0}")]
    Panicked(String),

    #[error("Resource unavailable for trade {trade_id}: {reason}")]
    ResourceUnavailable { trade_id: TradeId, reason: String },
}

pub type ProjectionResult<T> = std::result::Result<T, ProjectionError>;
