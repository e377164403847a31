//! Error types for the feed crate

use thiserror::Error;

/// Transport-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Send failed: {0}")]
    Send(String),

    #[error("Channel closed")]
    ChannelClosed,
}

/// Feed-level errors (configuration and simulation)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Invalid generator configuration: {0}")]
    InvalidConfig(String),
}
