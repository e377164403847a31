//! View errors

use blotter_feed::TransportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewError {
    #[error("Execution context closed: {0}")]
    ContextClosed(String),

    #[error("Invalid search text: {0}")]
    InvalidSearchText(String),

    #[error("Invalid sort selection '{name}': {reason}")]
    InvalidSort { name: String, reason: String },

    #[error("Invalid page request: page={page}, size={size}")]
    InvalidPage { page: u32, size: u32 },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, ViewError>;
