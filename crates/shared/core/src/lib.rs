//! Blotter Core Domain
//!
//! Pure domain types for the live trade blotter.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod changes;
pub mod entities;
pub mod paging;
pub mod sorting;
pub mod values;

// Re-export commonly used types at crate root
pub use changes::{Change, ChangeReason, ChangeSet, ListChange};
pub use entities::{Side, Trade, TradeId, TradeStatus};
pub use paging::{DEFAULT_PAGE_SIZE, PageRequest, PageResponse};
pub use sorting::{SortDirection, SortField, SortKey, SortSelection};
pub use values::{CurrencyPair, Price, Quantity, Timestamp};

/// Keyed change set of trades, as produced by the source feed
pub type TradeChanges = ChangeSet<TradeId, Trade>;
