//! Blotter Feed
//!
//! Source side of the live trade blotter. Provides:
//! - Transport abstraction (tokio channels, with traits for future transports)
//! - `TradeCache`, the keyed source collection publishing atomic change sets
//! - Simulated market rates and trade flow for demos and soak tests
//!
//! ## Architecture
//!
//! ```text
//! TradeGenerator ──edit()──► TradeCache ──connect()──► ChannelSubscriber
//!   (book/mark/close)         (BTreeMap)                 snapshot, then live
//!                                                        TradeChanges batches
//! ```

pub mod cache;
pub mod error;
pub mod generator;
pub mod market;
pub mod transport;

// Re-export commonly used types
pub use cache::{CacheUpdater, TradeCache};
pub use error::{FeedError, TransportError};
pub use generator::{GeneratorConfig, TickSummary, TradeGenerator};
pub use market::{CurrencyPairConfig, MarketPrices};
pub use transport::{
    Publisher, Subscriber,
    channel::{ChannelPublisher, ChannelSubscriber},
};
