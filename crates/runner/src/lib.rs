//! Blotter Runner - live trade blotter session
//!
//! Orchestrates the full blotter:
//!
//! - **Config**: JSON configuration for view, trade flow and control script
//! - **Session**: wires the simulated trade flow, cache and paged view, and
//!   reports page snapshots until stopped
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────┐   edit()    ┌──────────────┐  connect()
//!   │  TradeGenerator  │ ──────────► │  TradeCache  │ ───────────┐
//!   │ (book/mark/close)│             └──────────────┘            │
//!   └──────────────────┘                                         ▼
//!                                                   ┌──────────────────────┐
//!   ScriptStep ──► ViewParameters ─── controls ───► │   PagedTradeView     │
//!                  (search/sort/page)               │ filter/sort/page     │
//!                                                   └──────────┬───────────┘
//!                                                              │ batches
//!                                                              ▼
//!                                                   ConsumptionLoop ─► BoundList
//!                                                                       │
//!                                                   PageSnapshot ◄──────┘ (logged)
//! ```

pub mod config;
pub mod session;

// Re-export main types
pub use config::{BlotterConfig, ConfigError, ScriptStep};
pub use session::{BlotterSession, PageSnapshot, SessionError, SessionSummary, TradeRow};
