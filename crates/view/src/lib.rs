//! Blotter View
//!
//! Live, filtered, sorted and paged view over a mutating trade source.
//!
//! ## Architecture
//!
//! ```text
//!  ViewParameters (display layer writes)
//!    search_text ──debounce 250ms──► FilterController ─┐
//!    sort ─────────────────────────► SortController ───┤  watch
//!    page + size ──distinct, sample 100ms──► PageController ─┤
//!                                                      ▼
//!  TradeCache ──TradeChanges──► pipeline task (WorkerContext)
//!                               Filter ► Transform ► Sort ► Page
//!                                                      │ ViewBatch
//!                                                      ▼
//!                               SinkBinder ──invoke──► ConsumptionContext
//!                                                      BoundList + PageResponse
//! ```
//!
//! Everything a view starts is tracked by one [`Teardown`]; disposing the
//! view stops control streams and the pipeline and releases every live
//! projection exactly once.

pub mod binder;
pub mod context;
pub mod controller;
pub mod controls;
pub mod error;
pub mod fault;
pub mod lifecycle;
pub mod operators;
pub mod params;
pub mod pipeline;
pub mod projection;
pub mod view;

// Re-export commonly used types
pub use binder::{BoundList, SinkBinder};
pub use context::{ConsumptionContext, ConsumptionLoop, WorkerContext};
pub use controller::{
    Controller, FilterController, FilterPredicate, PageController, SortComparer, SortController,
};
pub use error::{Result, ViewError};
pub use fault::{LogFaultObserver, RecordingFaultObserver};
pub use lifecycle::Teardown;
pub use params::{PageParameters, Property, ViewParameters};
pub use pipeline::transform::{ProjectionRegistry, TransformOptions};
pub use pipeline::{UpdatePolicy, ViewBatch};
pub use projection::{Lease, LeaseTracker, TradeProxy, TradeProxyFactory};
pub use view::{PagedTradeView, ViewContexts, ViewOptions};
