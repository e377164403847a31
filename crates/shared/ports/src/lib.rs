//! Blotter Ports
//!
//! Port definitions (traits) for the live trade blotter.
//! These define the boundaries between the view pipeline and whatever
//! display layer or diagnostics sink hosts it.

mod error;
mod fault;
mod projection;

pub use error::{ProjectionError, ProjectionResult};
pub use fault::{Fault, FaultObserver};
pub use projection::{Projection, ProjectionFactory};
