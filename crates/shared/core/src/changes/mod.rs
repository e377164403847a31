//! Change notifications
//!
//! Keyed change sets describe one atomic batch of mutations of a source
//! collection. List changes describe index-based edits of an ordered
//! container, which is what a paged window emits.

mod change;
mod list;

pub use change::{Change, ChangeReason, ChangeSet};
pub use list::ListChange;
