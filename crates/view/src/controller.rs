//! Controllers
//!
//! A controller holds the value currently in effect for one stage of the
//! pipeline. Every `change` replaces the previous value and the pipeline
//! re-evaluates against the newest one only.

use crate::error::{Result, ViewError};
use blotter_core::{PageRequest, SortSelection, Trade};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use tokio::sync::watch;

/// Last-writer-wins cell observed by the pipeline
pub struct Controller<T> {
    name: &'static str,
    tx: watch::Sender<T>,
    applied: AtomicU64,
}

pub type FilterController = Controller<FilterPredicate>;
pub type SortController = Controller<SortComparer>;
pub type PageController = Controller<PageRequest>;

impl<T: Clone + fmt::Debug + Send + Sync + 'static> Controller<T> {
    pub fn new(name: &'static str, initial: T) -> Self {
        let (tx, _) = watch::channel(initial);
        Self {
            name,
            tx,
            applied: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Replace the value in effect
    pub fn change(&self, value: T) {
        log::debug!("{} controller -> {:?}", self.name, value);
        self.tx.send_replace(value);
        self.applied.fetch_add(1, AtomicOrdering::Relaxed);
    }

    pub fn current(&self) -> T {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// Number of `change` calls since construction
    pub fn applied(&self) -> u64 {
        self.applied.load(AtomicOrdering::Relaxed)
    }
}

/// Filter predicate over trades
#[derive(Clone)]
pub struct FilterPredicate {
    description: Arc<str>,
    test: Arc<dyn Fn(&Trade) -> bool + Send + Sync>,
}

impl FilterPredicate {
    /// Longest search text accepted before falling back to match-all
    pub const MAX_SEARCH_LEN: usize = 256;

    pub fn new(description: &str, test: impl Fn(&Trade) -> bool + Send + Sync + 'static) -> Self {
        Self {
            description: description.into(),
            test: Arc::new(test),
        }
    }

    /// Predicate that accepts every trade
    pub fn always() -> Self {
        Self::new("all", |_| true)
    }

    /// Case-insensitive substring match on currency pair or customer.
    ///
    /// Empty text matches everything. Over-long text or text containing
    /// control characters is rejected.
    pub fn from_search_text(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Ok(Self::always());
        }
        if text.chars().count() > Self::MAX_SEARCH_LEN {
            return Err(ViewError::InvalidSearchText(format!(
                "longer than {} characters",
                Self::MAX_SEARCH_LEN
            )));
        }
        if text.chars().any(char::is_control) {
            return Err(ViewError::InvalidSearchText(
                "contains control characters".into(),
            ));
        }

        let needle = text.to_lowercase();
        Ok(Self::new(&format!("contains '{}'", text), move |trade| {
            trade.matches_text(&needle)
        }))
    }

    pub fn matches(&self, trade: &Trade) -> bool {
        (self.test)(trade)
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl Default for FilterPredicate {
    fn default() -> Self {
        Self::always()
    }
}

impl fmt::Debug for FilterPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FilterPredicate")
            .field(&self.description)
            .finish()
    }
}

/// Total order over trades built from a sort selection
#[derive(Debug, Clone, PartialEq)]
pub struct SortComparer {
    selection: Arc<SortSelection>,
}

impl SortComparer {
    pub fn try_from_selection(selection: &SortSelection) -> Result<Self> {
        if selection.keys.is_empty() {
            return Err(ViewError::InvalidSort {
                name: selection.name.clone(),
                reason: "no sort keys".into(),
            });
        }
        if !selection.is_well_formed() {
            return Err(ViewError::InvalidSort {
                name: selection.name.clone(),
                reason: "a field is used more than once".into(),
            });
        }
        Ok(Self {
            selection: Arc::new(selection.clone()),
        })
    }

    pub fn compare(&self, a: &Trade, b: &Trade) -> Ordering {
        self.selection.compare(a, b)
    }

    pub fn name(&self) -> &str {
        &self.selection.name
    }

    pub fn selection(&self) -> &SortSelection {
        &self.selection
    }
}

impl Default for SortComparer {
    fn default() -> Self {
        Self {
            selection: Arc::new(SortSelection::default()),
        }
    }
}
