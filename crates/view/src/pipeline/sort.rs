//! Sort stage
//!
//! Keeps the filtered projections ordered by the current comparer. Each
//! entry remembers the trade value it was positioned with, so lookups stay
//! a binary search even when the latest value would sort elsewhere.

use super::{Projected, UpdatePolicy};
use crate::controller::SortComparer;
use blotter_core::{Change, Trade, TradeId};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::ops::Range;

struct Entry<P> {
    /// Value the entry is currently positioned by
    positioned: Trade,
    projected: Projected<P>,
}

pub struct SortStage<P> {
    comparer: SortComparer,
    policy: UpdatePolicy,
    entries: Vec<Entry<P>>,
    positions: HashMap<TradeId, Trade>,
}

impl<P> SortStage<P> {
    pub fn new(comparer: SortComparer, policy: UpdatePolicy) -> Self {
        Self {
            comparer,
            policy,
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn comparer(&self) -> &SortComparer {
        &self.comparer
    }

    pub fn range(&self, range: Range<usize>) -> impl Iterator<Item = &Projected<P>> {
        self.entries[range].iter().map(|e| &e.projected)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Projected<P>> {
        self.entries.iter().map(|e| &e.projected)
    }

    /// Apply keyed changes; returns the keys whose values changed in place
    pub fn apply(&mut self, changes: Vec<Change<TradeId, Projected<P>>>) -> HashSet<TradeId> {
        let mut touched = HashSet::new();

        for change in changes {
            match change {
                Change::Add { key, current } => {
                    self.take(key);
                    self.insert(current);
                }
                Change::Update { key, current, .. } => {
                    let Some(index) = self.index_of(key) else {
                        self.insert(current);
                        continue;
                    };
                    touched.insert(key);
                    match self.policy {
                        UpdatePolicy::Reevaluate => {
                            let entry = &self.entries[index];
                            if self.comparer.compare(&entry.positioned, &current.trade) == Ordering::Equal {
                                self.positions.insert(key, current.trade.clone());
                                self.entries[index] = Entry {
                                    positioned: current.trade.clone(),
                                    projected: current,
                                };
                            } else {
                                self.take(key);
                                self.insert(current);
                            }
                        }
                        UpdatePolicy::RefreshOnly => {
                            self.entries[index].projected = current;
                        }
                    }
                }
                Change::Remove { key, .. } => {
                    self.take(key);
                    touched.remove(&key);
                }
                Change::Refresh { key, current } => {
                    self.take(key);
                    self.insert(current);
                    touched.insert(key);
                }
            }
        }
        touched
    }

    /// Replace the comparer and re-sort everything by latest values
    pub fn set_comparer(&mut self, comparer: SortComparer) {
        self.comparer = comparer;
        for entry in &mut self.entries {
            entry.positioned = entry.projected.trade.clone();
            self.positions.insert(entry.positioned.id, entry.positioned.clone());
        }
        let comparer = &self.comparer;
        self.entries
            .sort_by(|a, b| comparer.compare(&a.positioned, &b.positioned));
    }

    fn index_of(&self, key: TradeId) -> Option<usize> {
        let positioned = self.positions.get(&key)?;
        self.entries
            .binary_search_by(|e| self.comparer.compare(&e.positioned, positioned))
            .ok()
    }

    fn take(&mut self, key: TradeId) -> Option<Projected<P>> {
        let index = self.index_of(key)?;
        self.positions.remove(&key);
        Some(self.entries.remove(index).projected)
    }

    fn insert(&mut self, projected: Projected<P>) {
        let positioned = projected.trade.clone();
        let index = self
            .entries
            .partition_point(|e| self.comparer.compare(&e.positioned, &positioned) == Ordering::Less);
        self.positions.insert(positioned.id, positioned.clone());
        self.entries.insert(
            index,
            Entry {
                positioned,
                projected,
            },
        );
    }
}
