//! Filter stage
//!
//! Remembers every source trade so the predicate can be replaced at any
//! time, and tracks which keys currently pass. Output is a keyed change set
//! over the members only.

use super::UpdatePolicy;
use crate::controller::FilterPredicate;
use blotter_core::{Change, Trade, TradeChanges, TradeId};
use std::collections::{BTreeMap, HashSet};

pub struct FilterStage {
    known: BTreeMap<TradeId, Trade>,
    members: HashSet<TradeId>,
    policy: UpdatePolicy,
}

impl FilterStage {
    pub fn new(policy: UpdatePolicy) -> Self {
        Self {
            known: BTreeMap::new(),
            members: HashSet::new(),
            policy,
        }
    }

    /// Number of trades passing the current predicate
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_member(&self, id: TradeId) -> bool {
        self.members.contains(&id)
    }

    pub fn known(&self) -> usize {
        self.known.len()
    }

    pub fn apply_source(&mut self, changes: TradeChanges, predicate: &FilterPredicate) -> TradeChanges {
        let mut out = TradeChanges::with_capacity(changes.len());

        for change in changes {
            match change {
                Change::Add { key, current } => {
                    let previous = self.known.insert(key, current.clone());
                    let passes = predicate.matches(&current);
                    self.transition(key, passes, current, previous, &mut out);
                }
                Change::Update {
                    key,
                    current,
                    previous,
                } => {
                    self.known.insert(key, current.clone());
                    match self.policy {
                        UpdatePolicy::Reevaluate => {
                            let passes = predicate.matches(&current);
                            self.transition(key, passes, current, Some(previous), &mut out);
                        }
                        UpdatePolicy::RefreshOnly => {
                            if self.members.contains(&key) {
                                out.update(key, current, previous);
                            }
                        }
                    }
                }
                Change::Remove { key, current } => {
                    self.known.remove(&key);
                    if self.members.remove(&key) {
                        out.remove(key, current);
                    }
                }
                Change::Refresh { key, current } => {
                    self.known.insert(key, current.clone());
                    let was = self.members.contains(&key);
                    let passes = predicate.matches(&current);
                    match (was, passes) {
                        (true, true) => out.refresh(key, current),
                        _ => self.transition(key, passes, current, None, &mut out),
                    }
                }
            }
        }
        out
    }

    /// Re-evaluate every known trade against a new predicate
    pub fn apply_predicate(&mut self, predicate: &FilterPredicate) -> TradeChanges {
        let mut out = TradeChanges::new();
        for (key, trade) in &self.known {
            let was = self.members.contains(key);
            let passes = predicate.matches(trade);
            if passes && !was {
                self.members.insert(*key);
                out.add(*key, trade.clone());
            } else if !passes && was {
                self.members.remove(key);
                out.remove(*key, trade.clone());
            }
        }
        out
    }

    fn transition(
        &mut self,
        key: TradeId,
        passes: bool,
        current: Trade,
        previous: Option<Trade>,
        out: &mut TradeChanges,
    ) {
        let was = self.members.contains(&key);
        match (was, passes) {
            (true, true) => {
                let previous = previous.unwrap_or_else(|| current.clone());
                out.update(key, current, previous);
            }
            (false, true) => {
                self.members.insert(key);
                out.add(key, current);
            }
            (true, false) => {
                self.members.remove(&key);
                out.remove(key, current);
            }
            (false, false) => {}
        }
    }
}
