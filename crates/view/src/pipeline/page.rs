//! Page stage
//!
//! Cuts the requested window out of the sorted sequence and expresses the
//! difference from the previous window as index-based list changes.

use super::sort::SortStage;
use blotter_core::{ListChange, PageRequest, PageResponse, TradeId};
use std::collections::HashSet;
use std::sync::Arc;

/// Result of recomputing the window
pub struct WindowDelta<P> {
    pub changes: Vec<ListChange<Arc<P>>>,
    pub response: PageResponse,
    pub response_changed: bool,
}

pub struct PageStage<P> {
    request: PageRequest,
    window: Vec<(TradeId, Arc<P>)>,
    last_response: Option<PageResponse>,
}

impl<P> PageStage<P> {
    pub fn new(request: PageRequest) -> Self {
        Self {
            request,
            window: Vec::new(),
            last_response: None,
        }
    }

    pub fn request(&self) -> PageRequest {
        self.request
    }

    pub fn set_request(&mut self, request: PageRequest) {
        self.request = request;
    }

    /// Projections currently in the window, in order
    pub fn window(&self) -> Vec<Arc<P>> {
        self.window.iter().map(|(_, p)| p.clone()).collect()
    }

    pub fn recompute(&mut self, sorted: &SortStage<P>, touched: &HashSet<TradeId>) -> WindowDelta<P> {
        let total = sorted.len();
        let next: Vec<(TradeId, Arc<P>)> = sorted
            .range(self.request.window(total))
            .map(|p| (p.trade.id, p.projection.clone()))
            .collect();

        let changes = diff(&self.window, &next, touched);
        let response = PageResponse::new(self.request, total);
        let response_changed = self.last_response != Some(response);

        self.window = next;
        self.last_response = Some(response);
        WindowDelta {
            changes,
            response,
            response_changed,
        }
    }
}

/// Minimal-ish edit script turning `old` into `new`.
///
/// Removes first (highest index first), then walks `new` front to back,
/// moving or adding as needed. Items that stay put but were updated (or
/// whose projection was replaced) get a `Replace`.
fn diff<P>(
    old: &[(TradeId, Arc<P>)],
    new: &[(TradeId, Arc<P>)],
    touched: &HashSet<TradeId>,
) -> Vec<ListChange<Arc<P>>> {
    let keep: HashSet<TradeId> = new.iter().map(|(k, _)| *k).collect();
    let mut working: Vec<(TradeId, Arc<P>)> = old.to_vec();
    let mut changes = Vec::new();

    for index in (0..working.len()).rev() {
        if !keep.contains(&working[index].0) {
            let (_, item) = working.remove(index);
            changes.push(ListChange::Remove { index, item });
        }
    }

    for (index, (key, item)) in new.iter().enumerate() {
        match working[index..].iter().position(|(k, _)| k == key) {
            Some(0) => {
                if !Arc::ptr_eq(&working[index].1, item) || touched.contains(key) {
                    working[index].1 = item.clone();
                    changes.push(ListChange::Replace {
                        index,
                        item: item.clone(),
                    });
                }
            }
            Some(offset) => {
                let from = index + offset;
                let (_, previous) = working.remove(from);
                working.insert(index, (*key, item.clone()));
                changes.push(ListChange::Move {
                    from,
                    to: index,
                    item: previous.clone(),
                });
                if !Arc::ptr_eq(&previous, item) || touched.contains(key) {
                    changes.push(ListChange::Replace {
                        index,
                        item: item.clone(),
                    });
                }
            }
            None => {
                working.insert(index, (*key, item.clone()));
                changes.push(ListChange::Add {
                    index,
                    item: item.clone(),
                });
            }
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(ids: &[TradeId], pool: &[Arc<TradeId>]) -> Vec<(TradeId, Arc<TradeId>)> {
        ids.iter()
            .map(|id| (*id, pool[*id as usize].clone()))
            .collect()
    }

    fn replay(old: &[(TradeId, Arc<TradeId>)], changes: Vec<ListChange<Arc<TradeId>>>) -> Vec<TradeId> {
        let mut items: Vec<Arc<TradeId>> = old.iter().map(|(_, p)| p.clone()).collect();
        for change in changes {
            assert!(change.apply_to(&mut items));
        }
        items.iter().map(|p| **p).collect()
    }

    fn pool() -> Vec<Arc<TradeId>> {
        (0..30).map(Arc::new).collect()
    }

    #[test]
    fn test_diff_replays_to_target() {
        let pool = pool();
        let cases: Vec<(Vec<TradeId>, Vec<TradeId>)> = vec![
            (vec![], vec![1, 2, 3]),
            (vec![1, 2, 3], vec![]),
            (vec![1, 2, 3, 4], vec![2, 3, 4, 5]),
            (vec![1, 2, 3], vec![3, 1, 2]),
            (vec![5, 4, 3, 2, 1], vec![1, 2, 3, 4, 5]),
            (vec![1, 7, 3, 9], vec![9, 8, 1, 2]),
        ];
        for (from, to) in cases {
            let old = window(&from, &pool);
            let new = window(&to, &pool);
            let changes = diff(&old, &new, &HashSet::new());
            assert_eq!(replay(&old, changes), to, "{:?} -> {:?}", from, to);
        }
    }

    #[test]
    fn test_shift_by_one_is_one_remove_one_add() {
        let pool = pool();
        let old = window(&[1, 2, 3, 4], &pool);
        let new = window(&[2, 3, 4, 5], &pool);
        let changes = diff(&old, &new, &HashSet::new());
        assert_eq!(changes.len(), 2);
        assert!(matches!(changes[0], ListChange::Remove { index: 0, .. }));
        assert!(matches!(changes[1], ListChange::Add { index: 3, .. }));
    }

    #[test]
    fn test_touched_items_are_replaced() {
        let pool = pool();
        let old = window(&[1, 2], &pool);
        let touched: HashSet<TradeId> = [2].into_iter().collect();
        let changes = diff(&old, &old.clone(), &touched);
        assert_eq!(changes.len(), 1);
        assert!(matches!(changes[0], ListChange::Replace { index: 1, .. }));
    }

    #[test]
    fn test_replaced_projection_is_swapped() {
        let pool = pool();
        let old = window(&[1, 2], &pool);
        let mut new = old.clone();
        new[0].1 = Arc::new(1);
        let changes = diff(&old, &new, &HashSet::new());
        let items = {
            let mut items: Vec<Arc<TradeId>> = old.iter().map(|(_, p)| p.clone()).collect();
            for change in changes {
                change.apply_to(&mut items);
            }
            items
        };
        assert!(Arc::ptr_eq(&items[0], &new[0].1));
    }
}
