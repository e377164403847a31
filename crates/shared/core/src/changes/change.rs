use serde::{Deserialize, Serialize};

/// Why an item appears in a change set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeReason {
    Add,
    Update,
    Remove,
    Refresh,
}

/// A single keyed change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Change<K, T> {
    /// Item entered the collection
    Add { key: K, current: T },
    /// Item was replaced; `previous` is the value it replaced
    Update { key: K, current: T, previous: T },
    /// Item left the collection; `current` is its last value
    Remove { key: K, current: T },
    /// Item is unchanged but downstream operators should re-evaluate it
    Refresh { key: K, current: T },
}

impl<K, T> Change<K, T> {
    pub fn key(&self) -> &K {
        match self {
            Change::Add { key, .. }
            | Change::Update { key, .. }
            | Change::Remove { key, .. }
            | Change::Refresh { key, .. } => key,
        }
    }

    pub fn current(&self) -> &T {
        match self {
            Change::Add { current, .. }
            | Change::Update { current, .. }
            | Change::Remove { current, .. }
            | Change::Refresh { current, .. } => current,
        }
    }

    /// Previous value, only present on updates
    pub fn previous(&self) -> Option<&T> {
        match self {
            Change::Update { previous, .. } => Some(previous),
            _ => None,
        }
    }

    pub fn reason(&self) -> ChangeReason {
        match self {
            Change::Add { .. } => ChangeReason::Add,
            Change::Update { .. } => ChangeReason::Update,
            Change::Remove { .. } => ChangeReason::Remove,
            Change::Refresh { .. } => ChangeReason::Refresh,
        }
    }
}

/// Ordered batch of changes representing one atomic mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet<K, T> {
    changes: Vec<Change<K, T>>,
}

impl<K, T> Default for ChangeSet<K, T> {
    fn default() -> Self {
        Self {
            changes: Vec::new(),
        }
    }
}

impl<K, T> ChangeSet<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            changes: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, change: Change<K, T>) {
        self.changes.push(change);
    }

    pub fn add(&mut self, key: K, current: T) {
        self.changes.push(Change::Add { key, current });
    }

    pub fn update(&mut self, key: K, current: T, previous: T) {
        self.changes.push(Change::Update {
            key,
            current,
            previous,
        });
    }

    pub fn remove(&mut self, key: K, current: T) {
        self.changes.push(Change::Remove { key, current });
    }

    pub fn refresh(&mut self, key: K, current: T) {
        self.changes.push(Change::Refresh { key, current });
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Change<K, T>> {
        self.changes.iter()
    }

    /// Number of changes with the given reason
    pub fn count(&self, reason: ChangeReason) -> usize {
        self.changes.iter().filter(|c| c.reason() == reason).count()
    }

    pub fn adds(&self) -> usize {
        self.count(ChangeReason::Add)
    }

    pub fn updates(&self) -> usize {
        self.count(ChangeReason::Update)
    }

    pub fn removes(&self) -> usize {
        self.count(ChangeReason::Remove)
    }

    pub fn refreshes(&self) -> usize {
        self.count(ChangeReason::Refresh)
    }
}

impl<K, T> IntoIterator for ChangeSet<K, T> {
    type Item = Change<K, T>;
    type IntoIter = std::vec::IntoIter<Change<K, T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

impl<'a, K, T> IntoIterator for &'a ChangeSet<K, T> {
    type Item = &'a Change<K, T>;
    type IntoIter = std::slice::Iter<'a, Change<K, T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

impl<K, T> FromIterator<Change<K, T>> for ChangeSet<K, T> {
    fn from_iter<I: IntoIterator<Item = Change<K, T>>>(iter: I) -> Self {
        Self {
            changes: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_accessors() {
        let change: Change<u64, &str> = Change::Update {
            key: 7,
            current: "new",
            previous: "old",
        };
        assert_eq!(*change.key(), 7);
        assert_eq!(*change.current(), "new");
        assert_eq!(change.previous(), Some(&"old"));
        assert_eq!(change.reason(), ChangeReason::Update);
    }

    #[test]
    fn test_change_set_counts() {
        let mut changes = ChangeSet::new();
        changes.add(1u64, "a");
        changes.add(2, "b");
        changes.update(1, "a2", "a");
        changes.remove(2, "b");
        changes.refresh(1, "a2");

        assert_eq!(changes.len(), 5);
        assert_eq!(changes.adds(), 2);
        assert_eq!(changes.updates(), 1);
        assert_eq!(changes.removes(), 1);
        assert_eq!(changes.refreshes(), 1);
    }

    #[test]
    fn test_change_set_preserves_order() {
        let changes: ChangeSet<u64, u64> = (1..=3)
            .map(|i| Change::Add {
                key: i,
                current: i * 10,
            })
            .collect();
        let keys: Vec<u64> = changes.iter().map(|c| *c.key()).collect();
        assert_eq!(keys, vec![1, 2, 3]);
    }
}
