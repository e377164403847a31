/// Index-based edit of an ordered container
///
/// Changes are applied in sequence; each index refers to the container as it
/// stands after the preceding changes of the same batch.
#[derive(Debug, Clone, PartialEq)]
pub enum ListChange<T> {
    Add { index: usize, item: T },
    Remove { index: usize, item: T },
    Move { from: usize, to: usize, item: T },
    /// Item at `index` was updated in place
    Replace { index: usize, item: T },
}

impl<T> ListChange<T> {
    pub fn item(&self) -> &T {
        match self {
            ListChange::Add { item, .. }
            | ListChange::Remove { item, .. }
            | ListChange::Move { item, .. }
            | ListChange::Replace { item, .. } => item,
        }
    }

    /// Apply this change to a vector.
    ///
    /// Returns false (leaving the vector untouched) when an index is out of range.
    pub fn apply_to(self, target: &mut Vec<T>) -> bool {
        match self {
            ListChange::Add { index, item } => {
                if index > target.len() {
                    return false;
                }
                target.insert(index, item);
            }
            ListChange::Remove { index, .. } => {
                if index >= target.len() {
                    return false;
                }
                target.remove(index);
            }
            ListChange::Move { from, to, .. } => {
                if from >= target.len() || to >= target.len() {
                    return false;
                }
                let moved = target.remove(from);
                target.insert(to, moved);
            }
            ListChange::Replace { index, item } => {
                if index >= target.len() {
                    return false;
                }
                target[index] = item;
            }
        }
        true
    }
}
