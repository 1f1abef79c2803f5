//! Linear undo/redo history of item-list snapshots.

use crate::items::{ItemList, Mutation};

/// Default number of snapshots kept.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Snapshot log with a cursor.
///
/// `entries[index]` is the state currently on screen. Snapshots share
/// structure with the live list, so recording is cheap.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    entries: Vec<ItemList>,
    index: usize,
    max_entries: usize,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(ItemList::new())
    }
}

impl HistoryLog {
    pub fn new(initial: ItemList) -> Self {
        Self::with_capacity(initial, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_capacity(initial: ItemList, max_entries: usize) -> Self {
        Self {
            entries: vec![initial],
            index: 0,
            max_entries: max_entries.max(1),
        }
    }

    /// Record a new snapshot, discarding any redo branch.
    pub fn record(&mut self, snapshot: ItemList) {
        self.entries.truncate(self.index + 1);
        self.entries.push(snapshot);
        self.index += 1;

        if self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.max_entries;
            self.entries.drain(..excess);
            self.index -= excess;
        }
    }

    /// Step back. At the first entry this is a no-op and returns it.
    pub fn undo(&mut self) -> &ItemList {
        self.index = self.index.saturating_sub(1);
        self.current()
    }

    /// Step forward. At the last entry this is a no-op and returns it.
    pub fn redo(&mut self) -> &ItemList {
        if self.index + 1 < self.entries.len() {
            self.index += 1;
        }
        self.current()
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    pub fn current(&self) -> &ItemList {
        &self.entries[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply a collaborator's mutation to every snapshot, so that stepping
    /// through history only revisits local changes.
    pub fn rebase(&mut self, mutation: &Mutation) {
        for entry in &mut self.entries {
            *entry = entry.apply(mutation);
        }
    }

    /// Drop all entries and start over from `initial`.
    pub fn reset(&mut self, initial: ItemList) {
        self.entries.clear();
        self.entries.push(initial);
        self.index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::{ItemKind, SceneItem, ShapeKind};
    use kurbo::Point;

    fn with_shapes(n: usize) -> Vec<ItemList> {
        let mut lists = vec![ItemList::new()];
        for i in 0..n {
            let item = SceneItem::new(
                ItemKind::shape(ShapeKind::Rectangle),
                Point::new(i as f64 * 10.0, 0.0),
            );
            let next = lists[i].add_item(item);
            lists.push(next);
        }
        lists
    }

    #[test]
    fn test_n_records_then_n_undos_restore_original() {
        let lists = with_shapes(5);
        let mut history = HistoryLog::new(lists[0].clone());
        for list in &lists[1..] {
            history.record(list.clone());
        }
        for _ in 0..5 {
            history.undo();
        }
        assert_eq!(history.current(), &lists[0]);
        assert!(!history.can_undo());
    }

    #[test]
    fn test_undo_then_redo_restores() {
        let lists = with_shapes(2);
        let mut history = HistoryLog::new(lists[0].clone());
        history.record(lists[1].clone());
        history.record(lists[2].clone());

        history.undo();
        assert_eq!(history.redo(), &lists[2]);
    }

    #[test]
    fn test_boundaries_are_noops() {
        let lists = with_shapes(1);
        let mut history = HistoryLog::new(lists[0].clone());
        assert_eq!(history.undo(), &lists[0]);
        assert_eq!(history.index(), 0);

        history.record(lists[1].clone());
        assert_eq!(history.redo(), &lists[1]);
        assert_eq!(history.index(), 1);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_record_truncates_redo_branch() {
        let lists = with_shapes(3);
        let mut history = HistoryLog::new(lists[0].clone());
        history.record(lists[1].clone());
        history.record(lists[2].clone());
        history.undo();
        history.record(lists[3].clone());

        assert_eq!(history.len(), 3);
        assert!(!history.can_redo());
        assert_eq!(history.current(), &lists[3]);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let lists = with_shapes(5);
        let mut history = HistoryLog::with_capacity(lists[0].clone(), 3);
        for list in &lists[1..] {
            history.record(list.clone());
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.index(), 2);
        history.undo();
        history.undo();
        assert_eq!(history.current(), &lists[3]);
        assert!(!history.can_undo());
    }

    #[test]
    fn test_rebase_keeps_remote_changes_across_undo() {
        let lists = with_shapes(1);
        let mut history = HistoryLog::new(lists[0].clone());
        history.record(lists[1].clone());

        let remote = SceneItem::new(ItemKind::text("theirs"), Point::new(0.0, 100.0));
        let added = Mutation::Added {
            item: remote.clone(),
        };
        history.rebase(&added);

        assert_eq!(history.current(), &lists[1].apply(&added));
        let undone = history.undo().clone();
        assert!(undone.contains(remote.id()));
        assert_eq!(undone.len(), 1);

        history.rebase(&Mutation::Removed { id: remote.id() });
        assert!(history.current().is_empty());
        assert!(!history.redo().contains(remote.id()));
    }

    #[test]
    fn test_reset() {
        let lists = with_shapes(2);
        let mut history = HistoryLog::new(lists[0].clone());
        history.record(lists[1].clone());
        history.reset(ItemList::new());
        assert_eq!(history.len(), 1);
        assert!(!history.can_undo());
        assert!(history.current().is_empty());
    }
}
