//! Linear undo/redo history of workflow snapshots.
//!
//! Snapshots are owned copies of the workflow, so history never aliases the
//! live graph. The manager only hands snapshots back; restoring them is the
//! store's job.

use crate::definition::Workflow;
use crate::store::ChangeKind;
use std::collections::VecDeque;

/// Default number of undo steps retained.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Recording state of the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryState {
    /// Nothing to undo or redo.
    Empty,
    /// At least one undo or redo step is available.
    Recording,
}

/// An immutable copy of the workflow at a point in time.
#[derive(Debug, Clone)]
pub struct HistorySnapshot {
    /// The mutation that followed this snapshot.
    pub cause: ChangeKind,
    pub workflow: Workflow,
}

/// Bounded undo/redo stacks.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    undo: VecDeque<HistorySnapshot>,
    redo: Vec<HistorySnapshot>,
    limit: usize,
    record_moves: bool,
}

impl HistoryManager {
    /// Creates an empty history retaining at most `limit` undo steps.
    #[must_use]
    pub fn new(limit: usize, record_moves: bool) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit,
            record_moves,
        }
    }

    /// Returns true if a mutation of this kind gets an undo step.
    #[must_use]
    pub fn records(&self, kind: ChangeKind) -> bool {
        match kind {
            ChangeKind::NodeMoved => self.record_moves,
            ChangeKind::Restored => false,
            _ => true,
        }
    }

    /// Records the workflow as it was before a mutation.
    ///
    /// Clears the redo stack and evicts the oldest entries beyond the limit.
    pub fn record(&mut self, before: Workflow, cause: ChangeKind) {
        if !self.records(cause) {
            return;
        }
        self.redo.clear();
        self.undo.push_back(HistorySnapshot {
            cause,
            workflow: before,
        });
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
    }

    /// Steps back one snapshot.
    ///
    /// `current` is parked on the redo stack. Returns `None` (a no-op) when
    /// there is nothing to undo.
    pub fn undo(&mut self, current: Workflow) -> Option<HistorySnapshot> {
        let snapshot = self.undo.pop_back()?;
        self.redo.push(HistorySnapshot {
            cause: snapshot.cause,
            workflow: current,
        });
        Some(snapshot)
    }

    /// Steps forward one snapshot. Symmetric to [`undo`](Self::undo).
    pub fn redo(&mut self, current: Workflow) -> Option<HistorySnapshot> {
        let snapshot = self.redo.pop()?;
        self.undo.push_back(HistorySnapshot {
            cause: snapshot.cause,
            workflow: current,
        });
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
        Some(snapshot)
    }

    #[must_use]
    pub fn state(&self) -> HistoryState {
        if self.undo.is_empty() && self.redo.is_empty() {
            HistoryState::Empty
        } else {
            HistoryState::Recording
        }
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    /// Drops every snapshot.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> Workflow {
        Workflow::new(name)
    }

    #[test]
    fn starts_empty() {
        let history = HistoryManager::default();
        assert_eq!(history.state(), HistoryState::Empty);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn undo_on_empty_is_noop() {
        let mut history = HistoryManager::default();
        assert!(history.undo(named("current")).is_none());
        assert_eq!(history.redo_depth(), 0);
    }

    #[test]
    fn undo_then_redo_swaps_snapshots() {
        let mut history = HistoryManager::default();
        history.record(named("before"), ChangeKind::NodeAdded);
        assert_eq!(history.state(), HistoryState::Recording);

        let restored = history.undo(named("after")).expect("undo step");
        assert_eq!(restored.workflow.name(), "before");
        assert!(history.can_redo());

        let replayed = history.redo(named("before")).expect("redo step");
        assert_eq!(replayed.workflow.name(), "after");
        assert_eq!(history.undo_depth(), 1);
        assert_eq!(history.redo_depth(), 0);
    }

    #[test]
    fn new_mutation_clears_redo() {
        let mut history = HistoryManager::default();
        history.record(named("one"), ChangeKind::NodeAdded);
        history.undo(named("two"));
        assert!(history.can_redo());

        history.record(named("one"), ChangeKind::EdgeAdded);
        assert!(!history.can_redo());
    }

    #[test]
    fn evicts_oldest_beyond_limit() {
        let mut history = HistoryManager::new(2, true);
        history.record(named("a"), ChangeKind::NodeAdded);
        history.record(named("b"), ChangeKind::NodeAdded);
        history.record(named("c"), ChangeKind::NodeAdded);
        assert_eq!(history.undo_depth(), 2);

        let first = history.undo(named("d")).expect("undo");
        let second = history.undo(first.workflow.clone()).expect("undo");
        assert_eq!(first.workflow.name(), "c");
        assert_eq!(second.workflow.name(), "b");
        assert!(history.undo(second.workflow).is_none());
    }

    #[test]
    fn clear_returns_to_empty() {
        let mut history = HistoryManager::default();
        history.record(named("a"), ChangeKind::NodeAdded);
        history.undo(named("b"));
        history.clear();
        assert_eq!(history.state(), HistoryState::Empty);
        assert!(!history.can_redo());
    }

    #[test]
    fn moves_are_skipped_when_not_recorded() {
        let mut history = HistoryManager::new(10, false);
        history.record(named("a"), ChangeKind::NodeMoved);
        assert_eq!(history.state(), HistoryState::Empty);

        history.record(named("a"), ChangeKind::NodeConfigured);
        assert_eq!(history.undo_depth(), 1);
    }
}
