//! The graph store: sole owner and mutator of the live workflow.
//!
//! Every mutation goes through [`GraphStore::commit`], which snapshots the
//! prior workflow into history, bumps the revision for semantic changes,
//! refreshes the dirty flag and notifies listeners. A rejected mutation
//! leaves the workflow untouched.

use crate::config::EditorConfig;
use crate::definition::Workflow;
use crate::edge::Edge;
use crate::error::{GraphError, Invariant};
use crate::history::HistoryManager;
use crate::node::{Node, NodeConfig, NodeKind, NodeType, Position, ValidationStatus};
use crate::validation;
use pathway_core::{EdgeId, NodeId, WorkflowId};
use rootcause::Report;
use std::fmt;

/// The kind of a committed change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    NodeAdded,
    NodeConfigured,
    NodeMoved,
    NodeDeleted,
    EdgeAdded,
    EdgeDeleted,
    Renamed,
    EnabledChanged,
    /// Undo or redo replaced the workflow with a snapshot.
    Restored,
}

impl ChangeKind {
    /// Returns true if the change alters what the workflow does.
    ///
    /// Moves are layout only; restores carry their snapshot's revision.
    #[must_use]
    pub fn is_semantic(self) -> bool {
        !matches!(self, Self::NodeMoved | Self::Restored)
    }
}

/// Notification sent to listeners after each committed change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphChange {
    pub kind: ChangeKind,
    pub revision: u64,
    pub dirty: bool,
}

type Listener = Box<dyn FnMut(&GraphChange)>;

/// Owns the live workflow of one editing session.
pub struct GraphStore {
    workflow: Workflow,
    history: HistoryManager,
    last_revision: u64,
    last_stamp: u64,
    persisted_stamp: Option<u64>,
    listeners: Vec<Listener>,
}

impl fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphStore")
            .field("workflow", &self.workflow)
            .field("history", &self.history)
            .field("persisted_stamp", &self.persisted_stamp)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl GraphStore {
    /// Opens a fresh workflow holding one default Trigger at the origin.
    #[must_use]
    pub fn new_workflow(name: impl Into<String>, config: &EditorConfig) -> Self {
        let mut workflow = Workflow::new(name);
        workflow
            .graph
            .add_node(Node::new(config.trigger_type(), Position::default()));

        let mut store = Self::with_workflow(workflow, config);
        store.workflow.stamp = store.next_stamp();
        store.refresh_dirty();
        store
    }

    /// Opens a workflow loaded from persistence. The result is clean.
    #[must_use]
    pub fn from_loaded(workflow: Workflow, config: &EditorConfig) -> Self {
        let mut store = Self::with_workflow(workflow, config);
        let stamp = store.next_stamp();
        store.workflow.stamp = stamp;
        store.persisted_stamp = Some(stamp);
        store.refresh_dirty();
        store
    }

    fn with_workflow(workflow: Workflow, config: &EditorConfig) -> Self {
        Self {
            last_revision: workflow.revision,
            last_stamp: workflow.stamp,
            workflow,
            history: HistoryManager::new(config.history_limit, config.record_moves),
            persisted_stamp: None,
            listeners: Vec::new(),
        }
    }

    /// Read-only view of the live workflow.
    #[must_use]
    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    /// Owned copy of the live workflow.
    #[must_use]
    pub fn snapshot(&self) -> Workflow {
        self.workflow.clone()
    }

    #[must_use]
    pub fn workflow_id(&self) -> WorkflowId {
        self.workflow.id
    }

    #[must_use]
    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    /// Registers a listener called after every committed change.
    pub fn subscribe(&mut self, listener: impl FnMut(&GraphChange) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Adds a node with an empty config.
    ///
    /// A non-finite position is accepted here but blocks saving until the
    /// node is moved.
    pub fn add_node(&mut self, node_type: NodeType, position: Position) -> NodeId {
        let node = Node::new(node_type, position);
        let node_id = node.id;
        let added = self.commit(ChangeKind::NodeAdded, |workflow| {
            Ok(workflow.graph.add_node(node))
        });
        debug_assert!(added.is_ok());
        tracing::debug!(node_id = %node_id, node_type = %node_type, "Node added");
        node_id
    }

    /// Merges fields into a node's config and revalidates it.
    ///
    /// A `null` value removes the key. Returns the node's new status.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if the node is absent.
    pub fn update_node_config(
        &mut self,
        node_id: NodeId,
        partial: NodeConfig,
    ) -> Result<ValidationStatus, Report<GraphError>> {
        self.commit(ChangeKind::NodeConfigured, |workflow| {
            let node = workflow
                .graph
                .node_mut(node_id)
                .ok_or(GraphError::NodeNotFound { node_id })?;
            node.merge_config(partial);
            Ok(node.status().clone())
        })
    }

    /// Moves a node on the canvas.
    ///
    /// Layout only: validity and revision are unaffected.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if the node is absent, or `InvalidPosition`
    /// if either coordinate is NaN or infinite.
    pub fn move_node(
        &mut self,
        node_id: NodeId,
        position: Position,
    ) -> Result<(), Report<GraphError>> {
        self.commit(ChangeKind::NodeMoved, |workflow| {
            let node = workflow
                .graph
                .node_mut(node_id)
                .ok_or(GraphError::NodeNotFound { node_id })?;
            if !position.is_finite() {
                return Err(GraphError::InvalidPosition { node_id });
            }
            node.position = position;
            Ok(())
        })
    }

    /// Connects two nodes after validating the edge.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` for a missing endpoint or `InvalidEdge` when
    /// the edge breaks a structural rule.
    pub fn connect(
        &mut self,
        from: NodeId,
        to: NodeId,
        label: Option<&str>,
    ) -> Result<EdgeId, Report<GraphError>> {
        self.commit(ChangeKind::EdgeAdded, |workflow| {
            validation::can_connect(&workflow.graph, from, to, label)?;
            workflow
                .graph
                .insert_edge(Edge::new(from, to, label.map(str::to_string)))
        })
    }

    /// Deletes a node and its incident edges.
    ///
    /// Returns the IDs of the edges removed with it.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if the node is absent, or
    /// `InvariantViolation` if it is the last Trigger.
    pub fn delete_node(&mut self, node_id: NodeId) -> Result<Vec<EdgeId>, Report<GraphError>> {
        self.commit(ChangeKind::NodeDeleted, |workflow| {
            let node = workflow
                .graph
                .node(node_id)
                .ok_or(GraphError::NodeNotFound { node_id })?;
            if node.kind() == NodeKind::Trigger && workflow.graph.trigger_count() == 1 {
                return Err(GraphError::InvariantViolation {
                    invariant: Invariant::LastTrigger,
                });
            }
            let (_, removed) = workflow
                .graph
                .remove_node(node_id)
                .ok_or(GraphError::NodeNotFound { node_id })?;
            Ok(removed.into_iter().map(|edge| edge.id).collect())
        })
    }

    /// Deletes one edge.
    ///
    /// # Errors
    ///
    /// Returns `EdgeNotFound` if the edge is absent.
    pub fn delete_edge(&mut self, edge_id: EdgeId) -> Result<(), Report<GraphError>> {
        self.commit(ChangeKind::EdgeDeleted, |workflow| {
            workflow
                .graph
                .remove_edge(edge_id)
                .map(|_| ())
                .ok_or(GraphError::EdgeNotFound { edge_id })
        })
    }

    /// Renames the workflow.
    pub fn rename(&mut self, name: impl Into<String>) {
        let name = name.into();
        let renamed = self.commit(ChangeKind::Renamed, |workflow| {
            workflow.name = name;
            Ok(())
        });
        debug_assert!(renamed.is_ok());
    }

    /// Enables or disables the workflow.
    pub fn set_enabled(&mut self, enabled: bool) {
        let changed = self.commit(ChangeKind::EnabledChanged, |workflow| {
            workflow.enabled = enabled;
            Ok(())
        });
        debug_assert!(changed.is_ok());
    }

    /// Undoes the last recorded change. Returns false if there was none.
    pub fn undo(&mut self) -> bool {
        let current = self.workflow.clone();
        match self.history.undo(current) {
            Some(snapshot) => {
                tracing::debug!(cause = ?snapshot.cause, "Undo");
                self.restore(snapshot.workflow);
                true
            }
            None => false,
        }
    }

    /// Redoes the last undone change. Returns false if there was none.
    pub fn redo(&mut self) -> bool {
        let current = self.workflow.clone();
        match self.history.redo(current) {
            Some(snapshot) => {
                tracing::debug!(cause = ?snapshot.cause, "Redo");
                self.restore(snapshot.workflow);
                true
            }
            None => false,
        }
    }

    /// Replaces the workflow content with a snapshot.
    ///
    /// The persisted version is kept: history never rewinds what storage holds.
    fn restore(&mut self, snapshot: Workflow) {
        let version = self.workflow.version;
        self.workflow = snapshot;
        self.workflow.version = version;
        self.refresh_dirty();
        self.notify(ChangeKind::Restored);
    }

    /// Stamp identifying the current content, used to detect later edits.
    pub(crate) fn content_stamp(&self) -> u64 {
        self.workflow.stamp
    }

    /// Records that the content with `stamp` was persisted as `version`.
    pub(crate) fn mark_persisted(&mut self, stamp: u64, version: u64) {
        self.persisted_stamp = Some(stamp);
        self.workflow.version = version;
        self.refresh_dirty();
    }

    fn commit<T>(
        &mut self,
        kind: ChangeKind,
        mutate: impl FnOnce(&mut Workflow) -> Result<T, GraphError>,
    ) -> Result<T, Report<GraphError>> {
        let before = self.workflow.clone();
        let value = match mutate(&mut self.workflow) {
            Ok(value) => value,
            Err(err) => {
                if err.is_not_found() {
                    tracing::warn!(change = ?kind, error = %err, "Mutation referenced a missing element");
                } else {
                    tracing::debug!(change = ?kind, error = %err, "Mutation rejected");
                }
                return Err(err.into());
            }
        };

        self.history.record(before, kind);
        if kind.is_semantic() {
            self.last_revision += 1;
            self.workflow.revision = self.last_revision;
        }
        self.workflow.stamp = self.next_stamp();
        self.refresh_dirty();
        self.notify(kind);
        Ok(value)
    }

    fn next_stamp(&mut self) -> u64 {
        self.last_stamp += 1;
        self.last_stamp
    }

    fn refresh_dirty(&mut self) {
        self.workflow.dirty = self.persisted_stamp != Some(self.workflow.stamp);
    }

    fn notify(&mut self, kind: ChangeKind) {
        let change = GraphChange {
            kind,
            revision: self.workflow.revision,
            dirty: self.workflow.dirty,
        };
        for listener in &mut self.listeners {
            listener(&change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EdgeRejection;
    use crate::node::{ActionType, ConditionType, TriggerType};
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    const POPUP: NodeType = NodeType::Action(ActionType::ShowPopup);
    const DEVICE: NodeType = NodeType::Condition(ConditionType::DeviceType);

    fn config(value: serde_json::Value) -> NodeConfig {
        value.as_object().cloned().expect("object")
    }

    fn store() -> GraphStore {
        GraphStore::new_workflow("test", &EditorConfig::default())
    }

    fn trigger_of(store: &GraphStore) -> NodeId {
        store
            .workflow()
            .graph()
            .nodes()
            .find(|node| node.kind() == NodeKind::Trigger)
            .map(|node| node.id)
            .expect("default trigger")
    }

    fn graph_error(report: &Report<GraphError>) -> &GraphError {
        report.current_context()
    }

    #[test]
    fn fresh_workflow_has_one_trigger_and_is_dirty() {
        let store = store();
        let workflow = store.workflow();
        assert_eq!(workflow.graph().node_count(), 1);
        assert_eq!(workflow.graph().trigger_count(), 1);
        assert_eq!(workflow.revision(), 0);
        assert_eq!(workflow.version(), 0);
        assert!(workflow.is_dirty());
        assert!(!store.history().can_undo());
    }

    #[test]
    fn mutations_bump_revision_but_moves_do_not() {
        let mut store = store();
        let popup = store.add_node(POPUP, Position::new(100.0, 0.0));
        assert_eq!(store.workflow().revision(), 1);

        store
            .move_node(popup, Position::new(120.0, 10.0))
            .expect("move");
        assert_eq!(store.workflow().revision(), 1);
        assert_eq!(
            store.workflow().graph().node(popup).map(|n| n.position),
            Some(Position::new(120.0, 10.0))
        );
        assert!(store.history().can_undo());
    }

    #[test]
    fn update_config_recomputes_status() {
        let mut store = store();
        let popup = store.add_node(POPUP, Position::default());

        let status = store
            .update_node_config(popup, config(json!({ "title": "Hi" })))
            .expect("update");
        assert!(!status.is_valid());

        let status = store
            .update_node_config(popup, config(json!({ "body": "Welcome" })))
            .expect("update");
        assert!(status.is_valid());
    }

    #[test]
    fn update_config_on_missing_node_is_not_found() {
        let mut store = store();
        let ghost = NodeId::new();
        let report = store
            .update_node_config(ghost, NodeConfig::new())
            .expect_err("missing");
        assert_eq!(graph_error(&report), &GraphError::NodeNotFound { node_id: ghost });
        assert_eq!(store.workflow().revision(), 0);
    }

    #[test]
    fn duplicate_connect_fails_and_keeps_edge_count() {
        let mut store = store();
        let trigger = trigger_of(&store);
        let popup = store.add_node(POPUP, Position::default());

        store.connect(trigger, popup, None).expect("first connect");
        let report = store.connect(trigger, popup, None).expect_err("duplicate");

        assert_eq!(
            graph_error(&report),
            &GraphError::InvalidEdge {
                reason: EdgeRejection::Duplicate
            }
        );
        assert_eq!(store.workflow().graph().edge_count(), 1);
    }

    #[test]
    fn connect_from_action_is_rejected() {
        let mut store = store();
        let trigger = trigger_of(&store);
        let popup = store.add_node(POPUP, Position::default());

        let report = store.connect(popup, trigger, None).expect_err("from action");
        assert_eq!(
            graph_error(&report),
            &GraphError::InvalidEdge {
                reason: EdgeRejection::SourceIsAction
            }
        );
        assert_eq!(store.workflow().graph().edge_count(), 0);
    }

    #[test]
    fn accepted_connections_never_form_a_cycle() {
        let mut store = store();
        let trigger = trigger_of(&store);
        let conditions: Vec<NodeId> = (0..4)
            .map(|_| store.add_node(DEVICE, Position::default()))
            .collect();
        let mut nodes = vec![trigger];
        nodes.extend(&conditions);
        nodes.push(store.add_node(POPUP, Position::default()));

        for &from in &nodes {
            for &to in &nodes {
                for label in [None, Some("true"), Some("false")] {
                    let _ = store.connect(from, to, label);
                    assert!(!store.workflow().graph().is_cyclic());
                }
            }
        }
        assert!(store.workflow().graph().edge_count() > 0);
    }

    #[test]
    fn deleting_last_trigger_leaves_graph_unchanged() {
        let mut store = store();
        let trigger = trigger_of(&store);
        let popup = store.add_node(POPUP, Position::default());
        store.connect(trigger, popup, None).expect("connect");
        let before = store.snapshot();

        let report = store.delete_node(trigger).expect_err("last trigger");
        assert_eq!(
            graph_error(&report),
            &GraphError::InvariantViolation {
                invariant: Invariant::LastTrigger
            }
        );
        assert_eq!(store.workflow(), &before);
    }

    #[test]
    fn second_trigger_can_be_deleted() {
        let mut store = store();
        let extra = store.add_node(NodeType::Trigger(TriggerType::ExitIntent), Position::default());
        store.delete_node(extra).expect("delete extra trigger");

        let remaining = trigger_of(&store);
        assert!(store.delete_node(remaining).is_err());
    }

    #[test]
    fn deleting_condition_removes_both_branches() {
        let mut store = store();
        let trigger = trigger_of(&store);
        let condition = store.add_node(DEVICE, Position::default());
        let yes = store.add_node(POPUP, Position::default());
        let no = store.add_node(NodeType::Action(ActionType::Redirect), Position::default());
        store.connect(trigger, condition, None).expect("connect");
        let yes_edge = store.connect(condition, yes, Some("true")).expect("true branch");
        let no_edge = store.connect(condition, no, Some("false")).expect("false branch");

        let removed = store.delete_node(condition).expect("delete");
        assert_eq!(removed.len(), 3);
        assert!(removed.contains(&yes_edge));
        assert!(removed.contains(&no_edge));
        assert_eq!(store.workflow().graph().edge_count(), 0);
    }

    #[test]
    fn delete_missing_edge_is_not_found() {
        let mut store = store();
        let ghost = EdgeId::new();
        let report = store.delete_edge(ghost).expect_err("missing");
        assert_eq!(graph_error(&report), &GraphError::EdgeNotFound { edge_id: ghost });
    }

    #[test]
    fn undo_and_redo_restore_equal_graphs() {
        let mut store = store();
        let trigger = trigger_of(&store);
        let popup = store.add_node(POPUP, Position::default());
        let before = store.snapshot();

        store.connect(trigger, popup, None).expect("connect");
        let after = store.snapshot();

        assert!(store.undo());
        assert!(store.workflow().same_content(&before));
        assert!(store.redo());
        assert!(store.workflow().same_content(&after));
    }

    #[test]
    fn undo_and_redo_of_delete_restore_cascaded_edges() {
        let mut store = store();
        let trigger = trigger_of(&store);
        let condition = store.add_node(DEVICE, Position::default());
        let popup = store.add_node(POPUP, Position::default());
        store.connect(trigger, condition, None).expect("connect");
        store.connect(condition, popup, Some("true")).expect("true branch");
        let before = store.snapshot();

        store.delete_node(condition).expect("delete");
        let after = store.snapshot();
        assert_eq!(after.graph().edge_count(), 0);

        assert!(store.undo());
        assert!(store.workflow().same_content(&before));
        assert_eq!(store.workflow().graph().edge_count(), 2);
        assert!(store.redo());
        assert!(store.workflow().same_content(&after));
    }

    #[test]
    fn undo_and_redo_of_config_restore_status() {
        let mut store = store();
        let popup = store.add_node(POPUP, Position::default());
        let before = store.snapshot();

        let status = store
            .update_node_config(popup, config(json!({ "title": "Hi", "body": "Welcome" })))
            .expect("update");
        assert!(status.is_valid());
        let after = store.snapshot();

        assert!(store.undo());
        assert!(store.workflow().same_content(&before));
        let node = store.workflow().graph().node(popup).expect("popup");
        assert!(node.config().is_empty());
        assert!(!node.status().is_valid());

        assert!(store.redo());
        assert!(store.workflow().same_content(&after));
        let node = store.workflow().graph().node(popup).expect("popup");
        assert!(node.status().is_valid());
    }

    #[test]
    fn move_to_non_finite_position_is_rejected() {
        let mut store = store();
        let trigger = trigger_of(&store);
        let before = store.snapshot();

        for position in [
            Position::new(f64::NAN, 0.0),
            Position::new(0.0, f64::INFINITY),
        ] {
            let report = store.move_node(trigger, position).expect_err("non-finite");
            assert_eq!(
                graph_error(&report),
                &GraphError::InvalidPosition { node_id: trigger }
            );
        }
        assert_eq!(store.workflow(), &before);
        assert!(!store.history().can_undo());
    }

    #[test]
    fn undo_with_empty_history_is_noop() {
        let mut store = store();
        let before = store.snapshot();
        assert!(!store.undo());
        assert!(!store.redo());
        assert_eq!(store.workflow(), &before);
    }

    #[test]
    fn new_mutation_after_undo_gets_fresh_revision() {
        let mut store = store();
        store.add_node(POPUP, Position::default());
        store.add_node(POPUP, Position::default());
        assert_eq!(store.workflow().revision(), 2);

        store.undo();
        assert_eq!(store.workflow().revision(), 1);

        store.rename("renamed");
        assert_eq!(store.workflow().revision(), 3);
        assert!(!store.history().can_redo());
    }

    #[test]
    fn undo_back_to_persisted_content_clears_dirty() {
        let mut store = store();
        let stamp = store.content_stamp();
        store.mark_persisted(stamp, 1);
        assert!(!store.workflow().is_dirty());

        store.set_enabled(false);
        assert!(store.workflow().is_dirty());

        store.undo();
        assert!(!store.workflow().is_dirty());
        assert_eq!(store.workflow().version(), 1);

        store.redo();
        assert!(store.workflow().is_dirty());
    }

    #[test]
    fn listeners_see_each_change() {
        let mut store = store();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(move |change| sink.borrow_mut().push(change.kind));

        let popup = store.add_node(POPUP, Position::default());
        store
            .move_node(popup, Position::new(5.0, 5.0))
            .expect("move");
        let _ = store.delete_edge(EdgeId::new());
        store.undo();

        assert_eq!(
            *seen.borrow(),
            vec![ChangeKind::NodeAdded, ChangeKind::NodeMoved, ChangeKind::Restored]
        );
    }

    #[test]
    fn history_respects_configured_limit() {
        let config = EditorConfig {
            history_limit: 2,
            ..EditorConfig::default()
        };
        let mut store = GraphStore::new_workflow("limited", &config);
        for _ in 0..5 {
            store.add_node(POPUP, Position::default());
        }
        assert_eq!(store.history().undo_depth(), 2);
        assert!(store.undo());
        assert!(store.undo());
        assert!(!store.undo());
        assert_eq!(store.workflow().graph().node_count(), 4);
    }
}
