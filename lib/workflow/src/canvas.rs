//! Canvas interaction controller.
//!
//! Translates raw pointer and keyboard events from a rendering layer into
//! [`GraphStore`] mutations. Owns the ephemeral interaction state: selection,
//! the node being dragged and the connection being drawn. None of it is
//! persisted.

use crate::node::{NodeType, Position};
use crate::store::GraphStore;
use pathway_core::{EdgeId, NodeId};
use std::collections::BTreeSet;
use std::fmt;

/// Something the user can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Target {
    Node(NodeId),
    Edge(EdgeId),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(id) => write!(f, "{id}"),
            Self::Edge(id) => write!(f, "{id}"),
        }
    }
}

/// Currently selected nodes and edges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    nodes: BTreeSet<NodeId>,
    edges: BTreeSet<EdgeId>,
}

impl Selection {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    #[must_use]
    pub fn contains(&self, target: Target) -> bool {
        match target {
            Target::Node(id) => self.nodes.contains(&id),
            Target::Edge(id) => self.edges.contains(&id),
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    pub fn edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges.iter().copied()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }

    /// Replaces the selection with one target.
    pub fn select_only(&mut self, target: Target) {
        self.clear();
        self.insert(target);
    }

    /// Adds the target if absent, removes it if present.
    pub fn toggle(&mut self, target: Target) {
        let removed = match target {
            Target::Node(id) => self.nodes.remove(&id),
            Target::Edge(id) => self.edges.remove(&id),
        };
        if !removed {
            self.insert(target);
        }
    }

    fn insert(&mut self, target: Target) {
        match target {
            Target::Node(id) => self.nodes.insert(id),
            Target::Edge(id) => self.edges.insert(id),
        };
    }

    /// Drops ids the store no longer holds.
    fn prune(&mut self, store: &GraphStore) {
        let graph = store.workflow().graph();
        self.nodes.retain(|id| graph.contains_node(*id));
        self.edges.retain(|id| graph.contains_edge(*id));
    }
}

/// Raw interaction events from the rendering layer.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    /// Pointer pressed on a node, an edge or empty canvas.
    PointerDown {
        target: Option<Target>,
        additive: bool,
    },
    DragMove {
        position: Position,
    },
    DragEnd {
        position: Position,
    },
    /// Started drawing a connection from a node's output or branch handle.
    ConnectStart {
        from: NodeId,
        label: Option<String>,
    },
    /// Released a connection; `None` means over empty canvas.
    ConnectEnd {
        to: Option<NodeId>,
    },
    ConnectCancel,
    DeleteSelection,
    Undo,
    Redo,
    AddNode {
        node_type: NodeType,
        position: Position,
    },
}

/// A user-facing message produced while handling an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// The element the message is about, if any.
    pub target: Option<Target>,
    pub message: String,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            Some(target) => write!(f, "{target}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Result of handling one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanvasFeedback {
    pub notices: Vec<Notice>,
    /// Whether the workflow content changed.
    pub changed: bool,
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    node_id: NodeId,
    origin: Position,
    current: Position,
}

#[derive(Debug, Clone)]
struct PendingConnection {
    from: NodeId,
    label: Option<String>,
}

/// Mediates between canvas gestures and the graph store.
#[derive(Debug)]
pub struct CanvasController {
    store: GraphStore,
    selection: Selection,
    dragging: Option<DragState>,
    connecting: Option<PendingConnection>,
}

impl CanvasController {
    #[must_use]
    pub fn new(store: GraphStore) -> Self {
        Self {
            store,
            selection: Selection::default(),
            dragging: None,
            connecting: None,
        }
    }

    #[must_use]
    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Position the dragged node should be drawn at before the drag ends.
    #[must_use]
    pub fn drag_preview(&self) -> Option<(NodeId, Position)> {
        self.dragging.map(|drag| (drag.node_id, drag.current))
    }

    /// Source of the connection being drawn, if any.
    #[must_use]
    pub fn pending_connection(&self) -> Option<NodeId> {
        self.connecting.as_ref().map(|pending| pending.from)
    }

    /// Runs `f` against the store, then resyncs interaction state.
    pub fn with_store<R>(&mut self, f: impl FnOnce(&mut GraphStore) -> R) -> R {
        let result = f(&mut self.store);
        self.sync();
        result
    }

    #[must_use]
    pub fn into_store(self) -> GraphStore {
        self.store
    }

    /// Handles one interaction event.
    pub fn handle(&mut self, event: CanvasEvent) -> CanvasFeedback {
        let stamp_before = self.store.content_stamp();
        let mut notices = Vec::new();

        match event {
            CanvasEvent::PointerDown { target, additive } => self.pointer_down(target, additive),
            CanvasEvent::DragMove { position } => {
                if let Some(drag) = self.dragging.as_mut() {
                    drag.current = position;
                }
            }
            CanvasEvent::DragEnd { position } => {
                if let Some(notice) = self.drag_end(position) {
                    notices.push(notice);
                }
            }
            CanvasEvent::ConnectStart { from, label } => {
                self.dragging = None;
                self.connecting = Some(PendingConnection { from, label });
            }
            CanvasEvent::ConnectEnd { to } => {
                if let Some(notice) = self.connect_end(to) {
                    notices.push(notice);
                }
            }
            CanvasEvent::ConnectCancel => self.connecting = None,
            CanvasEvent::DeleteSelection => notices.extend(self.delete_selection()),
            CanvasEvent::Undo => {
                self.store.undo();
            }
            CanvasEvent::Redo => {
                self.store.redo();
            }
            CanvasEvent::AddNode {
                node_type,
                position,
            } => {
                let node_id = self.store.add_node(node_type, position);
                self.selection.select_only(Target::Node(node_id));
            }
        }

        self.sync();
        CanvasFeedback {
            notices,
            changed: self.store.content_stamp() != stamp_before,
        }
    }

    fn pointer_down(&mut self, target: Option<Target>, additive: bool) {
        self.connecting = None;
        let Some(target) = target else {
            if !additive {
                self.selection.clear();
            }
            return;
        };

        if additive {
            self.selection.toggle(target);
        } else if !self.selection.contains(target) {
            self.selection.select_only(target);
        }

        if !self.selection.contains(target) {
            return;
        }
        if let Target::Node(node_id) = target {
            if let Some(node) = self.store.workflow().graph().node(node_id) {
                self.dragging = Some(DragState {
                    node_id,
                    origin: node.position,
                    current: node.position,
                });
            }
        }
    }

    fn drag_end(&mut self, position: Position) -> Option<Notice> {
        let drag = self.dragging.take()?;
        if position == drag.origin {
            return None;
        }
        self.store
            .move_node(drag.node_id, position)
            .err()
            .map(|report| Notice {
                target: Some(Target::Node(drag.node_id)),
                message: report.current_context().to_string(),
            })
    }

    fn connect_end(&mut self, to: Option<NodeId>) -> Option<Notice> {
        let pending = self.connecting.take()?;
        let to = to?;
        match self.store.connect(pending.from, to, pending.label.as_deref()) {
            Ok(edge_id) => {
                tracing::debug!(edge_id = %edge_id, "Connection drawn");
                None
            }
            Err(report) => Some(Notice {
                target: Some(Target::Node(pending.from)),
                message: report.current_context().to_string(),
            }),
        }
    }

    /// Deletes each selected element independently.
    ///
    /// Nodes go first; edges already removed along with a node are skipped.
    fn delete_selection(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();

        let nodes: Vec<NodeId> = self.selection.nodes().collect();
        for node_id in nodes {
            if let Err(report) = self.store.delete_node(node_id) {
                notices.push(Notice {
                    target: Some(Target::Node(node_id)),
                    message: report.current_context().to_string(),
                });
            }
        }

        let edges: Vec<EdgeId> = self.selection.edges().collect();
        for edge_id in edges {
            if !self.store.workflow().graph().contains_edge(edge_id) {
                continue;
            }
            if let Err(report) = self.store.delete_edge(edge_id) {
                notices.push(Notice {
                    target: Some(Target::Edge(edge_id)),
                    message: report.current_context().to_string(),
                });
            }
        }

        notices
    }

    fn sync(&mut self) {
        self.selection.prune(&self.store);
        let graph = self.store.workflow().graph();
        if self
            .dragging
            .is_some_and(|drag| !graph.contains_node(drag.node_id))
        {
            self.dragging = None;
        }
        if self
            .connecting
            .as_ref()
            .is_some_and(|pending| !graph.contains_node(pending.from))
        {
            self.connecting = None;
        }
    }
}
