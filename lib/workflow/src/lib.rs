//! Workflow graph model and editing engine for pathway.
//!
//! This crate provides the core of the workflow canvas:
//!
//! - **Graph Model**: Directed graphs using petgraph with typed nodes and edges
//! - **Node Types**: Trigger, Condition and Action subtypes from a static catalog
//! - **Graph Store**: The single writer of the live workflow, with change notifications
//! - **Validation**: Edge admission checks and whole-graph findings
//! - **History**: Bounded undo/redo over owned workflow snapshots
//! - **Canvas**: Translation of interaction events into store mutations
//! - **Persistence**: Save/load of workflow definitions through a pluggable backend

pub mod canvas;
pub mod catalog;
pub mod config;
pub mod definition;
pub mod edge;
pub mod error;
pub mod graph;
pub mod history;
pub mod node;
pub mod persistence;
pub mod store;
pub mod validation;

pub use canvas::{CanvasController, CanvasEvent, CanvasFeedback, Notice, Selection, Target};
pub use config::EditorConfig;
pub use definition::{EdgeRecord, NodeRecord, Workflow, WorkflowDefinition};
pub use edge::Edge;
pub use error::{
    CorruptReason, EdgeRejection, GraphError, Invariant, PersistenceError, TransportError,
};
pub use graph::WorkflowGraph;
pub use history::{HistoryManager, HistoryState};
pub use node::{
    ActionType, ConditionType, Node, NodeConfig, NodeKind, NodeType, Position, TriggerType,
    ValidationStatus,
};
pub use persistence::{
    InMemoryBackend, PendingSave, PersistenceAdapter, SaveOutcome, WorkflowBackend,
};
pub use store::{ChangeKind, GraphChange, GraphStore};
pub use validation::{Finding, FindingTarget, Severity};
