//! Saving and loading workflow definitions.
//!
//! Backends store opaque JSON documents; this module owns the format,
//! the consistency checks on load and the save lifecycle. A save is split
//! into three steps so the editor is never borrowed across the round trip:
//!
//! 1. [`PersistenceAdapter::prepare_save`] validates and serializes the
//!    workflow and claims the workflow's single save slot.
//! 2. [`PendingSave::dispatch`] talks to the backend.
//! 3. [`PersistenceAdapter::finish_save`] records the result in the store.
//!
//! [`PersistenceAdapter::save`] runs all three in sequence.

use crate::config::EditorConfig;
use crate::definition::{Workflow, WorkflowDefinition};
use crate::error::{CorruptReason, PersistenceError, TransportError};
use crate::store::GraphStore;
use crate::validation::{self, Finding};
use async_trait::async_trait;
use pathway_core::WorkflowId;
use rootcause::prelude::Report;
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::instrument;

/// Durable storage for workflow documents.
///
/// Retry policy belongs to callers; the adapter never retries.
#[async_trait]
pub trait WorkflowBackend: Send + Sync {
    /// Fetches the stored document, or `None` if there is none.
    async fn fetch(&self, id: WorkflowId) -> Result<Option<JsonValue>, Report<TransportError>>;

    /// Stores a document, replacing any previous one.
    async fn store(&self, id: WorkflowId, document: JsonValue)
    -> Result<(), Report<TransportError>>;

    /// Removes the document. Returns false if there was none.
    async fn remove(&self, id: WorkflowId) -> Result<bool, Report<TransportError>>;
}

/// Backend keeping documents in memory.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    documents: tokio::sync::Mutex<HashMap<WorkflowId, JsonValue>>,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.lock().await.is_empty()
    }
}

#[async_trait]
impl WorkflowBackend for InMemoryBackend {
    async fn fetch(&self, id: WorkflowId) -> Result<Option<JsonValue>, Report<TransportError>> {
        Ok(self.documents.lock().await.get(&id).cloned())
    }

    async fn store(
        &self,
        id: WorkflowId,
        document: JsonValue,
    ) -> Result<(), Report<TransportError>> {
        self.documents.lock().await.insert(id, document);
        Ok(())
    }

    async fn remove(&self, id: WorkflowId) -> Result<bool, Report<TransportError>> {
        Ok(self.documents.lock().await.remove(&id).is_some())
    }
}

type SlotSet = Arc<Mutex<HashSet<WorkflowId>>>;

/// A claimed save slot, released when dropped.
#[derive(Debug)]
struct SaveSlot {
    workflow_id: WorkflowId,
    claimed: SlotSet,
}

impl SaveSlot {
    fn claim(claimed: &SlotSet, workflow_id: WorkflowId) -> Option<Self> {
        let inserted = claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(workflow_id);
        inserted.then(|| Self {
            workflow_id,
            claimed: Arc::clone(claimed),
        })
    }
}

impl Drop for SaveSlot {
    fn drop(&mut self) {
        self.claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.workflow_id);
    }
}

/// A validated, serialized save waiting to be sent.
#[derive(Debug)]
pub struct PendingSave<B> {
    backend: Arc<B>,
    slot: SaveSlot,
    stamp: u64,
    version: u64,
    document: JsonValue,
    findings: Vec<Finding>,
}

impl<B: WorkflowBackend> PendingSave<B> {
    #[must_use]
    pub fn workflow_id(&self) -> WorkflowId {
        self.slot.workflow_id
    }

    /// Version the workflow will have once this save lands.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Non-blocking findings reported at validation time.
    #[must_use]
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Sends the document to the backend.
    #[instrument(skip(self), fields(workflow_id = %self.slot.workflow_id, version = self.version))]
    pub async fn dispatch(self) -> SaveOutcome {
        let result = self
            .backend
            .store(self.slot.workflow_id, self.document)
            .await;
        SaveOutcome {
            slot: self.slot,
            stamp: self.stamp,
            version: self.version,
            result,
        }
    }
}

/// The backend's answer to a dispatched save.
#[derive(Debug)]
pub struct SaveOutcome {
    slot: SaveSlot,
    stamp: u64,
    version: u64,
    result: Result<(), Report<TransportError>>,
}

impl SaveOutcome {
    #[must_use]
    pub fn workflow_id(&self) -> WorkflowId {
        self.slot.workflow_id
    }
}

/// Saves and loads workflows through a backend.
#[derive(Debug)]
pub struct PersistenceAdapter<B> {
    backend: Arc<B>,
    in_flight: SlotSet,
}

impl<B: WorkflowBackend> PersistenceAdapter<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    #[must_use]
    pub fn from_arc(backend: Arc<B>) -> Self {
        Self {
            backend,
            in_flight: SlotSet::default(),
        }
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns true while a save for this workflow is outstanding.
    #[must_use]
    pub fn is_saving(&self, workflow_id: WorkflowId) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&workflow_id)
    }

    /// Validates and serializes the workflow and claims its save slot.
    ///
    /// # Errors
    ///
    /// Returns `ValidationFailed` if any Error-severity finding exists,
    /// or `SaveInFlight` if another save for this workflow is outstanding.
    /// Nothing is written in either case.
    pub fn prepare_save(
        &self,
        store: &GraphStore,
    ) -> Result<PendingSave<B>, Report<PersistenceError>> {
        let workflow = store.workflow();
        let workflow_id = workflow.id();

        let findings = validation::validate_graph(workflow);
        if validation::has_errors(&findings) {
            tracing::debug!(
                workflow_id = %workflow_id,
                findings = findings.len(),
                "Save blocked by validation"
            );
            return Err(PersistenceError::ValidationFailed { findings }.into());
        }

        let version = workflow.version() + 1;
        let mut definition = workflow.to_definition();
        definition.version = version;
        let document =
            serde_json::to_value(&definition).map_err(|e| PersistenceError::Corrupt {
                reason: CorruptReason::Malformed {
                    details: e.to_string(),
                },
            })?;

        let slot = SaveSlot::claim(&self.in_flight, workflow_id)
            .ok_or(PersistenceError::SaveInFlight { workflow_id })?;

        Ok(PendingSave {
            backend: Arc::clone(&self.backend),
            slot,
            stamp: store.content_stamp(),
            version,
            document,
            findings,
        })
    }

    /// Applies a save outcome to the store and releases the save slot.
    ///
    /// If the store was edited after the save was prepared it stays dirty.
    /// Outcomes for a different workflow leave the store untouched.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the backend failed; the store stays dirty.
    pub fn finish_save(
        &self,
        store: &mut GraphStore,
        outcome: SaveOutcome,
    ) -> Result<u64, Report<PersistenceError>> {
        let SaveOutcome {
            slot,
            stamp,
            version,
            result,
        } = outcome;
        let workflow_id = slot.workflow_id;
        drop(slot);

        if let Err(report) = result {
            tracing::warn!(workflow_id = %workflow_id, error = %report, "Save failed");
            return Err(report.context(PersistenceError::Transport { workflow_id }));
        }

        if workflow_id != store.workflow_id() {
            tracing::warn!(
                workflow_id = %workflow_id,
                open_workflow_id = %store.workflow_id(),
                "Ignoring save outcome for a workflow that is not open"
            );
            return Ok(version);
        }

        store.mark_persisted(stamp, version);
        if store.workflow().is_dirty() {
            tracing::info!(
                workflow_id = %workflow_id,
                version,
                "Workflow saved, edits made during the save are still unsaved"
            );
        } else {
            tracing::info!(workflow_id = %workflow_id, version, "Workflow saved");
        }
        Ok(version)
    }

    /// Validates, sends and records a save. Returns the new version.
    ///
    /// # Errors
    ///
    /// See [`prepare_save`](Self::prepare_save) and
    /// [`finish_save`](Self::finish_save).
    #[instrument(skip(self, store), fields(workflow_id = %store.workflow_id()))]
    pub async fn save(&self, store: &mut GraphStore) -> Result<u64, Report<PersistenceError>> {
        let pending = self.prepare_save(store)?;
        let outcome = pending.dispatch().await;
        self.finish_save(store, outcome)
    }

    /// Loads a workflow. The result is clean.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the backend has no document, `Corrupt` if the
    /// document is inconsistent, or `Transport` if the backend failed. No
    /// partial workflow is ever returned.
    #[instrument(skip(self))]
    pub async fn load(&self, workflow_id: WorkflowId) -> Result<Workflow, Report<PersistenceError>> {
        let document = self
            .backend
            .fetch(workflow_id)
            .await
            .map_err(|report| report.context(PersistenceError::Transport { workflow_id }))?
            .ok_or(PersistenceError::NotFound { workflow_id })?;

        let workflow = decode(document)
            .and_then(|definition| {
                if definition.id == workflow_id {
                    definition.into_workflow()
                } else {
                    Err(CorruptReason::Malformed {
                        details: format!("document belongs to workflow {}", definition.id),
                    })
                }
            })
            .map_err(|reason| {
                tracing::warn!(workflow_id = %workflow_id, reason = %reason, "Rejected corrupt workflow");
                PersistenceError::Corrupt { reason }
            })?;

        tracing::info!(
            workflow_id = %workflow_id,
            version = workflow.version(),
            nodes = workflow.graph().node_count(),
            edges = workflow.graph().edge_count(),
            "Workflow loaded"
        );
        Ok(workflow)
    }

    /// Loads a workflow into a fresh editing store.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub async fn open(
        &self,
        workflow_id: WorkflowId,
        config: &EditorConfig,
    ) -> Result<GraphStore, Report<PersistenceError>> {
        let workflow = self.load(workflow_id).await?;
        Ok(GraphStore::from_loaded(workflow, config))
    }

    /// Deletes a workflow outright. Returns false if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the backend failed.
    #[instrument(skip(self))]
    pub async fn delete_workflow(
        &self,
        workflow_id: WorkflowId,
    ) -> Result<bool, Report<PersistenceError>> {
        let removed = self
            .backend
            .remove(workflow_id)
            .await
            .map_err(|report| report.context(PersistenceError::Transport { workflow_id }))?;
        tracing::info!(workflow_id = %workflow_id, removed, "Workflow deleted");
        Ok(removed)
    }
}

fn decode(document: JsonValue) -> Result<WorkflowDefinition, CorruptReason> {
    serde_json::from_value(document).map_err(|e| CorruptReason::Malformed {
        details: e.to_string(),
    })
}
