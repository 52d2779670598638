//! Directory-backed workflow storage.
//!
//! Each workflow lives in `<dir>/<workflow id>.json`. Writes go to a
//! temporary sibling first and are renamed into place.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pathway_core::WorkflowId;
use pathway_workflow::{TransportError, WorkflowBackend};
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::io::ErrorKind;
use std::path::PathBuf;

/// On-disk wrapper around a workflow document.
#[derive(Debug, Serialize, Deserialize)]
struct StoredDocument {
    saved_at: DateTime<Utc>,
    definition: JsonValue,
}

#[derive(Debug, Clone)]
pub struct DirectoryBackend {
    root: PathBuf,
}

impl DirectoryBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, id: WorkflowId) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    async fn read(&self, id: WorkflowId) -> Result<Option<StoredDocument>, Report<TransportError>> {
        let path = self.path_for(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(TransportError::new(format!("reading {}: {e}", path.display())).into());
            }
        };
        let stored = serde_json::from_slice(&bytes).map_err(|e| {
            TransportError::new(format!("unreadable file {}: {e}", path.display()))
        })?;
        Ok(Some(stored))
    }

    /// When the workflow was last written, if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub async fn saved_at(
        &self,
        id: WorkflowId,
    ) -> Result<Option<DateTime<Utc>>, Report<TransportError>> {
        Ok(self.read(id).await?.map(|stored| stored.saved_at))
    }
}

#[async_trait]
impl WorkflowBackend for DirectoryBackend {
    async fn fetch(&self, id: WorkflowId) -> Result<Option<JsonValue>, Report<TransportError>> {
        Ok(self.read(id).await?.map(|stored| stored.definition))
    }

    async fn store(
        &self,
        id: WorkflowId,
        document: JsonValue,
    ) -> Result<(), Report<TransportError>> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            TransportError::new(format!("creating {}: {e}", self.root.display()))
        })?;

        let stored = StoredDocument {
            saved_at: Utc::now(),
            definition: document,
        };
        let bytes = serde_json::to_vec_pretty(&stored)
            .map_err(|e| TransportError::new(format!("encoding workflow {id}: {e}")))?;

        let path = self.path_for(id);
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, bytes).await.map_err(|e| {
            TransportError::new(format!("writing {}: {e}", staging.display()))
        })?;
        tokio::fs::rename(&staging, &path).await.map_err(|e| {
            TransportError::new(format!("replacing {}: {e}", path.display()))
        })?;

        tracing::debug!(workflow_id = %id, path = %path.display(), "Wrote workflow file");
        Ok(())
    }

    async fn remove(&self, id: WorkflowId) -> Result<bool, Report<TransportError>> {
        let path = self.path_for(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => {
                Err(TransportError::new(format!("removing {}: {e}", path.display())).into())
            }
        }
    }
}
