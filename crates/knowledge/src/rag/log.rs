//! Append-only log of RAG queries.
//!
//! Every call to [`RagEngine::query`](super::RagEngine::query) appends one
//! record. Records are never mutated or removed; `export_jsonl` appends the
//! records not yet exported to a JSON Lines file.

use super::types::StructuredContext;
use chrono::{DateTime, Utc};
use postapply_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// One logged query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryLogEntry {
    pub timestamp: DateTime<Utc>,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_context: Option<StructuredContext>,
    pub num_sources: usize,
}

#[derive(Debug, Default)]
struct LogState {
    entries: Vec<QueryLogEntry>,
    exported: usize,
}

/// In-memory query log owned by a RAG engine.
#[derive(Debug, Default)]
pub struct QueryLog {
    state: Mutex<LogState>,
}

impl QueryLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LogState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn append(&self, entry: QueryLogEntry) {
        self.lock().entries.push(entry);
    }

    /// Snapshot of all entries, oldest first.
    pub fn entries(&self) -> Vec<QueryLogEntry> {
        self.lock().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Append not-yet-exported entries to `path` as JSON lines.
    ///
    /// Returns the number of records written. Calling it again only writes
    /// entries logged since the previous export.
    pub fn export_jsonl(&self, path: &Path) -> AppResult<usize> {
        let mut state = self.lock();
        let pending = &state.entries[state.exported..];

        if pending.is_empty() {
            return Ok(0);
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut buffer = String::new();
        for entry in pending {
            buffer.push_str(&serde_json::to_string(entry)?);
            buffer.push('\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| AppError::Knowledge(format!("Failed to open query log {:?}: {}", path, e)))?;

        file.write_all(buffer.as_bytes()).map_err(|e| {
            AppError::Knowledge(format!("Failed to write query log {:?}: {}", path, e))
        })?;

        file.sync_all().map_err(|e| {
            AppError::Knowledge(format!("Failed to sync query log {:?}: {}", path, e))
        })?;

        let written = pending.len();
        state.exported = state.entries.len();

        tracing::debug!("Exported {} query log records to {:?}", written, path);
        Ok(written)
    }
}
