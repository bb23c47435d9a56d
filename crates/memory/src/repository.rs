//! Long-term memory repository: shared notes persisted as JSON.
//!
//! Layout on disk:
//!
//! ```json
//! {"global_memory": [{"timestamp": "2026-01-01T00:00:00Z", "content": "..."}]}
//! ```
//!
//! Entries are loaded once on creation and flushed on every mutation.
//! A missing or unparseable file reads as empty; malformed entries are
//! skipped individually.

use chrono::{DateTime, Utc};
use quotarelay_core::Clock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// One remembered note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub timestamp: DateTime<Utc>,
    pub content: String,
}

impl ContextEntry {
    pub fn new(timestamp: DateTime<Utc>, content: impl Into<String>) -> Self {
        Self {
            timestamp,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default, Serialize)]
struct RepositoryFile {
    global_memory: Vec<ContextEntry>,
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("memory entry is empty")]
    EmptyEntry,

    #[error("failed to persist repository: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize repository: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Shared long-term memory, oldest entry first internally.
pub struct Repository {
    path: Option<PathBuf>,
    entries: RwLock<Vec<ContextEntry>>,
    clock: Arc<dyn Clock>,
}

impl Repository {
    /// Open a file-backed repository at `path`.
    pub fn open(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        let path = path.into();
        let entries = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = entries.len(), "Memory repository loaded");
        Self {
            path: Some(path),
            entries: RwLock::new(entries),
            clock,
        }
    }

    /// A repository that never touches disk.
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self {
            path: None,
            entries: RwLock::new(Vec::new()),
            clock,
        }
    }

    fn load_from_disk(path: &Path) -> Vec<ContextEntry> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };

        let value = match serde_json::from_str::<serde_json::Value>(&content) {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Corrupt memory repository, starting empty"
                );
                return Vec::new();
            }
        };

        let Some(items) = value.get("global_memory").and_then(|v| v.as_array()) else {
            warn!(path = %path.display(), "Memory repository has no global_memory list");
            return Vec::new();
        };

        items
            .iter()
            .filter_map(|item| match ContextEntry::deserialize(item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted memory entry");
                    None
                }
            })
            .collect()
    }

    async fn flush(&self, entries: &[ContextEntry]) -> Result<(), RepositoryError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = RepositoryFile {
            global_memory: entries.to_vec(),
        };
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, serde_json::to_string_pretty(&file)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Append a note stamped with the current time.
    pub async fn add_entry(&self, content: &str) -> Result<ContextEntry, RepositoryError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(RepositoryError::EmptyEntry);
        }

        let entry = ContextEntry::new(self.clock.now(), content);
        let mut entries = self.entries.write().await;
        entries.push(entry.clone());
        self.flush(&entries).await?;
        Ok(entry)
    }

    /// Up to `limit` entries, most recent first.
    pub async fn latest_entries(&self, limit: usize) -> Vec<ContextEntry> {
        let entries = self.entries.read().await;
        entries.iter().rev().take(limit).cloned().collect()
    }

    /// Drop the most recent entry. Returns whether anything was removed.
    pub async fn remove_latest(&self) -> Result<bool, RepositoryError> {
        let mut entries = self.entries.write().await;
        if entries.pop().is_none() {
            return Ok(false);
        }
        self.flush(&entries).await?;
        Ok(true)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
