//! Optimization history
//!
//! A JSON array on disk, newest entry first, capped at a configurable length.
//! Only the CLI records into it; the optimization pipeline itself is stateless.

use crate::api::ProviderType;
use crate::tokens::estimate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Failed to access history file: {0}")]
    Io(#[from] std::io::Error),

    #[error("History file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// One successful optimization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub provider: ProviderType,
    pub original: String,
    pub optimized: String,
    pub tokens_before: usize,
    pub tokens_after: usize,
}

impl HistoryEntry {
    /// Entry stamped now, with token estimates for both texts. The id is
    /// assigned when the entry is recorded.
    pub fn new(
        provider: ProviderType,
        original: impl Into<String>,
        optimized: impl Into<String>,
    ) -> Self {
        let original = original.into();
        let optimized = optimized.into();

        Self {
            id: 0,
            timestamp: Utc::now(),
            provider,
            tokens_before: estimate(&original),
            tokens_after: estimate(&optimized),
            original,
            optimized,
        }
    }
}

#[derive(Debug)]
pub struct History {
    path: PathBuf,
    max_entries: usize,
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("prompt-optimizer")
            .join("history.json")
    }

    /// Load the history at `path`. A missing file is an empty history.
    pub fn load_from(path: impl Into<PathBuf>, max_entries: usize) -> Result<Self, HistoryError> {
        let path = path.into();

        let mut entries: Vec<HistoryEntry> = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            Vec::new()
        };
        entries.truncate(max_entries);

        debug!(path = %path.display(), entries = entries.len(), "history loaded");

        Ok(Self {
            path,
            max_entries,
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Newest first
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn get(&self, id: u64) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Add an entry at the front and drop whatever falls past the cap.
    /// Returns the id given to the entry.
    pub fn record(&mut self, mut entry: HistoryEntry) -> u64 {
        let id = self.entries.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        entry.id = id;

        self.entries.insert(0, entry);
        self.entries.truncate(self.max_entries);
        id
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn save(&self) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, content)?;

        debug!(path = %self.path.display(), entries = self.entries.len(), "history saved");
        Ok(())
    }
}
