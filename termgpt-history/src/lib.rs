#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

use std::path::{Path, PathBuf};

use termgpt_context::TokenCounter;
use termgpt_types::{HistoryEntry, HistoryError};

/// Conversation history stored at a fixed path.
///
/// The file (and its parent directory) is created lazily on first write.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Create a store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the history file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all entries, oldest first.
    ///
    /// A missing or blank file is an empty history.
    pub async fn load(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(HistoryError::Io(e)),
        };
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&contents).map_err(|e| HistoryError::Serialization(e.to_string()))
    }

    /// Append one entry, measuring its token count first.
    ///
    /// Returns the entry as stored.
    pub async fn append(
        &self,
        mut entry: HistoryEntry,
        counter: &dyn TokenCounter,
    ) -> Result<HistoryEntry, HistoryError> {
        entry.token_count = counter.count(&entry.content);
        let mut entries = self.load().await?;
        entries.push(entry.clone());
        self.write_all(&entries).await?;
        Ok(entry)
    }

    /// Append a completed user/assistant exchange with a single rewrite.
    pub async fn append_turn(
        &self,
        user: &str,
        assistant: &str,
        counter: &dyn TokenCounter,
    ) -> Result<(), HistoryError> {
        let mut entries = self.load().await?;
        for mut entry in [HistoryEntry::user(user), HistoryEntry::assistant(assistant)] {
            entry.token_count = counter.count(&entry.content);
            entries.push(entry);
        }
        self.write_all(&entries).await
    }

    /// Delete the history file.
    ///
    /// Fails with [`HistoryError::NotFound`] when there is nothing to clear;
    /// callers usually report that and carry on.
    pub async fn clear(&self) -> Result<(), HistoryError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "history cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(HistoryError::NotFound(self.path.clone()))
            }
            Err(e) => Err(HistoryError::Io(e)),
        }
    }

    async fn write_all(&self, entries: &[HistoryEntry]) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let contents = serde_json::to_string_pretty(entries)
            .map_err(|e| HistoryError::Serialization(e.to_string()))?;
        tokio::fs::write(&self.path, contents).await?;
        tracing::debug!(path = %self.path.display(), entries = entries.len(), "history written");
        Ok(())
    }
}
