//! Quiz history, newest first, persisted as a JSON array.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::cache::write_atomic;
use crate::results::QuizResult;

#[derive(Debug, Default)]
pub struct HistoryStore {
    path: Option<PathBuf>,
    results: Vec<QuizResult>,
}

impl HistoryStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load history from `path`. Missing or unreadable files give an empty history.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let results = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("ignoring unreadable history {}: {e}", path.display());
                Vec::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                tracing::warn!("failed to read history {}: {e}", path.display());
                Vec::new()
            }
        };
        Self {
            path: Some(path),
            results,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn results(&self) -> &[QuizResult] {
        &self.results
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Insert `result` at the front and persist.
    pub fn record(&mut self, result: QuizResult) -> Result<()> {
        self.results.insert(0, result);
        self.save()
    }

    pub fn clear(&mut self) -> Result<()> {
        self.results.clear();
        self.save()
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&self.results).context("failed to serialize history")?;
        write_atomic(path, json.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_prepends_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let mut store = HistoryStore::load(&path);
        assert!(store.is_empty());
        store.record(QuizResult::new(1, 5, "Science")).unwrap();
        store.record(QuizResult::new(5, 5, "History")).unwrap();
        assert_eq!(store.results()[0].category, "History");

        let reloaded = HistoryStore::load(&path);
        assert_eq!(reloaded.results().len(), 2);
        assert_eq!(reloaded.results()[0].category, "History");
        assert_eq!(reloaded.results()[1].score, 1);
    }

    #[test]
    fn clear_empties_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let mut store = HistoryStore::load(&path);
        store.record(QuizResult::new(3, 5, "Sports")).unwrap();
        store.clear().unwrap();
        assert!(HistoryStore::load(&path).is_empty());
    }

    #[test]
    fn unreadable_history_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "[{\"broken\": true}]").unwrap();
        assert!(HistoryStore::load(&path).is_empty());
    }
}
