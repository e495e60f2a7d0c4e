//! Persistent FIFO cache of unused generated questions.
//!
//! Keyed by `"{category}_{difficulty}"`. Taking questions removes them, so a
//! cached question is served at most once. The file is rewritten atomically.

use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::model::{Difficulty, QuizQuestion};

/// Cache key for a category/difficulty pair.
pub fn cache_key(category: &str, difficulty: Difficulty) -> String {
    format!("{category}_{difficulty}")
}

#[derive(Debug, Default)]
pub struct QuestionCache {
    path: Option<PathBuf>,
    entries: HashMap<String, VecDeque<QuizQuestion>>,
}

impl QuestionCache {
    /// A cache that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the cache at `path`. A missing or unreadable file gives an empty
    /// cache bound to the same path.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("discarding unreadable question cache {}: {e}", path.display());
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                tracing::warn!("failed to read question cache {}: {e}", path.display());
                HashMap::new()
            }
        };
        Self {
            path: Some(path),
            entries,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Remove and return up to `count` questions from the front of `key`.
    pub fn take(&mut self, key: &str, count: usize) -> Vec<QuizQuestion> {
        let Some(queue) = self.entries.get_mut(key) else {
            return Vec::new();
        };
        let n = count.min(queue.len());
        let taken: Vec<_> = queue.drain(..n).collect();
        if queue.is_empty() {
            self.entries.remove(key);
        }
        taken
    }

    /// Append questions to the back of `key`.
    pub fn extend(&mut self, key: &str, questions: impl IntoIterator<Item = QuizQuestion>) {
        let mut questions = questions.into_iter().peekable();
        if questions.peek().is_none() {
            return;
        }
        self.entries
            .entry(key.to_string())
            .or_default()
            .extend(questions);
    }

    pub fn len(&self, key: &str) -> usize {
        self.entries.get(key).map_or(0, VecDeque::len)
    }

    pub fn total_len(&self) -> usize {
        self.entries.values().map(VecDeque::len).sum()
    }

    /// `(key, queued count)` pairs sorted by key.
    pub fn summary(&self) -> Vec<(String, usize)> {
        let mut summary: Vec<_> = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.len()))
            .collect();
        summary.sort();
        summary
    }

    /// Write the cache to its file. A no-op for in-memory caches.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string(&self.entries).context("failed to serialize question cache")?;
        write_atomic(path, json.as_bytes())
    }
}

/// Write `contents` to `path` via a temp file in the same directory.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create directory {}", dir.display()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    tmp.write_all(contents)?;
    tmp.persist(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
