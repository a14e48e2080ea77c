//! Delivery history
//!
//! Persisted record of delivered texts, most recent first, so a
//! dictation that was overwritten on the clipboard can be recovered
//! with `dicta history`. Stored as a versioned JSON file; a corrupt or
//! missing file starts an empty history rather than failing the daemon.

use crate::mode::{Language, Mode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// History-related errors
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One delivered dictation
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HistoryEntry {
    /// The delivered text
    pub text: String,
    /// When the text was delivered
    pub timestamp: DateTime<Utc>,
    /// Language of the delivered text
    pub language: Language,
    /// Whether the text came from the drafting gateway
    pub mode: Mode,
}

/// On-disk file format
#[derive(Debug, Deserialize, Serialize)]
struct HistoryFile {
    version: u32,
    entries: Vec<HistoryEntry>,
}

const HISTORY_VERSION: u32 = 1;

/// Delivery history backed by a JSON file
pub struct History {
    path: PathBuf,
    max_entries: usize,
    entries: Vec<HistoryEntry>,
}

impl History {
    /// Open the history at `path`, loading existing entries.
    ///
    /// A missing or unreadable file yields an empty history.
    pub fn load(path: PathBuf, max_entries: usize) -> Self {
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<HistoryFile>(&contents) {
                Ok(file) => file.entries,
                Err(e) => {
                    tracing::warn!("Ignoring corrupt history file {:?}: {}", path, e);
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };

        Self {
            path,
            max_entries,
            entries,
        }
    }

    /// Record a delivered text, most recent first, and persist.
    ///
    /// Empty texts are ignored; the list is trimmed to `max_entries`.
    pub fn record(
        &mut self,
        text: &str,
        language: Language,
        mode: Mode,
    ) -> Result<(), HistoryError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(());
        }

        self.entries.insert(
            0,
            HistoryEntry {
                text: trimmed.to_string(),
                timestamp: Utc::now(),
                language,
                mode,
            },
        );
        self.entries.truncate(self.max_entries);

        self.save()
    }

    /// The most recent `count` entries, newest first
    pub fn recent(&self, count: usize) -> &[HistoryEntry] {
        &self.entries[..count.min(self.entries.len())]
    }

    /// Remove all entries and persist the empty history
    pub fn clear(&mut self) -> Result<(), HistoryError> {
        self.entries.clear();
        self.save()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn save(&self) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = HistoryFile {
            version: HISTORY_VERSION,
            entries: self.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_history_path() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        (dir, path)
    }

    #[test]
    fn test_record_and_reload() {
        let (_dir, path) = temp_history_path();

        let mut history = History::load(path.clone(), 50);
        history
            .record("Remember to buy milk.", Language::En, Mode::Transcription)
            .unwrap();
        history
            .record("Hola Maria, llego tarde.", Language::Es, Mode::Drafting)
            .unwrap();

        let reloaded = History::load(path, 50);
        assert_eq!(reloaded.len(), 2);
        // Most recent first
        assert_eq!(reloaded.recent(1)[0].text, "Hola Maria, llego tarde.");
        assert_eq!(reloaded.recent(1)[0].mode, Mode::Drafting);
        assert_eq!(reloaded.recent(2)[1].language, Language::En);
    }

    #[test]
    fn test_trimmed_to_max_entries() {
        let (_dir, path) = temp_history_path();

        let mut history = History::load(path, 3);
        for i in 0..5 {
            history
                .record(&format!("entry {}", i), Language::En, Mode::Transcription)
                .unwrap();
        }

        assert_eq!(history.len(), 3);
        assert_eq!(history.recent(1)[0].text, "entry 4");
    }

    #[test]
    fn test_empty_text_not_recorded() {
        let (_dir, path) = temp_history_path();

        let mut history = History::load(path, 50);
        history
            .record("   ", Language::En, Mode::Transcription)
            .unwrap();

        assert!(history.is_empty());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let (_dir, path) = temp_history_path();
        std::fs::write(&path, "not json {{{").unwrap();

        let history = History::load(path.clone(), 50);
        assert!(history.is_empty());

        // Recording over the corrupt file works
        let mut history = history;
        history
            .record("fresh start", Language::En, Mode::Transcription)
            .unwrap();
        assert_eq!(History::load(path, 50).len(), 1);
    }

    #[test]
    fn test_clear() {
        let (_dir, path) = temp_history_path();

        let mut history = History::load(path.clone(), 50);
        history
            .record("something", Language::En, Mode::Transcription)
            .unwrap();
        history.clear().unwrap();

        assert!(History::load(path, 50).is_empty());
    }
}
