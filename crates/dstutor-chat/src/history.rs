//! Turn recording and the JSON history file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dstutor_types::{normalize_entries, StoredEntry, Turn, TutorError};

/// Append a completed turn and return it
pub fn record(turns: &mut Vec<Turn>, question: impl Into<String>, answer: impl Into<String>) -> &Turn {
    turns.push(Turn::new(question, answer));
    &turns[turns.len() - 1]
}

/// Plain-text transcript, one `**name:** question` / `**AI:** answer` pair per turn
pub fn export_transcript(turns: &[Turn], username: &str) -> String {
    turns
        .iter()
        .map(|turn| format!("**{}:** {}\n**AI:** {}", username, turn.question, turn.answer))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write the transcript of `turns` to `path`
pub fn save_transcript(path: &Path, turns: &[Turn], username: &str) -> Result<()> {
    ensure_parent(path)?;
    fs::write(path, export_transcript(turns, username))
        .with_context(|| format!("Failed to write transcript to {}", path.display()))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }
    Ok(())
}

/// Whole-file JSON store for the turn log.
///
/// Every persist rewrites the file; concurrent writers race and the last one wins.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file once. A missing file is an empty history.
    pub fn load(&self) -> Result<Vec<Turn>, TutorError> {
        self.read_entries()
            .map(normalize_entries)
            .map_err(|e| TutorError::PersistenceFailure(format!("{:#}", e)))
    }

    /// Overwrite the file with the full sequence
    pub fn persist(&self, turns: &[Turn]) -> Result<(), TutorError> {
        self.write_turns(turns)
            .map_err(|e| TutorError::PersistenceFailure(format!("{:#}", e)))
    }

    fn read_entries(&self) -> Result<Vec<StoredEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read history from {}", self.path.display()))?;
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse history file {}", self.path.display()))
    }

    fn write_turns(&self, turns: &[Turn]) -> Result<()> {
        ensure_parent(&self.path)?;
        let json = serde_json::to_string_pretty(turns).context("Failed to serialize chat history")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write history to {}", self.path.display()))?;
        log::debug!("persisted {} turns to {}", turns.len(), self.path.display());
        Ok(())
    }
}
