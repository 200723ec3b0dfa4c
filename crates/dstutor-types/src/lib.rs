//! Core types and structures for dstutor
//!
//! This crate provides the foundational types used across all dstutor crates.

use serde::{Deserialize, Deserializer, Serialize};

pub mod error;

pub use error::TutorError;

// ============================================================================
// Constants
// ============================================================================

/// Subject the tutor is restricted to unless configured otherwise
pub const DEFAULT_TOPIC: &str = "data science";

/// Glyph appended to an in-progress frame
pub const CURSOR_GLYPH: &str = "▌";

/// Per-token delay used by the typing effect
pub const DEFAULT_STREAM_DELAY_MS: u64 = 10;

/// Placeholder shown while the model is working
pub const THINKING_PLACEHOLDER: &str = "Thinking...";

/// Default history file name, relative to the working directory
pub const DEFAULT_HISTORY_FILE: &str = "chat_history.json";

/// Speaker tag the legacy tuple format used for answers
const LEGACY_ASSISTANT_TAG: &str = "assistant";

/// Build the fixed refusal for an off-topic question
pub fn rejection_message(topic: &str) -> String {
    format!(
        "I can only answer {topic}-related questions. Please ask something related to {topic}. 😊"
    )
}

/// Build the answer text recorded when a model call fails
pub fn error_answer(reason: &str) -> String {
    format!("Sorry, I encountered an error: {}", reason)
}

// ============================================================================
// Conversation Types
// ============================================================================

/// Who authored a displayed block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Assistant => "assistant",
        }
    }
}

/// One question paired with its final answer (or rejection/error message)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

impl Turn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Where a session's current turn is in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TurnPhase {
    #[default]
    Idle,
    Classifying,
    Rejected,
    Generating,
    Streaming,
}

impl TurnPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnPhase::Idle => "idle",
            TurnPhase::Classifying => "classifying",
            TurnPhase::Rejected => "rejected",
            TurnPhase::Generating => "generating",
            TurnPhase::Streaming => "streaming",
        }
    }
}

/// Cosmetic role picked at login. Grants nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "admin" => UserRole::Admin,
            _ => UserRole::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "User",
            UserRole::Admin => "Admin",
        }
    }
}

// ============================================================================
// History File Entries
// ============================================================================

/// Helper function to deserialize string or null values
pub fn deserialize_string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        _ => Ok(String::new()),
    }
}

/// Any entry shape found in a history file.
///
/// Current files only hold `Turn` objects; the other variants are what
/// earlier builds of the tutor wrote and are folded into turns on load.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StoredEntry {
    Turn(Turn),
    Exchange {
        #[serde(deserialize_with = "deserialize_string_or_null", default)]
        user: String,
        #[serde(deserialize_with = "deserialize_string_or_null")]
        ai: String,
    },
    Message {
        role: String,
        #[serde(deserialize_with = "deserialize_string_or_null", default)]
        content: String,
    },
    Tagged(String, String),
}

/// Fold stored entries into turns, preserving order.
///
/// Tagged and role-based entries are paired: a question is closed by the next
/// assistant entry. A dangling question gets an empty answer and an answer
/// with no open question gets an empty question.
pub fn normalize_entries(entries: Vec<StoredEntry>) -> Vec<Turn> {
    let mut turns = Vec::with_capacity(entries.len());
    let mut open_question: Option<String> = None;

    for entry in entries {
        let (speaker, text) = match entry {
            StoredEntry::Turn(turn) => {
                if let Some(q) = open_question.take() {
                    turns.push(Turn::new(q, String::new()));
                }
                turns.push(turn);
                continue;
            }
            StoredEntry::Exchange { user, ai } => {
                if let Some(q) = open_question.take() {
                    turns.push(Turn::new(q, String::new()));
                }
                turns.push(Turn::new(user, ai));
                continue;
            }
            StoredEntry::Message { role, content } => (role, content),
            StoredEntry::Tagged(speaker, text) => (speaker, text),
        };

        if speaker.eq_ignore_ascii_case(LEGACY_ASSISTANT_TAG) {
            turns.push(Turn::new(open_question.take().unwrap_or_default(), text));
        } else {
            if let Some(q) = open_question.take() {
                turns.push(Turn::new(q, String::new()));
            }
            open_question = Some(text);
        }
    }

    if let Some(q) = open_question {
        turns.push(Turn::new(q, String::new()));
    }

    turns
}
