use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dstutor_chat::TurnOutcome;
use dstutor_types::{Speaker, Turn, UserRole};

/// Session ID type
pub type SessionId = Uuid;

/// Configuration for creating a new session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub username: Option<String>,
    /// "user" or "admin", case-insensitive
    #[serde(default)]
    pub role: Option<String>,
}

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    Ask { question: String },
    /// 1-based index into the quick-question presets
    QuickQuestion { index: usize },
    ClearHistory,
    RunCode { code: String },
    /// Skip the rest of the typing effect
    CancelStreaming,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    SessionJoined {
        session_id: SessionId,
        created_at: String,
        username: String,
        role: UserRole,
        topic: String,
        model: String,
        history: Vec<Turn>,
        quick_questions: Vec<String>,
    },

    // Display blocks
    BlockAppended {
        speaker: Speaker,
        content: String,
    },
    BlockUpdated {
        content: String,
        #[serde(rename = "final")]
        is_final: bool,
    },
    TurnComplete {
        turn: Turn,
        outcome: TurnOutcome,
    },

    CodeResult {
        stdout: String,
        stderr: String,
        exit_code: Option<i32>,
        success: bool,
        /// URLs under /api/sessions/:id/figures/
        figures: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        explanation: Option<String>,
    },
    HistoryCleared,
    Busy,

    Error {
        message: String,
        recoverable: bool,
    },
}

/// Session information for listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub username: String,
    pub role: UserRole,
    pub created_at: String,
    pub last_activity: String,
    pub active_clients: usize,
    pub turn_count: usize,
    pub generating: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_client_messages_use_type_and_data() {
        let msg: ClientMessage =
            serde_json::from_value(json!({"type": "Ask", "data": {"question": "What is PCA?"}})).unwrap();
        assert_eq!(msg, ClientMessage::Ask { question: "What is PCA?".into() });

        let msg: ClientMessage = serde_json::from_value(json!({"type": "ClearHistory"})).unwrap();
        assert_eq!(msg, ClientMessage::ClearHistory);
    }

    #[test]
    fn test_block_updated_serializes_final_flag() {
        let value = serde_json::to_value(ServerMessage::BlockUpdated {
            content: "done".into(),
            is_final: true,
        })
        .unwrap();
        assert_eq!(value, json!({"type": "BlockUpdated", "data": {"content": "done", "final": true}}));
    }

    #[test]
    fn test_turn_complete_outcome_is_lowercase() {
        let value = serde_json::to_value(ServerMessage::TurnComplete {
            turn: Turn::new("q", "a"),
            outcome: TurnOutcome::Rejected,
        })
        .unwrap();
        assert_eq!(value["data"]["outcome"], "rejected");
    }
}
