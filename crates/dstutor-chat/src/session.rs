use dstutor_types::{Turn, TurnPhase, UserRole};
use serde::{Deserialize, Serialize};

/// Per-session conversation state.
///
/// At most one turn is in flight: `is_generating` stays set from the moment a
/// question is accepted until its turn is recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub pending_user_message: Option<String>,
    pub is_generating: bool,
    pub phase: TurnPhase,
    pub turns: Vec<Turn>,
    pub username: String,
    pub role: UserRole,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new("User", UserRole::User)
    }
}

impl SessionState {
    pub fn new(username: impl Into<String>, role: UserRole) -> Self {
        Self {
            pending_user_message: None,
            is_generating: false,
            phase: TurnPhase::Idle,
            turns: Vec::new(),
            username: username.into(),
            role,
        }
    }

    pub fn with_turns(mut self, turns: Vec<Turn>) -> Self {
        self.turns = turns;
        self
    }

    pub fn is_idle(&self) -> bool {
        !self.is_generating && self.phase == TurnPhase::Idle
    }

    /// Drop every recorded turn
    pub fn reset(&mut self) {
        self.turns.clear();
    }

    /// Turns newest-first, the order the chat view shows them in
    pub fn turns_newest_first(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter().rev()
    }

    pub(crate) fn begin_turn(&mut self, question: &str) {
        self.pending_user_message = Some(question.to_string());
        self.is_generating = true;
    }

    pub(crate) fn end_turn(&mut self) {
        self.pending_user_message = None;
        self.is_generating = false;
        self.phase = TurnPhase::Idle;
    }
}
