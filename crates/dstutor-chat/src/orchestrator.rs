//! Per-turn state machine.
//!
//! `Idle -> Classifying -> (Rejected | Generating -> Streaming) -> Idle`. Model
//! failures do not escape a turn: they become an error answer that is shown and
//! recorded like any other.

use std::sync::Arc;
use std::time::Duration;

use dstutor_api::LlmClient;
use dstutor_types::{
    error_answer, rejection_message, Speaker, Turn, TurnPhase, TutorError, UserRole,
    DEFAULT_STREAM_DELAY_MS, DEFAULT_TOPIC, THINKING_PLACEHOLDER,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::classifier::RelevanceClassifier;
use crate::code_runner::{ExecutionOutput, PythonRunner};
use crate::generator::ResponseGenerator;
use crate::history::{record, HistoryStore};
use crate::renderer::{render_chunks, render_stream_cancellable, DisplaySink};
use crate::session::SessionState;

fn enter(state: &mut SessionState, path: &mut Vec<TurnPhase>, phase: TurnPhase) {
    state.phase = phase;
    path.push(phase);
}

#[derive(Debug, Clone)]
pub struct TutorConfig {
    pub topic: String,
    /// Pause after each revealed word
    pub stream_delay: Duration,
    /// Render model deltas as they arrive instead of the word-by-word replay
    pub live_streaming: bool,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            stream_delay: Duration::from_millis(DEFAULT_STREAM_DELAY_MS),
            live_streaming: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnOutcome {
    Answered,
    Rejected,
    Failed,
}

/// How a turn ended and which phases it went through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    pub turn: Turn,
    pub outcome: TurnOutcome,
    pub path: Vec<TurnPhase>,
}

/// Result of running a snippet through the code helper
#[derive(Debug, Clone, Serialize)]
pub struct CodeReport {
    pub output: ExecutionOutput,
    /// Model walkthrough; only requested when the snippet succeeded
    pub explanation: Option<String>,
}

/// The tutor pipeline shared by every session
pub struct Tutor {
    classifier: RelevanceClassifier,
    generator: ResponseGenerator,
    history: Option<HistoryStore>,
    runner: PythonRunner,
    config: TutorConfig,
}

impl Tutor {
    pub fn new(client: Arc<dyn LlmClient>, config: TutorConfig) -> Self {
        Self {
            classifier: RelevanceClassifier::new(client.clone(), config.topic.clone()),
            generator: ResponseGenerator::new(client),
            history: None,
            runner: PythonRunner::default(),
            config,
        }
    }

    /// Persist every recorded turn to `store`
    pub fn with_history(mut self, store: HistoryStore) -> Self {
        self.history = Some(store);
        self
    }

    pub fn with_runner(mut self, runner: PythonRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn config(&self) -> &TutorConfig {
        &self.config
    }

    pub fn history(&self) -> Option<&HistoryStore> {
        self.history.as_ref()
    }

    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    /// Fresh session, seeded from the history file when persistence is on.
    ///
    /// An unreadable file is logged and treated as empty.
    pub fn new_session(&self, username: impl Into<String>, role: UserRole) -> SessionState {
        let turns = match &self.history {
            Some(store) => store.load().unwrap_or_else(|e| {
                log::warn!("starting with empty history: {}", e);
                Vec::new()
            }),
            None => Vec::new(),
        };
        SessionState::new(username, role).with_turns(turns)
    }

    /// Run one question through the pipeline, driving the sink to completion
    pub async fn handle_question(
        &self,
        state: &mut SessionState,
        question: &str,
        sink: &mut dyn DisplaySink,
    ) -> Result<TurnReport, TutorError> {
        self.handle_question_cancellable(state, question, sink, &CancellationToken::new())
            .await
    }

    /// Like [`Tutor::handle_question`]; cancelling skips the rest of the typing effect
    pub async fn handle_question_cancellable(
        &self,
        state: &mut SessionState,
        question: &str,
        sink: &mut dyn DisplaySink,
        cancel: &CancellationToken,
    ) -> Result<TurnReport, TutorError> {
        if state.is_generating {
            return Err(TutorError::Busy);
        }
        let question = question.trim();
        if question.is_empty() {
            return Err(TutorError::EmptyQuestion);
        }

        state.begin_turn(question);
        sink.append_block(Speaker::User, question).await;
        sink.append_block(Speaker::Assistant, THINKING_PLACEHOLDER).await;

        let mut path = Vec::with_capacity(4);
        enter(state, &mut path, TurnPhase::Classifying);
        let (answer, outcome) = match self.classifier.classify(question).await {
            Ok(true) => {
                enter(state, &mut path, TurnPhase::Generating);
                match self.answer(state, &mut path, question, sink, cancel).await {
                    Ok(answer) => (answer, TurnOutcome::Answered),
                    Err(e) => (self.show_failure(&e, sink).await, TurnOutcome::Failed),
                }
            }
            Ok(false) => {
                enter(state, &mut path, TurnPhase::Rejected);
                let message = rejection_message(self.classifier.topic());
                sink.finish_block(&message).await;
                (message, TurnOutcome::Rejected)
            }
            Err(e) => (self.show_failure(&e, sink).await, TurnOutcome::Failed),
        };

        let turn = record(&mut state.turns, question, answer).clone();
        self.persist(&state.turns);

        state.end_turn();
        path.push(TurnPhase::Idle);

        log::info!("turn finished: {:?} via {:?}", outcome, path);
        Ok(TurnReport { turn, outcome, path })
    }

    async fn answer(
        &self,
        state: &mut SessionState,
        path: &mut Vec<TurnPhase>,
        question: &str,
        sink: &mut dyn DisplaySink,
        cancel: &CancellationToken,
    ) -> Result<String, TutorError> {
        if self.config.live_streaming {
            let chunks = self.generator.generate_streaming(question).await?;
            enter(state, path, TurnPhase::Streaming);
            return render_chunks(chunks, sink).await;
        }

        let answer = self.generator.generate(question).await?;
        enter(state, path, TurnPhase::Streaming);
        render_stream_cancellable(&answer, sink, self.config.stream_delay, cancel).await;
        Ok(answer)
    }

    async fn show_failure(&self, error: &TutorError, sink: &mut dyn DisplaySink) -> String {
        log::warn!("turn failed: {}", error);
        let message = error_answer(&error.to_string());
        sink.finish_block(&message).await;
        message
    }

    fn persist(&self, turns: &[Turn]) {
        if let Some(store) = &self.history {
            if let Err(e) = store.persist(turns) {
                log::warn!("{}", e);
            }
        }
    }

    /// Empty the session's turns and, with persistence on, the history file
    pub fn clear_history(&self, state: &mut SessionState) -> Result<(), TutorError> {
        state.reset();
        match &self.history {
            Some(store) => store.persist(&state.turns),
            None => Ok(()),
        }
    }

    /// Run a snippet and, when it succeeds, ask the model to explain it
    pub async fn run_code(&self, code: &str) -> Result<CodeReport, TutorError> {
        let output = self.runner.run(code).await?;
        let explanation = if output.success {
            Some(
                self.generator
                    .explain_code(code)
                    .await
                    .unwrap_or_else(|e| format!("⚠️ API Error: {}", e)),
            )
        } else {
            None
        };
        Ok(CodeReport { output, explanation })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::MemorySink;
    use crate::test_support::ScriptedClient;
    use dstutor_types::CURSOR_GLYPH;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn quiet_config() -> TutorConfig {
        TutorConfig {
            stream_delay: Duration::ZERO,
            ..TutorConfig::default()
        }
    }

    fn tutor(client: ScriptedClient) -> (Tutor, Arc<ScriptedClient>) {
        let client = Arc::new(client);
        (Tutor::new(client.clone(), quiet_config()), client)
    }

    #[tokio::test]
    async fn test_accepted_question_is_answered_and_streamed() {
        let (tutor, _) = tutor(ScriptedClient::tutor("yes", "alpha beta gamma"));
        let mut state = SessionState::default();
        let mut sink = MemorySink::new();

        let report = tutor.handle_question(&mut state, "What is PCA?", &mut sink).await.unwrap();

        assert_eq!(report.outcome, TurnOutcome::Answered);
        assert_eq!(
            report.path,
            vec![TurnPhase::Classifying, TurnPhase::Generating, TurnPhase::Streaming, TurnPhase::Idle]
        );
        assert_eq!(report.turn, Turn::new("What is PCA?", "alpha beta gamma"));
        assert_eq!(
            sink.blocks,
            vec![
                (Speaker::User, "What is PCA?".to_string()),
                (Speaker::Assistant, "alpha beta gamma".to_string()),
            ]
        );
        assert_eq!(sink.frames.iter().filter(|f| f.ends_with(CURSOR_GLYPH)).count(), 3);
        assert!(state.is_idle());
        assert_eq!(state.turns.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_question_skips_generation() {
        let (tutor, client) = tutor(ScriptedClient::tutor("no", "should not be used"));
        let mut state = SessionState::default();
        let mut sink = MemorySink::new();

        let report = tutor.handle_question(&mut state, "Best pizza topping?", &mut sink).await.unwrap();

        assert_eq!(report.outcome, TurnOutcome::Rejected);
        assert_eq!(report.path, vec![TurnPhase::Classifying, TurnPhase::Rejected, TurnPhase::Idle]);
        assert_eq!(report.turn.answer, rejection_message(DEFAULT_TOPIC));
        assert_eq!(client.answer_calls(), 0);
    }

    #[tokio::test]
    async fn test_generation_failure_records_one_error_turn() {
        let (tutor, _) = tutor(ScriptedClient::tutor("yes", "").answer_fails("HTTP 503"));
        let mut state = SessionState::default();
        let mut sink = MemorySink::new();

        let report = tutor.handle_question(&mut state, "What is PCA?", &mut sink).await.unwrap();

        assert_eq!(report.outcome, TurnOutcome::Failed);
        assert_eq!(state.turns.len(), 1);
        assert!(state.turns[0].answer.starts_with("Sorry, I encountered an error:"));
        assert!(state.turns[0].answer.contains("HTTP 503"));
        assert_eq!(sink.last_block(), Some(state.turns[0].answer.as_str()));
        assert!(state.is_idle());

        // Session still accepts input
        let next = tutor.handle_question(&mut state, "Again?", &mut sink).await;
        assert!(next.is_ok());
        assert_eq!(state.turns.len(), 2);
    }

    #[tokio::test]
    async fn test_classifier_failure_is_recorded() {
        let (tutor, _) = tutor(ScriptedClient::failing("invalid api key"));
        let mut state = SessionState::default();
        let mut sink = MemorySink::new();

        let report = tutor.handle_question(&mut state, "q", &mut sink).await.unwrap();
        assert_eq!(report.outcome, TurnOutcome::Failed);
        assert_eq!(report.path, vec![TurnPhase::Classifying, TurnPhase::Idle]);
        assert!(report.turn.answer.contains("invalid api key"));
    }

    #[tokio::test]
    async fn test_busy_session_rejects_input_without_recording() {
        let (tutor, client) = tutor(ScriptedClient::tutor("yes", "a"));
        let mut state = SessionState::default();
        state.is_generating = true;
        let mut sink = MemorySink::new();

        let err = tutor.handle_question(&mut state, "q", &mut sink).await.unwrap_err();

        assert_eq!(err, TutorError::Busy);
        assert!(state.turns.is_empty());
        assert!(sink.blocks.is_empty());
        assert!(client.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_blank_question_is_refused() {
        let (tutor, _) = tutor(ScriptedClient::tutor("yes", "a"));
        let mut state = SessionState::default();
        let err = tutor
            .handle_question(&mut state, "   \n", &mut MemorySink::new())
            .await
            .unwrap_err();
        assert_eq!(err, TutorError::EmptyQuestion);
        assert!(state.is_idle());
    }

    #[tokio::test]
    async fn test_live_streaming_path() {
        let client = Arc::new(ScriptedClient::tutor("YES", "streamed answer"));
        let tutor = Tutor::new(
            client,
            TutorConfig {
                live_streaming: true,
                ..quiet_config()
            },
        );
        let mut state = SessionState::default();
        let mut sink = MemorySink::new();

        let report = tutor.handle_question(&mut state, "q", &mut sink).await.unwrap();
        assert_eq!(report.turn.answer, "streamed answer");
        assert_eq!(sink.frames, vec!["streamed answer▌".to_string(), "streamed answer".to_string()]);
    }

    #[tokio::test]
    async fn test_turns_persist_and_reload() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("chat_history.json"));
        let (tutor, _) = tutor(ScriptedClient::tutor("yes", "answer"));
        let tutor = tutor.with_history(store.clone());

        let mut state = tutor.new_session("alice", UserRole::User);
        for q in ["one", "two", "three"] {
            tutor.handle_question(&mut state, q, &mut MemorySink::new()).await.unwrap();
        }

        let reloaded = tutor.new_session("alice", UserRole::User);
        assert_eq!(reloaded.turns, state.turns);
        assert_eq!(store.load().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unwritable_history_keeps_session_going() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be makes every write fail
        let store = HistoryStore::new(dir.path());
        let (tutor, _) = tutor(ScriptedClient::tutor("yes", "still answered"));
        let tutor = tutor.with_history(store.clone());

        let mut state = tutor.new_session("alice", UserRole::User);
        let report = tutor
            .handle_question(&mut state, "What is PCA?", &mut MemorySink::new())
            .await
            .unwrap();

        assert_eq!(report.outcome, TurnOutcome::Answered);
        assert_eq!(state.turns, vec![Turn::new("What is PCA?", "still answered")]);
        assert!(state.is_idle());
        assert!(matches!(store.persist(&state.turns), Err(TutorError::PersistenceFailure(_))));

        tutor.handle_question(&mut state, "And SVD?", &mut MemorySink::new()).await.unwrap();
        assert_eq!(state.turns.len(), 2);
    }

    #[tokio::test]
    async fn test_clear_history_persists_empty_file() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("chat_history.json"));
        let (tutor, _) = tutor(ScriptedClient::tutor("yes", "answer"));
        let tutor = tutor.with_history(store.clone());

        let mut state = tutor.new_session("alice", UserRole::User);
        tutor.handle_question(&mut state, "q", &mut MemorySink::new()).await.unwrap();
        tutor.clear_history(&mut state).unwrap();

        assert!(state.turns.is_empty());
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_run_code_with_missing_interpreter() {
        let dir = TempDir::new().unwrap();
        let (tutor, client) = tutor(ScriptedClient::always("explained"));
        let tutor = tutor.with_runner(PythonRunner::new("no-such-python").with_work_root(dir.path()));

        let err = tutor.run_code("print(1)").await.unwrap_err();
        assert!(matches!(err, TutorError::CodeExecution(_)));
        assert!(client.prompts().is_empty());
    }
}
