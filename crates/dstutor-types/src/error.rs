use thiserror::Error;

/// Failures the tutor pipeline can report.
///
/// Only `ConfigurationMissing` is fatal; model-call failures are turned into
/// error turns by the orchestrator and persistence failures are logged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TutorError {
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("classification failed: {0}")]
    ClassificationFailure(String),

    #[error("generation failed: {0}")]
    GenerationFailure(String),

    #[error("could not persist chat history: {0}")]
    PersistenceFailure(String),

    #[error("code execution failed: {0}")]
    CodeExecution(String),

    #[error("a response is already being generated for this session")]
    Busy,

    #[error("question is empty")]
    EmptyQuestion,
}

impl TutorError {
    /// Whether the session can keep accepting input after this error
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, TutorError::ConfigurationMissing(_))
    }
}
