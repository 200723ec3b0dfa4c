use std::sync::Arc;

use dstutor_api::{ChunkStream, LlmClient};
use dstutor_types::TutorError;

/// Produces answers by sending the raw question to the model
pub struct ResponseGenerator {
    client: Arc<dyn LlmClient>,
}

impl ResponseGenerator {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// One model call, full text back. No retry.
    pub async fn generate(&self, question: &str) -> Result<String, TutorError> {
        let reply = self
            .client
            .invoke(question)
            .await
            .map_err(|e| TutorError::GenerationFailure(format!("{:#}", e)))?;
        Ok(reply.content)
    }

    /// Token-level deltas when the backend streams, otherwise one chunk
    pub async fn generate_streaming(&self, question: &str) -> Result<ChunkStream, TutorError> {
        self.client
            .invoke_streaming(question)
            .await
            .map_err(|e| TutorError::GenerationFailure(format!("{:#}", e)))
    }

    /// Ask for a walkthrough of a code snippet
    pub async fn explain_code(&self, code: &str) -> Result<String, TutorError> {
        self.generate(&format!("Explain this Python code: {}", code)).await
    }
}
