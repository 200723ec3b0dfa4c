use std::sync::Arc;

use dstutor_api::LlmClient;
use dstutor_types::TutorError;

/// Instruction prompt asking the model for a bare YES/NO topic verdict
pub fn build_classifier_prompt(topic: &str, question: &str) -> String {
    format!(
        "You are an AI tutor for {topic}.\n\
         - Check if the following question is **strictly** related to {topic}.\n\
         - Answer with just **YES** or **NO** (no explanations).\n\
         \n\
         Question: \"{question}\""
    )
}

/// Only an exact "yes" (after trimming and lowercasing) counts as on-topic
pub fn is_affirmative(reply: &str) -> bool {
    reply.trim().to_lowercase() == "yes"
}

/// Topic gate in front of the answer generator
pub struct RelevanceClassifier {
    client: Arc<dyn LlmClient>,
    topic: String,
}

impl RelevanceClassifier {
    pub fn new(client: Arc<dyn LlmClient>, topic: impl Into<String>) -> Self {
        Self {
            client,
            topic: topic.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Ask the model whether `question` belongs to the topic.
    ///
    /// Anything other than "yes" is a rejection, including empty or chatty replies.
    pub async fn classify(&self, question: &str) -> Result<bool, TutorError> {
        let prompt = build_classifier_prompt(&self.topic, question);
        let reply = self
            .client
            .invoke(&prompt)
            .await
            .map_err(|e| TutorError::ClassificationFailure(format!("{:#}", e)))?;

        let relevant = is_affirmative(&reply.content);
        log::debug!(
            "classifier verdict {:?} -> {}",
            reply.content.trim(),
            if relevant { "accept" } else { "reject" }
        );
        Ok(relevant)
    }
}
