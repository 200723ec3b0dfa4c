use std::sync::Mutex;

use async_trait::async_trait;
use dstutor_api::{LlmClient, ModelReply};

/// Canned model: classifier prompts get `verdict`, everything else gets `answer`
pub struct ScriptedClient {
    verdict: Result<String, String>,
    answer: Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn tutor(verdict: &str, answer: &str) -> Self {
        Self {
            verdict: Ok(verdict.to_string()),
            answer: Ok(answer.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn always(reply: &str) -> Self {
        Self::tutor(reply, reply)
    }

    pub fn failing(message: &str) -> Self {
        Self {
            verdict: Err(message.to_string()),
            answer: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn answer_fails(mut self, message: &str) -> Self {
        self.answer = Err(message.to_string());
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn answer_calls(&self) -> usize {
        self.prompts()
            .iter()
            .filter(|p| !p.starts_with("You are an AI tutor for "))
            .count()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn invoke(&self, prompt: &str) -> anyhow::Result<ModelReply> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let reply = if prompt.starts_with("You are an AI tutor for ") {
            &self.verdict
        } else {
            &self.answer
        };
        match reply {
            Ok(text) => Ok(ModelReply::new(text.clone())),
            Err(message) => Err(anyhow::anyhow!("{}", message)),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
