#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dstutor_api::{LlmClient, ModelReply};
use dstutor_chat::TutorConfig;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Common test utilities for pipeline testing
pub struct TestFixtures {
    pub temp_dir: TempDir,
}

impl TestFixtures {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn history_path(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("chat_history.json")
    }
}

pub fn fast_config() -> TutorConfig {
    TutorConfig {
        stream_delay: Duration::ZERO,
        ..TutorConfig::default()
    }
}

/// Model that always gives the same verdict and counts non-classifier calls
pub struct FixedVerdictClient {
    verdict: String,
    pub classifier_calls: AtomicUsize,
    pub answer_calls: AtomicUsize,
}

impl FixedVerdictClient {
    pub fn new(verdict: &str) -> Self {
        Self {
            verdict: verdict.to_string(),
            classifier_calls: AtomicUsize::new(0),
            answer_calls: AtomicUsize::new(0),
        }
    }

    pub fn answers(&self) -> usize {
        self.answer_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for FixedVerdictClient {
    async fn invoke(&self, prompt: &str) -> anyhow::Result<ModelReply> {
        if prompt.contains("Answer with just **YES** or **NO**") {
            self.classifier_calls.fetch_add(1, Ordering::SeqCst);
            Ok(ModelReply::new(self.verdict.clone()))
        } else {
            self.answer_calls.fetch_add(1, Ordering::SeqCst);
            Ok(ModelReply::new(format!("answer to: {}", prompt)))
        }
    }

    fn model_name(&self) -> &str {
        "fixed-verdict"
    }
}

fn gemini_reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    }))
}

/// Gemini stand-in: classifier prompts get `verdict`, other prompts get `answer`
pub async fn gemini_tutor_server(verdict: &str, answer: &str) -> MockServer {
    let server = MockServer::start().await;
    let endpoint = format!("/v1beta/models/{}:generateContent", GEMINI_MODEL);

    Mock::given(method("POST"))
        .and(path(endpoint.clone()))
        .and(body_string_contains("Answer with just **YES** or **NO**"))
        .respond_with(gemini_reply(verdict))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(endpoint))
        .respond_with(gemini_reply(answer))
        .mount(&server)
        .await;

    server
}
