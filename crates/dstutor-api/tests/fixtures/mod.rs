#![allow(dead_code)]

use serde_json::json;
use wiremock::matchers::*;
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_API_KEY: &str = "test-api-key";
pub const GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const GROQ_MODEL: &str = "llama-3.1-70b-versatile";
pub const ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";

/// Mock server utilities for testing LLM API clients
pub struct LLMMockServer {
    server: MockServer,
}

impl LLMMockServer {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Chat-completions URL as the Groq client expects it
    pub fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.server.uri())
    }

    pub async fn received_bodies(&self) -> Vec<serde_json::Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }

    /// Mock successful Gemini generateContent response
    pub async fn mock_gemini_success(&self, request_content: &str, response_content: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/v1beta/models/{}:generateContent", GEMINI_MODEL)))
            .and(query_param("key", TEST_API_KEY))
            .and(body_partial_json(json!({
                "contents": [{
                    "role": "user",
                    "parts": [{ "text": request_content }]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {
                        "role": "model",
                        "parts": [{ "text": response_content }]
                    },
                    "finishReason": "STOP",
                    "index": 0
                }],
                "usageMetadata": {
                    "promptTokenCount": 10,
                    "candidatesTokenCount": 20,
                    "totalTokenCount": 30
                }
            })))
            .mount(&self.server)
            .await;
    }

    /// Gemini answers every prompt with the same text
    pub async fn mock_gemini_any(&self, response_content: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/v1beta/models/{}:generateContent", GEMINI_MODEL)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": response_content }] },
                    "finishReason": "STOP"
                }]
            })))
            .mount(&self.server)
            .await;
    }

    /// Gemini refusing the prompt with a safety block
    pub async fn mock_gemini_blocked(&self, reason: &str) {
        Mock::given(method("POST"))
            .and(path(format!("/v1beta/models/{}:generateContent", GEMINI_MODEL)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": { "blockReason": reason }
            })))
            .mount(&self.server)
            .await;
    }

    /// Mock Gemini API error response
    pub async fn mock_gemini_error(&self, status: u16, error_message: &str) {
        Mock::given(method("POST"))
            .and(path_regex(r"^/v1beta/models/.*"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "error": {
                    "code": status,
                    "message": error_message,
                    "status": "INVALID_ARGUMENT"
                }
            })))
            .mount(&self.server)
            .await;
    }

    /// Mock Gemini streamGenerateContent with one SSE event per chunk
    pub async fn mock_gemini_streaming(&self, response_chunks: &[&str]) {
        let mut body = String::new();
        for (index, chunk) in response_chunks.iter().enumerate() {
            let mut candidate = json!({ "content": { "parts": [{ "text": chunk }] } });
            if index == response_chunks.len() - 1 {
                candidate["finishReason"] = json!("STOP");
            }
            body.push_str(&format!("data: {}\r\n\r\n", json!({ "candidates": [candidate] })));
        }

        Mock::given(method("POST"))
            .and(path(format!("/v1beta/models/{}:streamGenerateContent", GEMINI_MODEL)))
            .and(query_param("alt", "sse"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&self.server)
            .await;
    }

    /// Mock successful Groq API response
    pub async fn mock_groq_success(&self, request_content: &str, response_content: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-api-key"))
            .and(body_partial_json(json!({
                "model": GROQ_MODEL,
                "messages": [{
                    "role": "user",
                    "content": request_content
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl_test123",
                "object": "chat.completion",
                "created": 1700000000,
                "model": GROQ_MODEL,
                "choices": [{
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": response_content
                    },
                    "finish_reason": "stop"
                }],
                "usage": {
                    "prompt_tokens": 10,
                    "completion_tokens": 20,
                    "total_tokens": 30
                }
            })))
            .mount(&self.server)
            .await;
    }

    /// Mock OpenAI-compatible streaming response terminated by [DONE]
    pub async fn mock_groq_streaming(&self, response_chunks: &[&str]) {
        let mut body = String::new();
        for chunk in response_chunks {
            let event = json!({
                "choices": [{ "index": 0, "delta": { "content": chunk }, "finish_reason": null }]
            });
            body.push_str(&format!("data: {}\n\n", event));
        }
        let last = json!({ "choices": [{ "index": 0, "delta": {}, "finish_reason": "stop" }] });
        body.push_str(&format!("data: {}\n\n", last));
        body.push_str("data: [DONE]\n\n");

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({ "stream": true })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&self.server)
            .await;
    }

    /// Mock successful Anthropic API response
    pub async fn mock_anthropic_success(&self, request_content: &str, response_content: &str) {
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", TEST_API_KEY))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(json!({
                "model": ANTHROPIC_MODEL,
                "messages": [{
                    "role": "user",
                    "content": request_content
                }],
                "max_tokens": 4096
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_test123",
                "type": "message",
                "role": "assistant",
                "content": [{
                    "type": "text",
                    "text": response_content
                }],
                "model": ANTHROPIC_MODEL,
                "stop_reason": "end_turn",
                "stop_sequence": null,
                "usage": {
                    "input_tokens": 10,
                    "output_tokens": 20
                }
            })))
            .mount(&self.server)
            .await;
    }

    /// Mock Anthropic API rate limit error
    pub async fn mock_anthropic_rate_limit(&self) {
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_json(json!({
                        "type": "error",
                        "error": {
                            "type": "rate_limit_error",
                            "message": "Rate limit exceeded"
                        }
                    }))
                    .insert_header("Retry-After", "60"),
            )
            .mount(&self.server)
            .await;
    }

    /// Mock server error with a non-JSON body
    pub async fn mock_server_error(&self) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&self.server)
            .await;
    }
}
