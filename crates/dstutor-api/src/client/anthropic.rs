use anyhow::{Context, Result};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

use crate::client::{describe_error, sse_data_events, ChunkStream, LlmClient, ModelReply, StreamingChunk};
use crate::request_logger::{log_request, log_request_to_file, log_response};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

/// Anthropic LLM client implementation using native Anthropic API
pub struct AnthropicLlmClient {
    api_key: String,
    model: String,
    base_url: String,
    verbose: bool,
    client: reqwest::Client,
}

impl AnthropicLlmClient {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        // Ensure base_url doesn't end with a slash
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            api_key,
            model,
            base_url,
            verbose: false,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn get_messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    fn build_request(&self, prompt: &str, stream: bool) -> Value {
        let mut request = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": [{ "role": "user", "content": prompt }],
        });
        if stream {
            request["stream"] = Value::Bool(true);
        }
        request
    }

    fn post(&self, request: &Value) -> reqwest::RequestBuilder {
        self.client
            .post(self.get_messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(request)
    }

    fn collect_text(response: &Value) -> String {
        response["content"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter(|item| item["type"].as_str() == Some("text"))
                    .filter_map(|item| item["text"].as_str())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    /// Parse one SSE payload and return a chunk if it carries text or a stop reason
    fn parse_event(data: &str) -> Option<StreamingChunk> {
        let event: Value = serde_json::from_str(data).ok()?;
        match event["type"].as_str()? {
            "content_block_delta" => {
                let text = event["delta"]["text"].as_str()?;
                Some(StreamingChunk {
                    delta: text.to_string(),
                    finish_reason: None,
                })
            }
            "message_delta" => event["delta"]["stop_reason"].as_str().map(|reason| StreamingChunk {
                delta: String::new(),
                finish_reason: Some(reason.to_string()),
            }),
            _ => None,
        }
    }
}

#[async_trait]
impl LlmClient for AnthropicLlmClient {
    async fn invoke(&self, prompt: &str) -> Result<ModelReply> {
        let url = self.get_messages_url();
        let request = self.build_request(prompt, false);

        log_request(&url, &request, &self.api_key, self.verbose);
        if self.verbose {
            let _ = log_request_to_file(&url, &request, &self.model, &self.api_key);
        }

        let response = self
            .post(&request)
            .send()
            .await
            .context("Anthropic request failed")?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        log_response(&status, &headers, &body, self.verbose);

        if !status.is_success() {
            return Err(describe_error("Anthropic", status, &body));
        }

        let parsed: Value = serde_json::from_str(&body).context("Failed to parse Anthropic response")?;
        Ok(ModelReply::new(Self::collect_text(&parsed)))
    }

    async fn invoke_streaming(&self, prompt: &str) -> Result<ChunkStream> {
        let url = self.get_messages_url();
        let request = self.build_request(prompt, true);
        log_request(&url, &request, &self.api_key, self.verbose);

        let response = self
            .post(&request)
            .header("Accept", "text/event-stream")
            .send()
            .await
            .context("Anthropic streaming request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(describe_error("Anthropic", status, &body));
        }

        let mut events = Box::pin(sse_data_events(response));
        let chunks = stream! {
            while let Some(event) = events.next().await {
                match event {
                    Ok(data) => {
                        if let Some(chunk) = Self::parse_event(&data) {
                            yield Ok(chunk);
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        };

        Ok(Box::new(Box::pin(chunks)))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_event_text_delta() {
        let chunk = AnthropicLlmClient::parse_event(
            r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hello"}}"#,
        )
        .unwrap();
        assert_eq!(chunk.delta, "Hello");
        assert_eq!(chunk.finish_reason, None);
    }

    #[test]
    fn test_parse_event_stop_reason() {
        let chunk = AnthropicLlmClient::parse_event(
            r#"{"type":"message_delta","delta":{"stop_reason":"end_turn"}}"#,
        )
        .unwrap();
        assert_eq!(chunk.finish_reason.as_deref(), Some("end_turn"));
    }

    #[test]
    fn test_parse_event_ignores_other_events() {
        assert!(AnthropicLlmClient::parse_event(r#"{"type":"ping"}"#).is_none());
        assert!(AnthropicLlmClient::parse_event("not json").is_none());
    }

    #[test]
    fn test_collect_text_skips_non_text_blocks() {
        let response = json!({
            "content": [
                {"type": "text", "text": "A "},
                {"type": "tool_use", "id": "x"},
                {"type": "text", "text": "reply"}
            ]
        });
        assert_eq!(AnthropicLlmClient::collect_text(&response), "A reply");
    }
}
