use anyhow::{Context, Result};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;

use crate::client::{describe_error, sse_data_events, ChunkStream, LlmClient, ModelReply, StreamingChunk};
use crate::request_logger::{log_request, log_request_to_file, log_response};

/// OpenAI-compatible chat completions client.
///
/// Serves Groq, OpenAI and llama.cpp servers; an empty key skips the
/// Authorization header.
pub struct GroqLlmClient {
    api_key: String,
    model: String,
    api_url: String,
    provider: String,
    verbose: bool,
    client: reqwest::Client,
}

impl GroqLlmClient {
    pub fn new(api_key: String, model: String, api_url: String) -> Self {
        Self {
            api_key,
            model,
            api_url,
            provider: "Groq".to_string(),
            verbose: false,
            client: reqwest::Client::new(),
        }
    }

    /// Name used in error messages ("OpenAI", "llama.cpp", ...)
    pub fn with_provider(mut self, provider: &str) -> Self {
        self.provider = provider.to_string();
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn build_request(&self, prompt: &str, stream: bool) -> serde_json::Value {
        let mut request = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });
        if stream {
            request["stream"] = serde_json::Value::Bool(true);
        }
        request
    }

    fn post(&self, request: &serde_json::Value) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .json(request);
        if self.api_key.is_empty() {
            builder
        } else {
            builder.header("Authorization", format!("Bearer {}", self.api_key))
        }
    }
}

#[async_trait]
impl LlmClient for GroqLlmClient {
    async fn invoke(&self, prompt: &str) -> Result<ModelReply> {
        let request = self.build_request(prompt, false);

        log_request(&self.api_url, &request, &self.api_key, self.verbose);
        if self.verbose {
            let _ = log_request_to_file(&self.api_url, &request, &self.model, &self.api_key);
        }

        let response = self
            .post(&request)
            .send()
            .await
            .with_context(|| format!("{} request failed", self.provider))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        log_response(&status, &headers, &body, self.verbose);

        if !status.is_success() {
            return Err(describe_error(&self.provider, status, &body));
        }

        let chat_response: serde_json::Value = serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse {} response", self.provider))?;

        if let Some(content) = chat_response["choices"][0]["message"]["content"].as_str() {
            Ok(ModelReply::new(content))
        } else {
            Err(anyhow::anyhow!("No content in {} response", self.provider))
        }
    }

    async fn invoke_streaming(&self, prompt: &str) -> Result<ChunkStream> {
        let request = self.build_request(prompt, true);
        log_request(&self.api_url, &request, &self.api_key, self.verbose);

        let response = self
            .post(&request)
            .header("Accept", "text/event-stream")
            .send()
            .await
            .with_context(|| format!("{} streaming request failed", self.provider))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(describe_error(&self.provider, status, &body));
        }

        let mut events = Box::pin(sse_data_events(response));
        let chunks = stream! {
            while let Some(event) = events.next().await {
                let data = match event {
                    Ok(data) => data,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                // Check for stream end marker
                if data.trim() == "[DONE]" {
                    break;
                }

                let chunk: serde_json::Value = match serde_json::from_str(&data) {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        log::debug!("skipping unparseable stream chunk: {}", e);
                        continue;
                    }
                };
                let choice = &chunk["choices"][0];
                let delta = choice["delta"]["content"].as_str().unwrap_or_default().to_string();
                let finish_reason = choice["finish_reason"].as_str().map(|s| s.to_string());
                if !delta.is_empty() || finish_reason.is_some() {
                    yield Ok(StreamingChunk { delta, finish_reason });
                }
            }
        };

        Ok(Box::new(Box::pin(chunks)))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
