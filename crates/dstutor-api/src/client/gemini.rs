use anyhow::{Context, Result};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;

use crate::client::{describe_error, sse_data_events, ChunkStream, LlmClient, ModelReply, StreamingChunk};
use crate::request_logger::{log_request, log_request_to_file, log_response};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    fn finish_reason(&self) -> Option<String> {
        self.candidates.first().and_then(|c| c.finish_reason.clone())
    }

    fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
    }
}

/// Google Gemini client using the `generateContent` REST API
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    verbose: bool,
    client: reqwest::Client,
}

impl GeminiClient {
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

    fn method_url(&self, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.base_url, self.model, method)
    }

    fn build_request(prompt: &str) -> serde_json::Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }]
        })
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn invoke(&self, prompt: &str) -> Result<ModelReply> {
        let url = self.method_url("generateContent");
        let request = Self::build_request(prompt);

        log_request(&url, &request, &self.api_key, self.verbose);
        if self.verbose {
            let _ = log_request_to_file(&url, &request, &self.model, &self.api_key);
        }

        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        log_response(&status, &headers, &body, self.verbose);

        if !status.is_success() {
            return Err(describe_error("Gemini", status, &body));
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&body).context("Failed to parse Gemini response")?;

        if parsed.candidates.is_empty() {
            if let Some(reason) = parsed.block_reason() {
                return Err(anyhow::anyhow!("Gemini blocked the prompt: {}", reason));
            }
            return Err(anyhow::anyhow!("Gemini returned no candidates"));
        }

        Ok(ModelReply::new(parsed.text()))
    }

    async fn invoke_streaming(&self, prompt: &str) -> Result<ChunkStream> {
        let url = self.method_url("streamGenerateContent");
        let request = Self::build_request(prompt);

        log_request(&url, &request, &self.api_key, self.verbose);

        let response = self
            .client
            .post(&url)
            .query(&[("alt", "sse"), ("key", self.api_key.as_str())])
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&request)
            .send()
            .await
            .context("Gemini streaming request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(describe_error("Gemini", status, &body));
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
                match serde_json::from_str::<GenerateContentResponse>(&data) {
                    Ok(parsed) => {
                        let delta = parsed.text();
                        let finish_reason = parsed.finish_reason();
                        if !delta.is_empty() || finish_reason.is_some() {
                            yield Ok(StreamingChunk { delta, finish_reason });
                        }
                    }
                    Err(e) => log::debug!("skipping unparseable Gemini event: {}", e),
                }
            }
        };

        Ok(Box::new(Box::pin(chunks)))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
