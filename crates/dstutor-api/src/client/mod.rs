use anyhow::Result;
use async_stream::stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

pub mod anthropic;
pub mod gemini;
pub mod groq;

/// Full text returned by a single model call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelReply {
    pub content: String,
}

impl ModelReply {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Streaming chunk for LLM responses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamingChunk {
    pub delta: String,
    pub finish_reason: Option<String>,
}

/// Stream of text deltas from a streaming call
pub type ChunkStream = Box<dyn Stream<Item = Result<StreamingChunk>> + Send + Unpin>;

/// LLM client trait - unified interface for all LLM providers
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one prompt and return the complete text of the answer
    async fn invoke(&self, prompt: &str) -> Result<ModelReply>;

    /// Streaming variant of `invoke`.
    ///
    /// Backends without token-level streaming yield the whole answer as one chunk.
    async fn invoke_streaming(&self, prompt: &str) -> Result<ChunkStream> {
        let reply = self.invoke(prompt).await?;
        let chunk = StreamingChunk {
            delta: reply.content,
            finish_reason: Some("stop".to_string()),
        };
        Ok(Box::new(futures::stream::iter(vec![Ok(chunk)])))
    }

    /// Model identifier sent to the provider
    fn model_name(&self) -> &str;
}

/// Split a server-sent-events body into the payloads of its `data:` lines.
///
/// `\r\n` framing is accepted.
pub(crate) fn sse_data_events(
    response: reqwest::Response,
) -> impl Stream<Item = Result<String>> + Send {
    sse_data_lines(response.bytes_stream())
}

/// Byte-level SSE line splitter.
///
/// Bytes are buffered until a full `\n`-terminated line is available, so
/// multi-byte characters and `\r\n` pairs may straddle network chunks.
fn sse_data_lines<S, B, E>(bytes: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = std::result::Result<B, E>> + Send,
    B: AsRef<[u8]> + Send,
    E: std::fmt::Display + Send,
{
    stream! {
        let mut byte_stream = Box::pin(bytes);
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(chunk_result) = byte_stream.next().await {
            let chunk = match chunk_result {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(anyhow::anyhow!("stream read failed: {}", e));
                    return;
                }
            };
            buffer.extend_from_slice(chunk.as_ref());

            while let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=newline).collect();
                if let Some(data) = data_payload(&line) {
                    yield data;
                }
            }
        }

        // Trailing line without a newline
        if let Some(data) = data_payload(&buffer) {
            yield data;
        }
    }
}

fn data_payload(line: &[u8]) -> Option<Result<String>> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let data = line.strip_prefix(b"data:")?;
    Some(
        std::str::from_utf8(data)
            .map(|text| text.trim_start().to_string())
            .map_err(|e| anyhow::anyhow!("invalid UTF-8 in event stream: {}", e)),
    )
}

/// Collapse a provider error body into a single readable line
pub(crate) fn describe_error(provider: &str, status: reqwest::StatusCode, body: &str) -> anyhow::Error {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v["error"]["message"]
                .as_str()
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| body.trim().to_string());
    anyhow::anyhow!("{} API error ({}): {}", provider, status.as_u16(), message)
}
