//! # dstutor-api
//!
//! A single prompt-in, text-out interface over the hosted LLM providers the
//! tutor can talk to:
//! - Google Gemini (default)
//! - Groq and OpenAI (OpenAI-compatible chat completions)
//! - Anthropic (Claude)
//! - llama.cpp (self-hosted, OpenAI-compatible)
//!
//! Calls are stateless: no conversation context is threaded between them.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dstutor_api::{BackendType, ClientFactory};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ClientFactory::create(
//!         BackendType::Gemini,
//!         Some("your-api-key".to_string()),
//!         "gemini-1.5-flash".to_string(),
//!         None,
//!     )?;
//!
//!     let reply = client.invoke("What is a p-value?").await?;
//!     println!("{}", reply.content);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod request_logger;

pub use client::{ChunkStream, LlmClient, ModelReply, StreamingChunk};
pub use client::{anthropic::AnthropicLlmClient, gemini::GeminiClient, groq::GroqLlmClient};

pub use config::{
    get_default_url_for_backend, normalize_api_url, parse_model_spec, BackendType, ClientFactory,
    ANTHROPIC_API_URL, GEMINI_API_URL, GROQ_API_URL, OPENAI_API_URL,
};
pub use request_logger::{get_logs_dir, safe_truncate};
