use std::env;
use std::sync::Arc;

use dstutor_types::TutorError;

use crate::client::{anthropic::AnthropicLlmClient, gemini::GeminiClient, groq::GroqLlmClient, LlmClient};
use crate::config::{normalize_api_url, BackendType, ANTHROPIC_API_URL, GEMINI_API_URL, GROQ_API_URL, OPENAI_API_URL};

/// Client factory for creating LLM clients
pub struct ClientFactory;

impl ClientFactory {
    /// Create an LLM client based on the specified backend type
    ///
    /// # Arguments
    /// * `backend` - The backend type to use
    /// * `api_key` - API key; falls back to the backend's environment variable
    /// * `model` - Model name to use
    /// * `api_url` - Optional custom API URL (uses default if None)
    ///
    /// # Errors
    /// `TutorError::ConfigurationMissing` when the backend needs a key and none
    /// is available, or when llama.cpp is selected without a URL.
    pub fn create(
        backend: BackendType,
        api_key: Option<String>,
        model: String,
        api_url: Option<String>,
    ) -> Result<Arc<dyn LlmClient>, TutorError> {
        Self::create_verbose(backend, api_key, model, api_url, false)
    }

    /// Same as [`ClientFactory::create`], optionally dumping requests and responses
    pub fn create_verbose(
        backend: BackendType,
        api_key: Option<String>,
        model: String,
        api_url: Option<String>,
        verbose: bool,
    ) -> Result<Arc<dyn LlmClient>, TutorError> {
        let key = Self::resolve_key(&backend, api_key)?;

        let client: Arc<dyn LlmClient> = match backend {
            BackendType::Gemini => {
                let url = api_url.unwrap_or_else(|| GEMINI_API_URL.to_string());
                Arc::new(GeminiClient::new(key, model, url).with_verbose(verbose))
            }
            BackendType::Anthropic => {
                let url = api_url.unwrap_or_else(|| ANTHROPIC_API_URL.to_string());
                Arc::new(AnthropicLlmClient::new(key, model, url).with_verbose(verbose))
            }
            BackendType::Groq => {
                let url = api_url
                    .map(|u| normalize_api_url(&u))
                    .unwrap_or_else(|| GROQ_API_URL.to_string());
                Arc::new(GroqLlmClient::new(key, model, url).with_verbose(verbose))
            }
            BackendType::OpenAI => {
                let url = api_url
                    .map(|u| normalize_api_url(&u))
                    .unwrap_or_else(|| OPENAI_API_URL.to_string());
                // OpenAI uses the same client as Groq (OpenAI-compatible)
                Arc::new(
                    GroqLlmClient::new(key, model, url)
                        .with_provider("OpenAI")
                        .with_verbose(verbose),
                )
            }
            BackendType::Llama => {
                let url = api_url.ok_or_else(|| {
                    TutorError::ConfigurationMissing(
                        "llama.cpp backend requires --api-url".to_string(),
                    )
                })?;
                Arc::new(
                    GroqLlmClient::new(key, model, normalize_api_url(&url))
                        .with_provider("llama.cpp")
                        .with_verbose(verbose),
                )
            }
        };

        log::debug!(
            "created {} client for model '{}'",
            backend.as_str(),
            client.model_name()
        );
        Ok(client)
    }

    /// Pick the explicit key, else the backend's environment variable
    fn resolve_key(backend: &BackendType, api_key: Option<String>) -> Result<String, TutorError> {
        let Some(env_name) = backend.api_key_env() else {
            return Ok(api_key.unwrap_or_default());
        };

        api_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| env::var(env_name).ok().filter(|k| !k.trim().is_empty()))
            .ok_or_else(|| {
                TutorError::ConfigurationMissing(format!(
                    "{} not found. Set it in the environment or a .env file, or pass --api-key.",
                    env_name
                ))
            })
    }
}
