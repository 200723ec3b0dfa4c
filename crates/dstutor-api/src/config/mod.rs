pub mod factory;
pub use factory::ClientFactory;

/// Backend type for LLM models
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    Gemini,
    Groq,
    Anthropic,
    Llama,
    OpenAI,
}

impl BackendType {
    /// Parse backend type from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Some(Self::Gemini),
            "groq" => Some(Self::Groq),
            "anthropic" | "claude" => Some(Self::Anthropic),
            "llama" | "llamacpp" | "llama.cpp" | "llama-cpp" => Some(Self::Llama),
            "openai" => Some(Self::OpenAI),
            _ => None,
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        match self {
            Self::Gemini => "gemini",
            Self::Groq => "groq",
            Self::Anthropic => "anthropic",
            Self::Llama => "llama",
            Self::OpenAI => "openai",
        }
    }

    /// Environment variable holding the API key, if the backend needs one
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::Gemini => Some("GOOGLE_API_KEY"),
            Self::Groq => Some("GROQ_API_KEY"),
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::OpenAI => Some("OPENAI_API_KEY"),
            Self::Llama => None,
        }
    }

    /// Model used when none is configured
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::Gemini => DEFAULT_GEMINI_MODEL,
            Self::Groq => DEFAULT_GROQ_MODEL,
            Self::Anthropic => DEFAULT_ANTHROPIC_MODEL,
            Self::OpenAI => DEFAULT_OPENAI_MODEL,
            Self::Llama => "default",
        }
    }
}

/// Default Gemini API URL
pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";

/// Default Groq API URL
pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Default Anthropic API URL
pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";

/// Default OpenAI API URL
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.1-70b-versatile";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Get the default URL for a given backend type
pub fn get_default_url_for_backend(backend: &BackendType) -> Option<String> {
    match backend {
        BackendType::Gemini => Some(GEMINI_API_URL.to_string()),
        BackendType::Anthropic => Some(ANTHROPIC_API_URL.to_string()),
        BackendType::Groq => Some(GROQ_API_URL.to_string()),
        BackendType::OpenAI => Some(OPENAI_API_URL.to_string()),
        BackendType::Llama => None, // Llama.cpp doesn't have a default URL
    }
}

/// Parse model configuration string in format "model@backend(api_url)" or "model@backend" or "model"
/// Returns (model_name, backend, api_url)
pub fn parse_model_spec(spec: &str) -> (String, Option<BackendType>, Option<String>) {
    let (model, rest) = match spec.split_once('@') {
        Some((model, rest)) => (model, Some(rest)),
        None => (spec, None),
    };

    let mut backend = None;
    let mut api_url = None;
    if let Some(backend_part) = rest {
        if let Some(pos) = backend_part.find('(') {
            // Format: backend(url)
            backend = BackendType::from_str(&backend_part[..pos]);
            let url = &backend_part[pos + 1..];
            api_url = Some(url.strip_suffix(')').unwrap_or(url).to_string());
        } else {
            backend = BackendType::from_str(backend_part);
        }
    }

    (model.to_string(), backend, api_url)
}

/// Normalize API URL by ensuring it has the correct path for OpenAI-compatible endpoints
pub fn normalize_api_url(url: &str) -> String {
    // If URL already contains a path with "completions", use it as-is
    if url.contains("/completions") || url.contains("/chat") {
        return url.to_string();
    }

    // If URL ends with a slash, append path without leading slash
    if url.ends_with('/') {
        format!("{}v1/chat/completions", url)
    } else {
        // Append the standard OpenAI-compatible path
        format!("{}/v1/chat/completions", url)
    }
}
