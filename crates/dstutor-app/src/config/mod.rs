use anyhow::{anyhow, Result};
use std::sync::Arc;

use dstutor_api::{parse_model_spec, BackendType, ClientFactory, LlmClient};
use dstutor_types::TutorError;

use crate::cli::Cli;

/// Which model to talk to and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub backend: BackendType,
    pub model: String,
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub verbose: bool,
}

impl ClientConfig {
    /// Resolve the backend, model and URL from the CLI.
    ///
    /// Precedence: `--backend`/`--api-url` flags, then a `model@backend(url)`
    /// spec in `--model`, then the backend's defaults.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let (spec_model, spec_backend, spec_url) = match cli.model.as_deref() {
            Some(spec) => {
                let (model, backend, url) = parse_model_spec(spec);
                (Some(model).filter(|m| !m.is_empty()), backend, url)
            }
            None => (None, None, None),
        };

        let backend = match cli.backend.as_deref() {
            Some(name) => BackendType::from_str(name).ok_or_else(|| {
                anyhow!(
                    "Unknown backend '{}'. Expected one of: gemini, groq, anthropic, openai, llama",
                    name
                )
            })?,
            None => spec_backend.unwrap_or(BackendType::Gemini),
        };

        let model = spec_model.unwrap_or_else(|| backend.default_model().to_string());
        let api_url = cli.api_url.clone().or(spec_url);

        Ok(Self {
            backend,
            model,
            api_url,
            api_key: cli.api_key.clone(),
            verbose: cli.verbose,
        })
    }

    /// Build the model client; a missing key is `ConfigurationMissing`
    pub fn build_client(&self) -> Result<Arc<dyn LlmClient>, TutorError> {
        ClientFactory::create_verbose(
            self.backend,
            self.api_key.clone(),
            self.model.clone(),
            self.api_url.clone(),
            self.verbose,
        )
    }

    /// Short description for banners
    pub fn describe(&self) -> String {
        match &self.api_url {
            Some(url) => format!("{}@{} ({})", self.model, self.backend.as_str(), url),
            None => format!("{}@{}", self.model, self.backend.as_str()),
        }
    }
}

/// Initialise the `log` backend.
///
/// `RUST_LOG` wins; otherwise `-v` shows debug output and the default is warnings only.
pub fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["dstutor"];
        argv.extend(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_to_gemini_flash() {
        let config = ClientConfig::from_cli(&cli(&["--backend", "gemini"])).unwrap();
        assert_eq!(config.backend, BackendType::Gemini);
        assert_eq!(config.model, "gemini-1.5-flash");
        assert_eq!(config.api_url, None);
    }

    #[test]
    fn test_model_spec_supplies_backend_and_url() {
        let config = ClientConfig::from_cli(&cli(&[
            "--backend",
            "llama",
            "--model",
            "qwen@llama(http://localhost:8080)",
        ]))
        .unwrap();
        assert_eq!(config.backend, BackendType::Llama);
        assert_eq!(config.model, "qwen");
        assert_eq!(config.api_url.as_deref(), Some("http://localhost:8080"));
    }

    #[test]
    fn test_backend_flag_overrides_spec() {
        let config =
            ClientConfig::from_cli(&cli(&["--backend", "groq", "--model", "mixtral@openai"])).unwrap();
        assert_eq!(config.backend, BackendType::Groq);
        assert_eq!(config.model, "mixtral");
    }

    #[test]
    fn test_unknown_backend_is_an_error() {
        let err = ClientConfig::from_cli(&cli(&["--backend", "bard"])).unwrap_err();
        assert!(err.to_string().contains("Unknown backend 'bard'"));
    }

    #[test]
    fn test_llama_without_url_fails_to_build() {
        let config = ClientConfig::from_cli(&cli(&["--backend", "llama", "--model", "local"])).unwrap();
        let err = config.build_client().err().unwrap();
        assert!(matches!(err, TutorError::ConfigurationMissing(_)));
    }

    #[test]
    fn test_explicit_key_builds_client() {
        let config =
            ClientConfig::from_cli(&cli(&["--backend", "gemini", "--api-key", "k-123"])).unwrap();
        let client = config.build_client().unwrap();
        assert_eq!(client.model_name(), "gemini-1.5-flash");
    }
}
