use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;

use dstutor_chat::{HistoryStore, PythonRunner, Tutor, TutorConfig};
use dstutor_types::{TutorError, UserRole};

use crate::cli::Cli;
use crate::config::ClientConfig;

/// Application configuration derived from CLI arguments and environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub client_config: ClientConfig,
    pub tutor_config: TutorConfig,
    pub history_path: Option<PathBuf>,
    pub username: String,
    pub role: UserRole,
    pub python: String,
    pub code_timeout: Option<Duration>,
}

/// Set up application configuration from CLI arguments
pub fn setup_from_cli(cli: &Cli) -> Result<AppConfig> {
    let client_config = ClientConfig::from_cli(cli)?;

    let tutor_config = TutorConfig {
        topic: cli.topic.trim().to_string(),
        stream_delay: Duration::from_millis(cli.delay_ms),
        live_streaming: cli.stream,
    };

    if let Some(path) = &cli.history {
        log::info!("persisting chat history to {}", path.display());
    }

    Ok(AppConfig {
        client_config,
        tutor_config,
        history_path: cli.history.clone(),
        username: cli.username.clone(),
        role: UserRole::from_str(&cli.role),
        python: cli.python.clone(),
        code_timeout: cli.code_timeout.map(Duration::from_secs),
    })
}

impl AppConfig {
    /// Build the tutor pipeline. Fails only when the model cannot be configured.
    pub fn build_tutor(&self) -> Result<Tutor, TutorError> {
        let client = self.client_config.build_client()?;

        let runner = PythonRunner::new(self.python.clone()).with_timeout(self.code_timeout);
        let mut tutor = Tutor::new(client, self.tutor_config.clone()).with_runner(runner);
        if let Some(path) = &self.history_path {
            tutor = tutor.with_history(HistoryStore::new(path.clone()));
        }

        log::debug!("tutor ready with {}", self.client_config.describe());
        Ok(tutor)
    }

    pub fn print_banner(&self, mode: &str) {
        println!("{}", format!("📊 Data Science Tutor - {}", mode).bright_cyan().bold());
        println!(
            "{}",
            format!(
                "Model: {} • Topic: {} • Signed in as {} ({})",
                self.client_config.describe(),
                self.tutor_config.topic,
                self.username,
                self.role.as_str()
            )
            .bright_black()
        );
        if let Some(path) = &self.history_path {
            println!("{}", format!("History file: {}", path.display()).bright_black());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_setup_maps_cli_fields() {
        let cli = Cli::try_parse_from([
            "dstutor",
            "--backend",
            "gemini",
            "--topic",
            "statistics",
            "--delay-ms",
            "0",
            "--role",
            "Admin",
            "--code-timeout",
            "5",
            "--history",
            "h.json",
        ])
        .unwrap();

        let config = setup_from_cli(&cli).unwrap();
        assert_eq!(config.tutor_config.topic, "statistics");
        assert_eq!(config.tutor_config.stream_delay, Duration::ZERO);
        assert_eq!(config.role, UserRole::Admin);
        assert_eq!(config.code_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.history_path, Some(PathBuf::from("h.json")));
    }
}
