use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use dstutor_types::{DEFAULT_HISTORY_FILE, DEFAULT_STREAM_DELAY_MS, DEFAULT_TOPIC};

/// CLI arguments for dstutor
#[derive(Parser, Debug)]
#[command(name = "dstutor")]
#[command(about = "Data Science Tutor - an AI tutor that only answers data science questions")]
#[command(version)]
#[command(after_help = "Code run with /run or over the web is executed by a local Python \
interpreter with your privileges. It is not sandboxed.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Generate shell completions
    #[arg(long, value_enum)]
    pub generate: Option<Shell>,

    /// Serve the chat UI over HTTP instead of starting the terminal REPL
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub web: bool,

    /// Web server port
    #[arg(long, default_value = "8080", env = "DSTUTOR_WEB_PORT")]
    pub web_port: u16,

    /// Web server bind address
    #[arg(long, default_value = "127.0.0.1", env = "DSTUTOR_WEB_BIND")]
    pub web_bind: String,

    /// Model backend (gemini, groq, anthropic, openai, llama)
    #[arg(long, value_name = "BACKEND", env = "DSTUTOR_BACKEND")]
    pub backend: Option<String>,

    /// Model name, optionally as model@backend(url)
    #[arg(long, value_name = "MODEL", env = "DSTUTOR_MODEL")]
    pub model: Option<String>,

    /// Custom API URL for the backend (required for llama)
    #[arg(long, value_name = "URL", env = "DSTUTOR_API_URL")]
    pub api_url: Option<String>,

    /// API key; defaults to the backend's variable (GOOGLE_API_KEY for gemini)
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Subject questions must belong to
    #[arg(long, default_value = DEFAULT_TOPIC)]
    pub topic: String,

    /// Delay between revealed words, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = DEFAULT_STREAM_DELAY_MS)]
    pub delay_ms: u64,

    /// Persist turns to a JSON file (default path: chat_history.json)
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = DEFAULT_HISTORY_FILE)]
    pub history: Option<PathBuf>,

    /// Name shown next to your questions
    #[arg(long, default_value = "User")]
    pub username: String,

    /// Cosmetic role (user, admin)
    #[arg(long, default_value = "user")]
    pub role: String,

    /// Show model output as it arrives instead of the word-by-word replay
    #[arg(long)]
    pub stream: bool,

    /// Python interpreter for code snippets
    #[arg(long, value_name = "PATH", default_value = "python3")]
    pub python: String,

    /// Kill code snippets after this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub code_timeout: Option<u64>,

    /// Enable verbose debug output (shows HTTP requests, responses, headers, etc.)
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Ask a single question and exit
    Ask {
        /// The question (words are joined with spaces)
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Print a comparison table, or list the available ones
    Tables {
        /// Table name, e.g. "ML Models"
        name: Option<String>,
    },
    /// Print a diagram as Graphviz DOT, or list the available ones
    Diagrams {
        /// Diagram name, e.g. "Decision Tree"
        name: Option<String>,
    },
    /// Write the history file as a plain-text transcript
    Export {
        /// Output file
        output: PathBuf,
    },
    /// Empty the history file
    Clear,
}

impl Cli {
    /// History file for commands that always need one
    pub fn history_or_default(&self) -> PathBuf {
        self.history
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_cli_from_args(args: &[&str]) -> Result<Cli, clap::Error> {
        let mut cli_args = vec!["dstutor"];
        cli_args.extend(args);
        Cli::try_parse_from(cli_args)
    }

    #[test]
    fn test_default_cli_parsing() -> Result<(), Box<dyn std::error::Error>> {
        let cli = parse_cli_from_args(&[])?;

        assert!(cli.command.is_none());
        assert!(!cli.web);
        assert!(!cli.stream);
        assert!(!cli.verbose);
        assert_eq!(cli.topic, "data science");
        assert_eq!(cli.delay_ms, 10);
        assert_eq!(cli.history, None);
        assert_eq!(cli.username, "User");
        assert_eq!(cli.python, "python3");

        Ok(())
    }

    #[test]
    fn test_history_flag_without_path_uses_default_file() -> Result<(), Box<dyn std::error::Error>> {
        let cli = parse_cli_from_args(&["--history"])?;
        assert_eq!(cli.history, Some(PathBuf::from("chat_history.json")));

        let cli = parse_cli_from_args(&["--history", "/tmp/h.json"])?;
        assert_eq!(cli.history, Some(PathBuf::from("/tmp/h.json")));

        Ok(())
    }

    #[test]
    fn test_ask_joins_words() -> Result<(), Box<dyn std::error::Error>> {
        let cli = parse_cli_from_args(&["ask", "What", "is", "PCA?"])?;
        assert_eq!(
            cli.command,
            Some(Commands::Ask {
                question: vec!["What".into(), "is".into(), "PCA?".into()]
            })
        );
        Ok(())
    }

    #[test]
    fn test_ask_requires_question() {
        assert!(parse_cli_from_args(&["ask"]).is_err());
    }

    #[test]
    fn test_tables_optional_name() -> Result<(), Box<dyn std::error::Error>> {
        let cli = parse_cli_from_args(&["tables"])?;
        assert_eq!(cli.command, Some(Commands::Tables { name: None }));

        let cli = parse_cli_from_args(&["tables", "ML Models"])?;
        assert_eq!(cli.command, Some(Commands::Tables { name: Some("ML Models".into()) }));
        Ok(())
    }

    #[test]
    fn test_verbose_short_flag() -> Result<(), Box<dyn std::error::Error>> {
        let cli = parse_cli_from_args(&["-v", "--stream"])?;
        assert!(cli.verbose);
        assert!(cli.stream);
        Ok(())
    }
}
