//! Data Science Tutor application library
//!
//! CLI, configuration, the terminal REPL and the web server around the
//! [`dstutor_chat::Tutor`] pipeline.

// Re-export workspace crates
pub use dstutor_api::{self as api, BackendType, LlmClient};
pub use dstutor_chat::{self as chat, Tutor, TutorConfig};
pub use dstutor_types::{self as types, Turn, TutorError, UserRole};

pub mod app;
pub mod cli;
pub mod config;
pub mod web;

pub use app::{run_repl_mode, run_task_mode, run_web_server, setup_from_cli, AppConfig};
pub use cli::{Cli, Commands};
pub use config::{init_logging, ClientConfig};
