pub mod setup;
pub mod task;
pub mod repl;
pub mod terminal;
pub mod web_server;

pub use setup::{setup_from_cli, AppConfig};
pub use task::{clear_history_file, export_history, print_diagrams, print_tables, run_task_mode};
pub use repl::{run_repl_mode, ReplCommand};
pub use terminal::TerminalSink;
pub use web_server::run_web_server;
