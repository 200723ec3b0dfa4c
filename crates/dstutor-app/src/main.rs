use anyhow::Result;
use clap::{CommandFactory, Parser};
use colored::Colorize;

use dstutor::app::{clear_history_file, export_history, print_diagrams, print_tables};
use dstutor::{
    init_logging, run_repl_mode, run_task_mode, run_web_server, setup_from_cli, Cli, Commands,
    TutorError,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(shell) = cli.generate {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "dstutor", &mut std::io::stdout());
        return Ok(());
    }

    // Subcommands that never talk to a model
    match &cli.command {
        Some(Commands::Tables { name }) => return print_tables(name.as_deref()),
        Some(Commands::Diagrams { name }) => return print_diagrams(name.as_deref()),
        Some(Commands::Export { output }) => {
            return export_history(&cli.history_or_default(), output, &cli.username)
        }
        Some(Commands::Clear) => return clear_history_file(&cli.history_or_default()),
        Some(Commands::Ask { .. }) | None => {}
    }

    let app_config = setup_from_cli(&cli)?;

    // Fail fast on missing keys before any mode starts
    if let Err(e) = app_config.build_tutor() {
        if let TutorError::ConfigurationMissing(reason) = &e {
            eprintln!("{} {}", "Configuration error:".bright_red().bold(), reason);
        }
        return Err(e.into());
    }

    if let Some(Commands::Ask { question }) = &cli.command {
        return run_task_mode(&app_config, question.join(" ")).await;
    }

    if cli.web {
        return run_web_server(&cli, &app_config).await;
    }

    run_repl_mode(&app_config).await
}
