use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use std::path::Path;

use dstutor_chat::{comparison_table, comparison_tables, diagram, diagrams, save_transcript, HistoryStore};

use super::setup::AppConfig;
use super::terminal::TerminalSink;

/// Run in task mode - answer a single question and exit
pub async fn run_task_mode(app_config: &AppConfig, question: String) -> Result<()> {
    let tutor = app_config.build_tutor()?;
    let mut state = tutor.new_session(app_config.username.clone(), app_config.role);
    let mut sink = TerminalSink::new(true);

    let report = tutor.handle_question(&mut state, &question, &mut sink).await?;
    log::debug!("task finished with {:?}", report.outcome);
    Ok(())
}

/// Print one comparison table, or list them all when `name` is None
pub fn print_tables(name: Option<&str>) -> Result<()> {
    match name {
        Some(name) => {
            let table = comparison_table(name).ok_or_else(|| {
                anyhow!("No comparison table named '{}'. Run `dstutor tables` to list them.", name)
            })?;
            println!("{}", table.name.bright_cyan().bold());
            println!("{}", table.to_markdown());
        }
        None => {
            println!("{}", "Comparison tables:".bright_cyan());
            for table in comparison_tables() {
                println!("  {}", table.name);
            }
        }
    }
    Ok(())
}

/// Print one diagram as DOT, or list them all when `name` is None
pub fn print_diagrams(name: Option<&str>) -> Result<()> {
    match name {
        Some(name) => {
            let found = diagram(name).ok_or_else(|| {
                anyhow!("No diagram named '{}'. Run `dstutor diagrams` to list them.", name)
            })?;
            println!("{}", format!("// {}", found.name).bright_black());
            println!("{}", found.dot);
        }
        None => {
            println!("{}", "Diagrams (Graphviz DOT):".bright_cyan());
            for d in diagrams() {
                println!("  {}", d.name);
            }
        }
    }
    Ok(())
}

/// Write the turns stored in `history` to `output` as a plain-text transcript
pub fn export_history(history: &Path, output: &Path, username: &str) -> Result<()> {
    let turns = HistoryStore::new(history).load()?;
    save_transcript(output, &turns, username)
        .with_context(|| format!("Failed to export transcript to {}", output.display()))?;
    println!(
        "{} Exported {} turns to {}",
        "💾".bright_green(),
        turns.len(),
        output.display()
    );
    Ok(())
}

/// Replace the history file's contents with an empty list
pub fn clear_history_file(history: &Path) -> Result<()> {
    HistoryStore::new(history).persist(&[])?;
    println!("{} Cleared {}", "🧹".bright_green(), history.display());
    Ok(())
}
