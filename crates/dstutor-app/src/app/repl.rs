use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use dstutor_chat::{
    quick_question, remove_scratch_dir, save_transcript, SessionState, Tutor, QUICK_QUESTIONS,
};
use dstutor_types::TutorError;

use super::setup::AppConfig;
use super::task::{print_diagrams, print_tables};
use super::terminal::TerminalSink;

/// A line typed at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Ask(String),
    Clear,
    History,
    Export(PathBuf),
    Run(PathBuf),
    Table(Option<String>),
    Diagram(Option<String>),
    Quick(Option<usize>),
    Help,
    Exit,
    /// A slash command that did not parse; carries the message to show
    Invalid(String),
}

impl ReplCommand {
    /// Parse a trimmed, non-empty input line
    pub fn parse(line: &str) -> Self {
        if line == "exit" || line == "quit" {
            return ReplCommand::Exit;
        }
        if !line.starts_with('/') {
            return ReplCommand::Ask(line.to_string());
        }

        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, Some(arg.trim()).filter(|a| !a.is_empty())),
            None => (line, None),
        };

        match (command, arg) {
            ("/clear", _) => ReplCommand::Clear,
            ("/history", _) => ReplCommand::History,
            ("/help", _) => ReplCommand::Help,
            ("/export", Some(path)) => ReplCommand::Export(PathBuf::from(path)),
            ("/export", None) => ReplCommand::Invalid("Usage: /export <path>".into()),
            ("/run", Some(path)) => ReplCommand::Run(PathBuf::from(path)),
            ("/run", None) => ReplCommand::Invalid("Usage: /run <file.py>".into()),
            ("/table", arg) => ReplCommand::Table(arg.map(str::to_string)),
            ("/diagram", arg) => ReplCommand::Diagram(arg.map(str::to_string)),
            ("/quick", None) => ReplCommand::Quick(None),
            ("/quick", Some(n)) => match n.parse::<usize>() {
                Ok(n) => ReplCommand::Quick(Some(n)),
                Err(_) => ReplCommand::Invalid(format!("Invalid quick question number: '{}'", n)),
            },
            (other, _) => ReplCommand::Invalid(format!("Unknown command: {} (try /help)", other)),
        }
    }
}

fn print_help() {
    println!("{} Commands:", "📚".bright_cyan());
    println!("  /history                - Show previous turns");
    println!("  /clear                  - Clear the chat history");
    println!("  /export <path>          - Save the transcript as text");
    println!("  /run <file.py>          - Run a Python file and explain it");
    println!("  /table [name]           - Show a comparison table");
    println!("  /diagram [name]         - Show a diagram as Graphviz DOT");
    println!("  /quick [n]              - List or ask a quick question");
    println!("  exit, quit              - Leave");
    println!("{}", "  Ctrl-C while an answer is typing shows it at once".bright_black());
}

fn print_quick_questions() {
    println!("{} Quick questions:", "💡".bright_cyan());
    for (i, question) in QUICK_QUESTIONS.iter().enumerate() {
        println!("  {}. {}", i + 1, question);
    }
}

fn print_history(state: &SessionState) {
    if state.turns.is_empty() {
        println!("{} No previous turns", "ℹ️".bright_blue());
        return;
    }
    for (i, turn) in state.turns.iter().enumerate() {
        println!(
            "{} {} {}",
            format!("[{}]", i + 1).bright_black(),
            format!("{}:", state.username).bright_green().bold(),
            turn.question
        );
        println!("    {} {}", "AI:".bright_blue().bold(), turn.answer);
    }
}

/// Run a script and print what it produced; returns the scratch directory
/// holding its figures
async fn run_file(tutor: &Tutor, path: &Path) -> Option<PathBuf> {
    let code = match tokio::fs::read_to_string(path).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} Failed to read {}: {}", "❌".bright_red(), path.display(), e);
            return None;
        }
    };

    println!("{}", format!("Running {}...", path.display()).bright_black());
    match tutor.run_code(&code).await {
        Ok(report) => {
            let output = &report.output;
            if !output.stdout.is_empty() {
                println!("{}", output.stdout.trim_end());
            }
            if !output.stderr.is_empty() {
                eprintln!("{}", output.stderr.trim_end().bright_red());
            }
            for figure in &output.figures {
                println!("{} {}", "🖼️".bright_cyan(), figure.display());
            }
            match &report.explanation {
                Some(explanation) => println!("\n{} {}\n", "AI:".bright_blue().bold(), explanation),
                None => println!(
                    "{}",
                    format!("Exited with {:?}; no explanation requested", output.exit_code).bright_yellow()
                ),
            }
            Some(report.output.scratch_dir)
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".bright_red().bold(), e);
            None
        }
    }
}

/// Run interactive REPL mode
pub async fn run_repl_mode(app_config: &AppConfig) -> Result<()> {
    let tutor = app_config.build_tutor()?;
    app_config.print_banner("Terminal");

    let mut state = tutor.new_session(app_config.username.clone(), app_config.role);
    if !state.turns.is_empty() {
        println!(
            "{}",
            format!("Restored {} previous turns (/history to show them)", state.turns.len()).bright_black()
        );
    }
    println!(
        "{}",
        format!(
            "Ask anything about {}. Type /help for commands, 'exit' to quit.\n",
            tutor.config().topic
        )
        .bright_black()
    );

    let mut rl = DefaultEditor::new()?;
    let mut sink = TerminalSink::new(false);
    // Figures stay viewable until the REPL exits
    let mut scratch_dirs: Vec<PathBuf> = Vec::new();

    // Token of the turn being typed, cancelled by Ctrl-C
    let current_token: Arc<Mutex<Option<CancellationToken>>> = Arc::new(Mutex::new(None));
    let current_token_for_handler = current_token.clone();

    tokio::spawn(async move {
        loop {
            if tokio::signal::ctrl_c().await.is_ok() {
                if let Ok(guard) = current_token_for_handler.lock() {
                    if let Some(ref token) = *guard {
                        token.cancel();
                    }
                }
            }
        }
    });

    let prompt = format!("{} ", format!("{}:", app_config.username).bright_green().bold());

    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                let question = match ReplCommand::parse(line) {
                    ReplCommand::Ask(question) => question,
                    ReplCommand::Exit => {
                        println!("{}", "Goodbye!".bright_cyan());
                        break;
                    }
                    ReplCommand::Help => {
                        print_help();
                        continue;
                    }
                    ReplCommand::History => {
                        print_history(&state);
                        continue;
                    }
                    ReplCommand::Clear => {
                        match tutor.clear_history(&mut state) {
                            Ok(()) => println!("{} Chat history cleared", "🧹".bright_green()),
                            Err(e) => eprintln!("{} {}", "❌".bright_red(), e),
                        }
                        continue;
                    }
                    ReplCommand::Export(path) => {
                        match save_transcript(&path, &state.turns, &state.username) {
                            Ok(()) => println!("{} Saved transcript to {}", "💾".bright_green(), path.display()),
                            Err(e) => eprintln!("{} {:#}", "❌".bright_red(), e),
                        }
                        continue;
                    }
                    ReplCommand::Run(path) => {
                        scratch_dirs.extend(run_file(&tutor, &path).await);
                        continue;
                    }
                    ReplCommand::Table(name) => {
                        if let Err(e) = print_tables(name.as_deref()) {
                            eprintln!("{} {}", "❌".bright_red(), e);
                        }
                        continue;
                    }
                    ReplCommand::Diagram(name) => {
                        if let Err(e) = print_diagrams(name.as_deref()) {
                            eprintln!("{} {}", "❌".bright_red(), e);
                        }
                        continue;
                    }
                    ReplCommand::Quick(None) => {
                        print_quick_questions();
                        continue;
                    }
                    ReplCommand::Quick(Some(n)) => match quick_question(n) {
                        Some(question) => {
                            println!("{} {}", format!("{}:", state.username).bright_green().bold(), question);
                            question.to_string()
                        }
                        None => {
                            eprintln!("{} No quick question {}", "❌".bright_red(), n);
                            continue;
                        }
                    },
                    ReplCommand::Invalid(message) => {
                        eprintln!("{} {}", "❌".bright_red(), message);
                        continue;
                    }
                };

                let cancel_token = CancellationToken::new();
                if let Ok(mut guard) = current_token.lock() {
                    *guard = Some(cancel_token.clone());
                }

                let result = tutor
                    .handle_question_cancellable(&mut state, &question, &mut sink, &cancel_token)
                    .await;

                if let Ok(mut guard) = current_token.lock() {
                    *guard = None;
                }

                match result {
                    Ok(_) => println!(),
                    Err(TutorError::EmptyQuestion) | Err(TutorError::Busy) => {}
                    Err(e) => eprintln!("{} {}\n", "Error:".bright_red().bold(), e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".bright_black());
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye!".bright_cyan());
                break;
            }
            Err(err) => {
                eprintln!("{} {}", "Error:".bright_red().bold(), err);
                break;
            }
        }
    }

    for dir in &scratch_dirs {
        remove_scratch_dir(dir);
    }
    Ok(())
}
