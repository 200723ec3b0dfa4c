use async_trait::async_trait;
use colored::Colorize;
use std::io::{self, Write};
use unicode_width::UnicodeWidthStr;

use dstutor_chat::DisplaySink;
use dstutor_types::{Speaker, CURSOR_GLYPH};

const AI_LABEL: &str = "AI:";

/// Prints blocks to stdout, typing partial frames in place.
///
/// A partial frame normally extends what is already typed, so only its new
/// suffix is written. When the final text differs from what was typed (line
/// breaks in the answer, or an error replacing the placeholder) the typed rows
/// are erased and the final text is printed in full.
pub struct TerminalSink {
    echo_user: bool,
    /// Text typed so far in the current assistant block, without the cursor
    typed: String,
    placeholder: bool,
}

impl TerminalSink {
    /// `echo_user` prints user blocks too; the REPL leaves them to rustyline
    pub fn new(echo_user: bool) -> Self {
        Self {
            echo_user,
            typed: String::new(),
            placeholder: false,
        }
    }

    fn columns() -> usize {
        std::env::var("COLUMNS")
            .ok()
            .and_then(|c| c.parse().ok())
            .filter(|c: &usize| *c > 0)
            .unwrap_or(80)
    }

    /// Move back to the start of the assistant block and clear below it
    fn erase_block(&self) {
        let columns = Self::columns();
        let shown = format!("{} {}", AI_LABEL, self.typed);
        let rows: usize = shown
            .split('\n')
            .map(|line| rows_for(line, columns))
            .sum();
        let rows_up = rows - 1;
        print!("\r");
        if rows_up > 0 {
            print!("\x1b[{}A", rows_up);
        }
        print!("\x1b[J{} ", AI_LABEL.bright_blue().bold());
    }

    fn flush() {
        let _ = io::stdout().flush();
    }
}

#[async_trait]
impl DisplaySink for TerminalSink {
    async fn append_block(&mut self, speaker: Speaker, content: &str) {
        match speaker {
            Speaker::User => {
                if self.echo_user {
                    println!("{} {}", "You:".bright_green().bold(), content);
                }
            }
            Speaker::Assistant => {
                self.typed.clear();
                self.placeholder = true;
                print!("{} {}", AI_LABEL.bright_blue().bold(), content.bright_black());
                Self::flush();
            }
        }
    }

    async fn replace_last(&mut self, content: &str) {
        let partial = content.strip_suffix(CURSOR_GLYPH).unwrap_or(content);
        if self.placeholder {
            self.erase_block();
            self.placeholder = false;
        }
        match partial.strip_prefix(self.typed.as_str()) {
            Some(added) => print!("{}", added),
            None => {
                self.erase_block();
                print!("{}", partial);
            }
        }
        self.typed = partial.to_string();
        Self::flush();
    }

    async fn finish_block(&mut self, content: &str) {
        let unchanged = !self.placeholder && self.typed.trim_end() == content;
        if !unchanged {
            self.erase_block();
            print!("{}", content);
        }
        println!();
        self.typed.clear();
        self.placeholder = false;
        Self::flush();
    }
}

/// Terminal rows a line occupies, counting wide characters as two columns
fn rows_for(line: &str, columns: usize) -> usize {
    line.width().saturating_sub(1) / columns + 1
}
