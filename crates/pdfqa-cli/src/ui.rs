//! UI utilities for the CLI

use colored::*;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, size},
};
use std::io::{self, IsTerminal, Write};

use pdfqa_core::Result;

const PROMPT: &str = "pdfqa>";

/// Display startup banner
pub fn display_banner(session_id: &str) {
    let terminal_width = size().map(|(w, _)| w as usize).unwrap_or(80);
    let banner_width = std::cmp::min(67, terminal_width.saturating_sub(4)).max(40);
    let inner = banner_width - 2;

    let top_border = format!("┌{}┐", "─".repeat(inner));
    let bottom_border = format!("└{}┘", "─".repeat(inner));
    let empty_line = format!("│{}│", " ".repeat(inner));
    let padded = |text: &str| {
        let width = text.chars().count();
        format!("│  {}{}│", text, " ".repeat(inner.saturating_sub(width + 2)))
    };

    println!();
    println!("{}", top_border.blue());
    println!("{}", empty_line.blue());

    let title = "PDFQA - Ask your PDFs";
    println!(
        "{}{}{}",
        "│  ".blue(),
        title.blue().bold(),
        format!("{}│", " ".repeat(inner.saturating_sub(title.len() + 2))).blue()
    );
    println!("{}", empty_line.blue());

    let feature_lines = [
        "Answers grounded in your documents",
        "",
        "Features:",
        "- Citations with file name and page",
        "- Refuses when the documents do not say",
        "- Multi-turn sessions with history",
        "- Command history navigation (up/down arrows)",
    ];

    for line in feature_lines {
        if line.is_empty() {
            println!("{}", empty_line.blue());
        } else {
            println!("{}", padded(line).blue());
        }
    }

    println!("{}", empty_line.blue());
    println!("{}", bottom_border.blue());
    println!();
    println!("{} {}", "Session:".dimmed(), session_id.dimmed());
    println!(
        "{}",
        "Tip: ask a question, ':ingest <file.pdf>' to add a document, or 'help' for commands"
            .dimmed()
    );
    println!();
}

/// Display help message
pub fn print_help() {
    println!("{}", "Available commands:".bold());
    println!("  {} - Ask a question about the ingested PDFs", "<question>".green());
    println!("  {} - Ingest a PDF into the index", ":ingest <path>".green());
    println!("  {} - Show the turns of this session", ":history".green());
    println!("  {} - Show the current session id", ":session".green());
    println!("  {} - Start a new session", ":new".green());
    println!("  {} - Remove every chunk from the index", ":reset".green());
    println!("  {} - Show index statistics", ":stats".green());
    println!("  {} - Show or hide retrieved contexts", ":trace on|off".green());
    println!("  {} - Show this help message", "help".green());
    println!("  {} - Exit the application", "exit/quit".green());
    println!();
    println!("{}", "Examples:".bold());
    println!("  :ingest ./docs/handbook.pdf");
    println!("  How many vacation days do new employees get?");
}

/// Restores cooked mode even when reading fails
struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

fn redraw(input: &str) -> io::Result<()> {
    print!("\r\x1b[2K{} {}", PROMPT.green().bold(), input);
    io::stdout().flush()
}

/// Read one line with up/down history navigation
///
/// Returns `None` at end of input or on Ctrl-C/Ctrl-D.
pub fn read_line_with_history(history: &mut Vec<String>) -> Result<Option<String>> {
    if !io::stdin().is_terminal() {
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        let input = input.trim().to_string();
        if !input.is_empty() {
            history.push(input.clone());
        }
        return Ok(Some(input));
    }

    let raw = RawMode::enable()?;
    let mut input = String::new();
    let mut history_index: Option<usize> = None;
    redraw(&input)?;

    loop {
        let Event::Key(key_event) = event::read()? else {
            continue;
        };
        if key_event.kind != KeyEventKind::Press {
            continue;
        }

        match key_event.code {
            KeyCode::Char('c') | KeyCode::Char('d')
                if key_event.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                drop(raw);
                println!();
                return Ok(None);
            }
            KeyCode::Enter => {
                drop(raw);
                println!();
                let line = input.trim().to_string();
                if !line.is_empty() {
                    history.push(line.clone());
                }
                return Ok(Some(line));
            }
            KeyCode::Char(c) => {
                input.push(c);
                redraw(&input)?;
            }
            KeyCode::Backspace => {
                if input.pop().is_some() {
                    redraw(&input)?;
                }
            }
            KeyCode::Up => {
                if !history.is_empty() {
                    let new_index = match history_index {
                        None => history.len() - 1,
                        Some(idx) => idx.saturating_sub(1),
                    };
                    history_index = Some(new_index);
                    input = history[new_index].clone();
                    redraw(&input)?;
                }
            }
            KeyCode::Down => {
                if let Some(idx) = history_index {
                    if idx + 1 < history.len() {
                        history_index = Some(idx + 1);
                        input = history[idx + 1].clone();
                    } else {
                        history_index = None;
                        input.clear();
                    }
                    redraw(&input)?;
                }
            }
            KeyCode::Esc => {
                input.clear();
                history_index = None;
                redraw(&input)?;
            }
            _ => {}
        }
    }
}
