//! Interactive chat loop

use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use pdfqa_core::{Error, Result};
use pdfqa_rag::PdfQaService;

use crate::render::{
    render_answer, render_history, render_ingest_error, render_stats, render_summary,
};
use crate::ui::{display_banner, print_help, read_line_with_history};

/// One line of REPL input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Ask(String),
    Ingest(PathBuf),
    History,
    Session,
    NewSession,
    Reset,
    Stats,
    Trace(Option<bool>),
    Help,
    Exit,
    Empty,
    Unknown(String),
}

/// Parse a line of input; anything that is not a command is a question
pub fn parse_command(line: &str) -> ReplCommand {
    let line = line.trim();
    if line.is_empty() {
        return ReplCommand::Empty;
    }

    match line.to_lowercase().as_str() {
        "exit" | "quit" | ":exit" | ":quit" => return ReplCommand::Exit,
        "help" | ":help" | "?" => return ReplCommand::Help,
        _ => {}
    }

    let Some(command) = line.strip_prefix(':') else {
        return ReplCommand::Ask(line.to_string());
    };

    let (name, argument) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };

    match (name.to_lowercase().as_str(), argument) {
        ("ingest", "") => ReplCommand::Unknown(":ingest needs a file path".to_string()),
        ("ingest", path) => ReplCommand::Ingest(PathBuf::from(path)),
        ("history", _) => ReplCommand::History,
        ("session", _) => ReplCommand::Session,
        ("new", _) => ReplCommand::NewSession,
        ("reset", _) => ReplCommand::Reset,
        ("stats", _) => ReplCommand::Stats,
        ("trace", "") => ReplCommand::Trace(None),
        ("trace", "on") => ReplCommand::Trace(Some(true)),
        ("trace", "off") => ReplCommand::Trace(Some(false)),
        _ => ReplCommand::Unknown(format!("unknown command ':{}'", command)),
    }
}

/// Interactive session over a shared service
pub struct Repl {
    service: Arc<PdfQaService>,
    session_id: String,
    show_trace: bool,
    history: Vec<String>,
}

impl Repl {
    pub fn new(service: Arc<PdfQaService>, session_id: Option<String>) -> Self {
        let session_id = session_id.unwrap_or_else(|| service.new_session_id());
        Self {
            service,
            session_id,
            show_trace: false,
            history: Vec::new(),
        }
    }

    pub fn with_trace(mut self, show_trace: bool) -> Self {
        self.show_trace = show_trace;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Read and handle lines until exit or end of input
    pub async fn run(&mut self) -> Result<()> {
        display_banner(&self.session_id);

        loop {
            let Some(line) = read_line_with_history(&mut self.history)? else {
                break;
            };
            if !self.handle(parse_command(&line)).await? {
                break;
            }
        }

        println!("{}", "Goodbye!".dimmed());
        Ok(())
    }

    /// Handle one command; returns false when the loop should stop
    pub async fn handle(&mut self, command: ReplCommand) -> Result<bool> {
        debug!(?command, session_id = %self.session_id, "repl command");

        match command {
            ReplCommand::Empty => {}
            ReplCommand::Exit => return Ok(false),
            ReplCommand::Help => print_help(),
            ReplCommand::Ask(question) => match self.service.chat(&self.session_id, &question).await {
                Ok(response) => println!("{}", render_answer(&response, self.show_trace)),
                Err(e) => println!("{} {}", "Error:".red().bold(), e),
            },
            ReplCommand::Ingest(path) => {
                let display = path.display().to_string();
                match self.service.ingest(&path).await {
                    Ok(summary) => println!("{}", render_summary(&summary)),
                    Err(e) => println!("{}", render_ingest_error(&display, &e)),
                }
            }
            ReplCommand::History => match self.service.session_history(&self.session_id).await {
                Ok(turns) => print!("{}", render_history(&turns)),
                Err(Error::SessionNotFound(_)) => println!("{}", "No turns in this session yet.".dimmed()),
                Err(e) => return Err(e),
            },
            ReplCommand::Session => println!("{} {}", "Session:".bold(), self.session_id),
            ReplCommand::NewSession => {
                self.session_id = self.service.new_session_id();
                println!("{} {}", "Started session".green(), self.session_id);
            }
            ReplCommand::Reset => {
                self.service.reset().await?;
                println!("{}", "Index cleared.".green());
            }
            ReplCommand::Stats => println!("{}", render_stats(&self.service.stats().await?)),
            ReplCommand::Trace(setting) => {
                if let Some(enabled) = setting {
                    self.show_trace = enabled;
                }
                let state = if self.show_trace { "on" } else { "off" };
                println!("{} {}", "Trace:".bold(), state);
            }
            ReplCommand::Unknown(message) => {
                println!("{} {} (type 'help')", "?".yellow(), message);
            }
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_questions() {
        assert_eq!(
            parse_command("  What is the refund policy?  "),
            ReplCommand::Ask("What is the refund policy?".to_string())
        );
        assert_eq!(parse_command(""), ReplCommand::Empty);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_command(":ingest ./docs/My Handbook.pdf"),
            ReplCommand::Ingest(PathBuf::from("./docs/My Handbook.pdf"))
        );
        assert_eq!(parse_command(":history"), ReplCommand::History);
        assert_eq!(parse_command(":SESSION"), ReplCommand::Session);
        assert_eq!(parse_command(":new"), ReplCommand::NewSession);
        assert_eq!(parse_command(":reset"), ReplCommand::Reset);
        assert_eq!(parse_command(":stats"), ReplCommand::Stats);
        assert_eq!(parse_command(":trace on"), ReplCommand::Trace(Some(true)));
        assert_eq!(parse_command(":trace off"), ReplCommand::Trace(Some(false)));
        assert_eq!(parse_command(":trace"), ReplCommand::Trace(None));
        assert_eq!(parse_command("Quit"), ReplCommand::Exit);
        assert_eq!(parse_command("help"), ReplCommand::Help);
    }

    #[test]
    fn test_parse_rejects_malformed_commands() {
        assert!(matches!(parse_command(":ingest"), ReplCommand::Unknown(_)));
        assert!(matches!(parse_command(":trace maybe"), ReplCommand::Unknown(_)));
        assert!(matches!(parse_command(":frobnicate"), ReplCommand::Unknown(_)));
    }
}
