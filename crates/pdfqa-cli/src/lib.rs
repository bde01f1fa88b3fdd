//! Terminal interface for pdfqa

mod render;
mod repl;
mod ui;


pub use render::{
    render_answer, render_citations, render_history, render_ingest_error, render_stats,
    render_summary, render_trace,
};
pub use repl::{Repl, ReplCommand, parse_command};
pub use ui::{display_banner, print_help, read_line_with_history};

// Re-export core types
pub use pdfqa_core::{Error, Result};
