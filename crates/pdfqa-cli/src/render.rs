//! Text rendering of answers, summaries and history

use colored::*;
use std::fmt::Write;

use pdfqa_core::{ChatResponse, Citation, IngestionError, IngestionSummary, RetrievalTrace, Turn};
use pdfqa_rag::IndexStats;

/// Longest context excerpt shown in a trace
const EXCERPT_CHARS: usize = 160;

fn excerpt(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= EXCERPT_CHARS {
        flat
    } else {
        let cut: String = flat.chars().take(EXCERPT_CHARS).collect();
        format!("{}...", cut)
    }
}

/// Numbered source list, or nothing when there are no citations
pub fn render_citations(citations: &[Citation]) -> String {
    let mut out = String::new();
    if citations.is_empty() {
        return out;
    }

    let _ = writeln!(out, "{}", "Sources:".bold());
    for (i, citation) in citations.iter().enumerate() {
        let _ = writeln!(out, "  [{}] {}", i + 1, citation.to_string().cyan());
    }
    out
}

pub fn render_trace(trace: &RetrievalTrace) -> String {
    let mut out = String::new();
    if trace.retrieved.is_empty() {
        let _ = writeln!(out, "{}", "Retrieved: nothing above the similarity threshold".dimmed());
        return out;
    }

    let _ = writeln!(out, "{}", format!("Retrieved {} context(s):", trace.retrieved.len()).dimmed());
    for (i, context) in trace.retrieved.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {} {} {}",
            format!("#{}", i + 1).dimmed(),
            format!("[{:.3}] {}", context.score, context.citation()).yellow(),
            excerpt(&context.chunk.text).dimmed()
        );
    }
    out
}

/// Answer text followed by sources and, optionally, the retrieval trace
pub fn render_answer(response: &ChatResponse, show_trace: bool) -> String {
    let mut out = String::new();

    if response.is_refusal() {
        let _ = writeln!(out, "{}", response.answer.yellow());
    } else if response.answer.starts_with("Error generating answer:") {
        let _ = writeln!(out, "{}", response.answer.red());
    } else {
        let _ = writeln!(out, "{}", response.answer);
    }

    let citations = render_citations(&response.citations);
    if !citations.is_empty() {
        out.push('\n');
        out.push_str(&citations);
    }

    if show_trace {
        out.push('\n');
        out.push_str(&render_trace(&response.trace));
    }
    out
}

pub fn render_summary(summary: &IngestionSummary) -> String {
    let mut line = format!(
        "{} {}: {} chunk(s) from {} page(s)",
        "Ingested".green(),
        summary.source.bold(),
        summary.chunks_ingested,
        summary.pages
    );
    if summary.empty_pages > 0 {
        let _ = write!(line, ", {} page(s) without text", summary.empty_pages);
    }
    line
}

pub fn render_ingest_error(path: &str, error: &IngestionError) -> String {
    let hint = match error {
        IngestionError::ExtractionEmpty(_) => " (scanned PDFs need OCR first)",
        _ => "",
    };
    format!("{} {}: {}{}", "Failed".red(), path.bold(), error, hint)
}

pub fn render_history(turns: &[Turn]) -> String {
    let mut out = String::new();
    for (i, turn) in turns.iter().enumerate() {
        let _ = writeln!(
            out,
            "{} {} {}",
            format!("{}.", i + 1).dimmed(),
            turn.timestamp.format("%H:%M:%S").to_string().dimmed(),
            turn.user.green()
        );
        let _ = writeln!(out, "   {}", turn.assistant);
    }
    out
}

pub fn render_stats(stats: &IndexStats) -> String {
    format!(
        "{} {}\n{} {}\n{} {}",
        "Index backend:".bold(),
        stats.backend,
        "Chunks:".bold(),
        stats.chunks,
        "Sessions:".bold(),
        stats.sessions
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfqa_core::{Chunk, RetrievedContext, TurnOutcome};

    fn plain() {
        colored::control::set_override(false);
    }

    fn generated() -> ChatResponse {
        ChatResponse {
            answer: "Two years.".to_string(),
            citations: vec![Citation::new("terms.pdf", 3), Citation::new("faq.pdf", 1)],
            trace: RetrievalTrace {
                outcome: TurnOutcome::Generated,
                retrieved: vec![
                    RetrievedContext {
                        chunk: Chunk::new("The warranty lasts\n two years.", "terms.pdf", 3),
                        score: 0.75,
                    },
                    RetrievedContext {
                        chunk: Chunk::new("Claims need a receipt.", "faq.pdf", 1),
                        score: 0.5,
                    },
                ],
            },
        }
    }

    #[test]
    fn test_render_answer_with_trace() {
        plain();
        insta::assert_snapshot!(render_answer(&generated(), true), @r"
        Two years.

        Sources:
          [1] terms.pdf, page 3
          [2] faq.pdf, page 1

        Retrieved 2 context(s):
          #1 [0.750] terms.pdf, page 3 The warranty lasts two years.
          #2 [0.500] faq.pdf, page 1 Claims need a receipt.
        ");
    }

    #[test]
    fn test_render_refusal_has_no_sources() {
        plain();
        let response = ChatResponse {
            answer: "nothing here".to_string(),
            citations: Vec::new(),
            trace: RetrievalTrace {
                outcome: TurnOutcome::Refused,
                retrieved: Vec::new(),
            },
        };
        assert_eq!(render_answer(&response, false), "nothing here\n");
        assert!(render_answer(&response, true).contains("nothing above the similarity threshold"));
    }

    #[test]
    fn test_render_summary() {
        plain();
        let summary = IngestionSummary {
            source: "manual.pdf".to_string(),
            chunks_ingested: 4,
            pages: 3,
            empty_pages: 1,
            chunk_ids: Vec::new(),
        };
        insta::assert_snapshot!(
            render_summary(&summary),
            @"Ingested manual.pdf: 4 chunk(s) from 3 page(s), 1 page(s) without text"
        );
    }

    #[test]
    fn test_render_ingest_error_hint() {
        plain();
        let rendered = render_ingest_error(
            "scan.pdf",
            &IngestionError::ExtractionEmpty("scan.pdf".to_string()),
        );
        assert!(rendered.starts_with("Failed scan.pdf: "));
        assert!(rendered.contains("OCR"));
    }

    #[test]
    fn test_excerpt_truncates() {
        let long = "word ".repeat(100);
        let cut = excerpt(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), EXCERPT_CHARS + 3);
    }

    #[test]
    fn test_render_stats() {
        plain();
        let stats = IndexStats {
            backend: "memory".to_string(),
            chunks: 12,
            sessions: 2,
        };
        insta::assert_snapshot!(render_stats(&stats), @r"
        Index backend: memory
        Chunks: 12
        Sessions: 2
        ");
    }
}
