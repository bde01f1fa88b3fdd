//! Data model shared across the PDFQA pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bounded span of page text, the unit of retrieval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub file: String,
    pub page: u32,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(text: impl Into<String>, file: impl Into<String>, page: u32) -> Self {
        Self {
            text: text.into(),
            file: file.into(),
            page,
        }
    }

    /// Content-addressed identifier
    ///
    /// The MD5 digest of file, page and text, laid out as a UUID so that it is a
    /// valid point id for every index backend. Identical content always maps to
    /// the same id.
    pub fn id(&self) -> String {
        let mut context = md5::Context::new();
        context.consume(self.file.as_bytes());
        context.consume([0u8]);
        context.consume(self.page.to_be_bytes());
        context.consume([0u8]);
        context.consume(self.text.as_bytes());
        let digest = context.compute();
        Uuid::from_bytes(digest.0).to_string()
    }

    /// Provenance of this chunk
    pub fn citation(&self) -> Citation {
        Citation {
            file: self.file.clone(),
            page: self.page,
        }
    }
}

/// Provenance pointer attached to an answer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Citation {
    pub file: String,
    pub page: u32,
}

impl Citation {
    pub fn new(file: impl Into<String>, page: u32) -> Self {
        Self {
            file: file.into(),
            page,
        }
    }
}

impl std::fmt::Display for Citation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, page {}", self.file, self.page)
    }
}

/// A chunk returned by the retriever together with its similarity score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedContext {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub score: f32,
}

impl RetrievedContext {
    pub fn citation(&self) -> Citation {
        self.chunk.citation()
    }
}

/// A generated (or refused) answer and the sources it was grounded on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub citations: Vec<Citation>,
}

/// How a chat turn was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    /// Nothing relevant was retrieved; the fixed refusal was returned
    Refused,
    /// Retrieved contexts were passed to the answer generator
    Generated,
}

/// Debug trace of a chat turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalTrace {
    pub outcome: TurnOutcome,
    pub retrieved: Vec<RetrievedContext>,
}

/// Result of a chat turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub trace: RetrievalTrace,
}

impl ChatResponse {
    /// True when the turn short-circuited to the refusal text
    pub fn is_refusal(&self) -> bool {
        self.trace.outcome == TurnOutcome::Refused
    }
}

/// One exchange in a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub user: String,
    pub assistant: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            assistant: assistant.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Summary of an ingestion run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionSummary {
    pub source: String,
    pub chunks_ingested: usize,
    pub pages: usize,
    pub empty_pages: usize,
    pub chunk_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_yaml_snapshot;

    #[test]
    fn test_chunk_id_is_deterministic() {
        let a = Chunk::new("the quick brown fox", "notes.pdf", 3);
        let b = Chunk::new("the quick brown fox", "notes.pdf", 3);
        assert_eq!(a.id(), b.id());
        assert!(Uuid::parse_str(&a.id()).is_ok());
    }

    #[test]
    fn test_chunk_id_depends_on_provenance() {
        let base = Chunk::new("same text", "a.pdf", 1);
        assert_ne!(base.id(), Chunk::new("same text", "b.pdf", 1).id());
        assert_ne!(base.id(), Chunk::new("same text", "a.pdf", 2).id());
        assert_ne!(base.id(), Chunk::new("other text", "a.pdf", 1).id());
    }

    #[test]
    fn test_citation_projection() {
        let context = RetrievedContext {
            chunk: Chunk::new("text", "report.pdf", 7),
            score: 0.82,
        };
        assert_eq!(
            context.citation(),
            Citation {
                file: "report.pdf".to_string(),
                page: 7
            }
        );
        assert_eq!(context.citation().to_string(), "report.pdf, page 7");
    }

    #[test]
    fn test_retrieved_context_serializes_flat() {
        let context = RetrievedContext {
            chunk: Chunk::new("alpha beta", "a.pdf", 2),
            score: 0.5,
        };

        assert_yaml_snapshot!(context, @r###"
        ---
        text: alpha beta
        file: a.pdf
        page: 2
        score: 0.5
        "###);
    }
}
