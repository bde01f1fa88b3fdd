//! Retrieval and grounding pipeline for PDF question answering
//!
//! This crate provides the chunker, embedders, vector indexes, PDF extraction,
//! ingestion, retrieval, answer generation and the chat orchestrator with its
//! refusal policy.

mod chat;
mod chunker;
mod config;
mod embedder;
mod generator;
mod ingest;
mod minilm;
mod pdf;
mod retriever;
mod service;
mod session;
mod vector_index;

#[cfg(test)]
mod test_support;

pub use chat::{ChatOrchestrator, REFUSAL};
pub use chunker::{ChunkConfig, WordChunker};
pub use config::{EmbeddingBackend, IndexBackend, RagConfig};
pub use embedder::HashingEmbedder;
pub use generator::{AnswerGenerator, NO_CONTEXT_ANSWER, NO_INFORMATION_PHRASE};
pub use ingest::IngestionPipeline;
pub use minilm::MiniLmEmbedder;
pub use pdf::LopdfExtractor;
pub use retriever::Retriever;
pub use service::{IndexStats, PdfQaService, open_index};
pub use session::{SessionHandle, SessionStore};
pub use vector_index::{LocalVectorIndex, QdrantConfig, QdrantVectorIndex};

// Re-export core types for convenience
pub use pdfqa_core::{
    Answer, ChatResponse, Chunk, Citation, DecodingConfig, EmbeddingProvider, Error,
    GenerationModel, IngestionError, IngestionSummary, PdfTextExtractor, Result, RetrievedContext,
    Turn, VectorIndex,
};
