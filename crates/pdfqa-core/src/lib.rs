//! Core traits and types for PDFQA
//!
//! This crate defines the data model of the question-answering pipeline and the
//! capability-facing interfaces it consumes: embedding providers, vector indexes,
//! generation models and PDF text extractors. Implementations live in the
//! `pdfqa-rag` and `pdfqa-watsonx` crates.

pub mod embedding;
pub mod error;
pub mod extractor;
pub mod llm;
pub mod types;
pub mod vector_index;

pub use embedding::{EmbeddingProvider, cosine_similarity, normalize};
pub use error::{Error, IngestionError, Result};
pub use extractor::{PageText, PdfTextExtractor};
pub use llm::{DecodingConfig, DecodingStrategy, GenerationModel};
pub use types::*;
pub use vector_index::{IndexEntry, IndexHit, VectorIndex};
