//! watsonx.ai integration for pdfqa
//!
//! This crate provides the watsonx.ai implementations of the GenerationModel and
//! EmbeddingProvider traits.

mod client;
mod config;


pub use client::{WatsonxClient, WatsonxEmbedder};
pub use config::WatsonxConfig;

// Re-export core types for convenience
pub use pdfqa_core::{DecodingConfig, EmbeddingProvider, Error, GenerationModel, Result};
