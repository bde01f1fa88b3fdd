//! Vector index trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Chunk, Result};

/// An entry written to the index: identifier, embedding and chunk metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub chunk: Chunk,
}

impl IndexEntry {
    /// Build an entry keyed by the chunk's content-addressed id
    pub fn new(chunk: Chunk, vector: Vec<f32>) -> Self {
        Self {
            id: chunk.id(),
            vector,
            chunk,
        }
    }
}

/// A scored hit returned from a similarity query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHit {
    pub id: String,
    pub chunk: Chunk,
    pub score: f32,
}

/// Trait for vector indexes (e.g., an in-process flat index, Qdrant)
///
/// Reads may run concurrently. `upsert` and `reset` take a collection-wide
/// write lock that excludes reads.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace entries by id
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<()>;

    /// Return up to `top_k` hits ordered by descending similarity
    ///
    /// Hits with equal scores keep the index's insertion order.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexHit>>;

    /// Remove every entry
    async fn reset(&self) -> Result<()>;

    /// Number of stored entries
    async fn count(&self) -> Result<usize>;

    /// Short backend name for diagnostics
    fn backend(&self) -> &'static str;
}
