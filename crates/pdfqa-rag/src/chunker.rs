//! Word-window chunking of page text

use serde::{Deserialize, Serialize};

use pdfqa_core::{Chunk, Error, Result};

/// Configuration for chunking, measured in whitespace-delimited words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 150,
            chunk_overlap: 30,
        }
    }
}

impl ChunkConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    /// Reject configurations that would never advance the window
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Configuration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::Configuration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    /// Words the window advances per step
    pub fn stride(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

/// Splits page text into overlapping word windows
///
/// Word counts are a stand-in for model tokens, so a window can still exceed
/// a model's token budget.
#[derive(Debug, Clone)]
pub struct WordChunker {
    config: ChunkConfig,
}

impl WordChunker {
    /// Create a chunker, validating the configuration
    pub fn new(config: ChunkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Chunk one page. Chunks never span pages.
    pub fn chunk_page(&self, text: &str, file: &str, page: u32) -> Vec<Chunk> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < words.len() {
            let end = (start + self.config.chunk_size).min(words.len());
            let window = words[start..end].join(" ");
            if !window.trim().is_empty() {
                chunks.push(Chunk::new(window, file, page));
            }

            if end >= words.len() {
                break;
            }

            start += self.config.stride();
        }

        chunks
    }
}
