//! Ingestion pipeline: extract, chunk, embed, index

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use pdfqa_core::{
    EmbeddingProvider, IndexEntry, IngestionError, IngestionSummary, PageText, PdfTextExtractor,
    VectorIndex,
};

use crate::chunker::WordChunker;

/// Writes PDF content into a vector index
pub struct IngestionPipeline {
    extractor: Arc<dyn PdfTextExtractor>,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    chunker: WordChunker,
}

impl IngestionPipeline {
    pub fn new(
        extractor: Arc<dyn PdfTextExtractor>,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        chunker: WordChunker,
    ) -> Self {
        Self {
            extractor,
            embedder,
            index,
            chunker,
        }
    }

    /// Ingest a PDF, citing it by its file name
    pub async fn ingest(&self, path: &Path) -> Result<IngestionSummary, IngestionError> {
        let source = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.ingest_as(path, &source).await
    }

    /// Ingest a PDF, citing it as `source`
    pub async fn ingest_as(
        &self,
        path: &Path,
        source: &str,
    ) -> Result<IngestionSummary, IngestionError> {
        info!(path = %path.display(), source, "ingesting PDF");
        let pages = self.extractor.extract(path).await?;
        self.ingest_pages(source, pages).await
    }

    /// Chunk, embed and index already-extracted pages
    ///
    /// Re-ingesting identical content produces the same chunk ids, so the index
    /// does not grow.
    pub async fn ingest_pages(
        &self,
        source: &str,
        pages: Vec<PageText>,
    ) -> Result<IngestionSummary, IngestionError> {
        let page_count = pages.len();
        let mut empty_pages = 0;
        let mut seen = HashSet::new();
        let mut chunks = Vec::new();

        for page in &pages {
            let page_chunks = self.chunker.chunk_page(&page.text, source, page.page);
            if page_chunks.is_empty() {
                debug!(source, page = page.page, "page yielded no text");
                empty_pages += 1;
                continue;
            }
            for chunk in page_chunks {
                if seen.insert(chunk.id()) {
                    chunks.push(chunk);
                }
            }
        }

        if chunks.is_empty() {
            return Err(IngestionError::ExtractionEmpty(source.to_string()));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| IngestionError::Embedding(e.to_string()))?;

        if vectors.len() != chunks.len() {
            return Err(IngestionError::Embedding(format!(
                "expected {} vectors, provider returned {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry::new(chunk, vector))
            .collect();
        let chunk_ids: Vec<String> = entries.iter().map(|e| e.id.clone()).collect();

        self.index
            .upsert(entries)
            .await
            .map_err(|e| IngestionError::Index(e.to_string()))?;

        info!(
            source,
            chunks = chunk_ids.len(),
            pages = page_count,
            empty_pages,
            "ingestion complete"
        );

        Ok(IngestionSummary {
            source: source.to_string(),
            chunks_ingested: chunk_ids.len(),
            pages: page_count,
            empty_pages,
            chunk_ids,
        })
    }
}
