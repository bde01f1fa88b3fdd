//! Query-time retrieval of supporting chunks

use std::sync::Arc;
use tracing::debug;

use pdfqa_core::{EmbeddingProvider, Result, RetrievedContext, VectorIndex};

/// Embeds a query and hydrates the nearest index hits
///
/// Must share its embedding provider with the ingestion pipeline.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
    score_threshold: Option<f32>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            top_k: 5,
            score_threshold: Some(0.4),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_score_threshold(mut self, score_threshold: Option<f32>) -> Self {
        self.score_threshold = score_threshold;
        self
    }

    /// Retrieve with the configured depth
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedContext>> {
        self.retrieve_top_k(query, self.top_k).await
    }

    /// Retrieve up to `top_k` contexts, most similar first
    ///
    /// An empty result is not an error: it is how callers learn that nothing in
    /// the index supports an answer.
    pub async fn retrieve_top_k(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedContext>> {
        if query.trim().is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        if self.index.count().await? == 0 {
            debug!("index is empty, nothing to retrieve");
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(query).await?;
        let hits = self.index.query(&vector, top_k).await?;

        let contexts: Vec<RetrievedContext> = hits
            .into_iter()
            .filter(|hit| match self.score_threshold {
                Some(threshold) => hit.score >= threshold,
                None => true,
            })
            .map(|hit| RetrievedContext {
                chunk: hit.chunk,
                score: hit.score,
            })
            .collect();

        debug!(
            query,
            top_k,
            retrieved = contexts.len(),
            "retrieval finished"
        );

        Ok(contexts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::HashingEmbedder;
    use crate::test_support::FailingEmbedder;
    use crate::vector_index::LocalVectorIndex;
    use pdfqa_core::{Chunk, Error, IndexEntry};

    async fn seeded(texts: &[(&str, u32)]) -> (Arc<HashingEmbedder>, Arc<LocalVectorIndex>) {
        let embedder = Arc::new(HashingEmbedder::default());
        let index = Arc::new(LocalVectorIndex::new());
        let entries = texts
            .iter()
            .map(|(text, page)| {
                IndexEntry::new(Chunk::new(*text, "guide.pdf", *page), embedder.embed_text(text))
            })
            .collect();
        index.upsert(entries).await.unwrap();
        (embedder, index)
    }

    #[tokio::test]
    async fn test_empty_index_returns_nothing() {
        let retriever = Retriever::new(
            Arc::new(HashingEmbedder::default()),
            Arc::new(LocalVectorIndex::new()),
        );
        assert!(retriever.retrieve("anything at all").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_index_skips_embedding() {
        // A failing embedder is never reached when there is nothing to search
        let retriever = Retriever::new(Arc::new(FailingEmbedder), Arc::new(LocalVectorIndex::new()));
        assert!(retriever.retrieve("question").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_query_returns_nothing() {
        let (embedder, index) = seeded(&[("battery replacement steps", 4)]).await;
        let retriever = Retriever::new(embedder, index);
        assert!(retriever.retrieve("   ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_orders_by_similarity() {
        let (embedder, index) = seeded(&[
            ("the battery lasts ten hours on a full charge", 2),
            ("to replace the battery remove the four screws on the back", 5),
        ])
        .await;
        let retriever = Retriever::new(embedder, index).with_score_threshold(None);

        let contexts = retriever
            .retrieve("how do I replace the battery screws")
            .await
            .unwrap();
        assert_eq!(contexts.len(), 2);
        assert_eq!(contexts[0].chunk.page, 5);
        assert!(contexts[0].score >= contexts[1].score);
    }

    #[tokio::test]
    async fn test_threshold_filters_unrelated() {
        let (embedder, index) = seeded(&[("the battery lasts ten hours", 2)]).await;
        let retriever = Retriever::new(embedder, index).with_score_threshold(Some(0.4));

        assert!(
            retriever
                .retrieve("volcanic eruption forecasting")
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_embedding_failure_propagates() {
        let (_, index) = seeded(&[("the battery lasts ten hours", 2)]).await;
        let retriever = Retriever::new(Arc::new(FailingEmbedder), index);
        assert!(matches!(
            retriever.retrieve("battery").await,
            Err(Error::EmbeddingProvider(_))
        ));
    }

    #[tokio::test]
    async fn test_top_k_limits_results() {
        let (embedder, index) = seeded(&[
            ("battery one", 1),
            ("battery two", 2),
            ("battery three", 3),
        ])
        .await;
        let retriever = Retriever::new(embedder, index)
            .with_score_threshold(None)
            .with_top_k(2);
        assert_eq!(retriever.retrieve("battery").await.unwrap().len(), 2);
    }
}
