//! Local sentence embeddings with all-MiniLM-L6-v2

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;

use pdfqa_core::{EmbeddingProvider, Error, Result, normalize};

/// all-MiniLM-L6-v2 running in-process through ONNX Runtime
///
/// The model is fetched into the cache directory on first use. Inference needs
/// `&mut` access and is CPU bound, so the model sits behind a mutex and every
/// batch runs on the blocking thread pool.
pub struct MiniLmEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
}

impl MiniLmEmbedder {
    /// Output dimension of all-MiniLM-L6-v2
    pub const DIMENSION: usize = 384;
    pub const MODEL_ID: &'static str = "sentence-transformers/all-MiniLM-L6-v2";

    /// Load the model, downloading it if it is not cached yet
    pub async fn load(cache_dir: Option<PathBuf>) -> Result<Self> {
        let model = tokio::task::spawn_blocking(move || {
            let mut options =
                InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(false);
            if let Some(dir) = cache_dir {
                options = options.with_cache_dir(dir);
            }
            TextEmbedding::try_new(options)
        })
        .await
        .map_err(|e| Error::EmbeddingProvider(format!("model loading task failed: {}", e)))?
        .map_err(|e| {
            Error::EmbeddingProvider(format!("failed to load {}: {}", Self::MODEL_ID, e))
        })?;

        info!(model = Self::MODEL_ID, "embedding model loaded");
        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for MiniLmEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();
        let mut vectors = tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|e| Error::EmbeddingProvider(format!("Lock error: {}", e)))?;
            model
                .embed(texts, None)
                .map_err(|e| Error::EmbeddingProvider(e.to_string()))
        })
        .await
        .map_err(|e| Error::EmbeddingProvider(format!("embedding task failed: {}", e)))??;

        for vector in &mut vectors {
            if vector.len() != Self::DIMENSION {
                return Err(Error::EmbeddingProvider(format!(
                    "expected {} dimensions, model returned {}",
                    Self::DIMENSION,
                    vector.len()
                )));
            }
            normalize(vector);
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        Self::DIMENSION
    }

    fn model_id(&self) -> &str {
        Self::MODEL_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::DISHWASHER_MANUAL;
    use pdfqa_core::cosine_similarity;

    #[tokio::test]
    #[ignore = "downloads all-MiniLM-L6-v2"]
    async fn test_ranks_the_answering_page_first() {
        let embedder = MiniLmEmbedder::load(None).await.unwrap();
        let pages: Vec<String> = DISHWASHER_MANUAL.iter().map(|t| t.to_string()).collect();
        let vectors = embedder.embed_batch(&pages).await.unwrap();
        assert!(vectors.iter().all(|v| v.len() == MiniLmEmbedder::DIMENSION));

        let scores = |query: &[f32]| -> Vec<f32> {
            vectors.iter().map(|v| cosine_similarity(query, v)).collect()
        };

        let filter = embedder.embed("How do I clean the filter?").await.unwrap();
        let filter_scores = scores(&filter);
        assert!(filter_scores[1] > filter_scores[0] && filter_scores[1] > filter_scores[2]);

        let drain = embedder.embed("What does error E24 mean?").await.unwrap();
        let drain_scores = scores(&drain);
        assert!(drain_scores[2] > drain_scores[0] && drain_scores[2] > drain_scores[1]);

        let unrelated = embedder
            .embed("What is the name of the capital of the country to the north of the sea?")
            .await
            .unwrap();
        assert!(scores(&unrelated).iter().all(|s| *s < 0.4));
    }
}
