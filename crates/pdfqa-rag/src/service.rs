//! Library surface used by the CLI

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use pdfqa_core::{
    ChatResponse, EmbeddingProvider, GenerationModel, IngestionError, IngestionSummary,
    PdfTextExtractor, Result, Turn, VectorIndex,
};

use crate::chat::ChatOrchestrator;
use crate::chunker::WordChunker;
use crate::config::{IndexBackend, RagConfig};
use crate::generator::AnswerGenerator;
use crate::ingest::IngestionPipeline;
use crate::retriever::Retriever;
use crate::session::SessionStore;
use crate::vector_index::{LocalVectorIndex, QdrantConfig, QdrantVectorIndex};

/// Index statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub backend: String,
    pub chunks: usize,
    pub sessions: usize,
}

/// Open the vector index selected by `config`
pub async fn open_index(config: &RagConfig) -> Result<Arc<dyn VectorIndex>> {
    match &config.index {
        IndexBackend::Memory => Ok(Arc::new(LocalVectorIndex::new())),
        IndexBackend::Qdrant {
            url,
            collection,
            api_key,
        } => {
            let index = QdrantVectorIndex::connect(QdrantConfig {
                url: url.clone(),
                api_key: api_key.clone(),
                collection_name: collection.clone(),
                vector_dimension: config.embedding_dimension as u64,
            })
            .await?;
            Ok(Arc::new(index))
        }
    }
}

/// Ingestion, chat and administration over one shared index and session store
pub struct PdfQaService {
    pipeline: IngestionPipeline,
    chat: ChatOrchestrator,
    index: Arc<dyn VectorIndex>,
}

impl PdfQaService {
    /// Wire the pipeline from its collaborators
    ///
    /// The same embedder serves ingestion and retrieval.
    pub fn new(
        config: &RagConfig,
        extractor: Arc<dyn PdfTextExtractor>,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        model: Arc<dyn GenerationModel>,
    ) -> Result<Self> {
        let pipeline = IngestionPipeline::new(
            extractor,
            embedder.clone(),
            index.clone(),
            WordChunker::new(config.chunk)?,
        );
        let retriever = Retriever::new(embedder, index.clone())
            .with_top_k(config.top_k)
            .with_score_threshold(config.score_threshold);
        let generator = AnswerGenerator::new(model, config.decoding.clone())
            .with_max_contexts(config.max_contexts);
        let chat = ChatOrchestrator::new(retriever, generator, Arc::new(SessionStore::new()));

        Ok(Self {
            pipeline,
            chat,
            index,
        })
    }

    pub async fn ingest(&self, path: &Path) -> std::result::Result<IngestionSummary, IngestionError> {
        self.pipeline.ingest(path).await
    }

    pub async fn chat(&self, session_id: &str, message: &str) -> Result<ChatResponse> {
        self.chat.chat(session_id, message).await
    }

    pub async fn session_history(&self, session_id: &str) -> Result<Vec<Turn>> {
        self.chat.session_history(session_id).await
    }

    pub fn new_session_id(&self) -> String {
        self.chat.new_session_id()
    }

    /// Drop every indexed chunk; sessions are kept
    pub async fn reset(&self) -> Result<()> {
        self.index.reset().await?;
        info!(backend = self.index.backend(), "index reset");
        Ok(())
    }

    pub async fn stats(&self) -> Result<IndexStats> {
        Ok(IndexStats {
            backend: self.index.backend().to_string(),
            chunks: self.index.count().await?,
            sessions: self.chat.sessions().sessions().await?.len(),
        })
    }
}
