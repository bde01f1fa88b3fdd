//! Backend wiring from configuration

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use pdfqa_core::{DecodingConfig, EmbeddingProvider, Error, GenerationModel};
use pdfqa_rag::{
    EmbeddingBackend, HashingEmbedder, IndexBackend, LopdfExtractor, MiniLmEmbedder, PdfQaService,
    RagConfig, open_index,
};
use pdfqa_watsonx::{WatsonxClient, WatsonxConfig, WatsonxEmbedder};

/// Stand-in model for commands that never generate (`ingest`, `reset`)
struct GenerationDisabled;

#[async_trait]
impl GenerationModel for GenerationDisabled {
    async fn generate(&self, _prompt: &str, _config: &DecodingConfig) -> pdfqa_core::Result<String> {
        Err(Error::Configuration(
            "generation is not available for this command".to_string(),
        ))
    }

    fn model_id(&self) -> &str {
        "disabled"
    }
}

/// Whether the command being run needs a generation model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    IndexOnly,
    Chat,
}

/// Fail `command` when its effect would vanish with the in-memory index
pub fn require_persistent_index(config: &RagConfig, command: &str) -> Result<()> {
    if config.index == IndexBackend::Memory {
        bail!(
            "`pdfqa {}` needs a persistent index: the in-memory index is dropped when the \
             process exits. Set PDFQA_INDEX=qdrant, or use `pdfqa chat --pdf <file>`",
            command
        );
    }
    Ok(())
}

fn watsonx_client(config: &RagConfig) -> Result<Arc<WatsonxClient>> {
    let watsonx_config = WatsonxConfig::from_env().context(
        "watsonx.ai credentials are required: set WATSONX_API_KEY and WATSONX_PROJECT_ID",
    )?;
    let client = WatsonxClient::new(watsonx_config)?.with_model(config.decoding.model_id.clone());
    Ok(Arc::new(client))
}

/// Build the service for `mode` from `config`
pub async fn build_service(config: &RagConfig, mode: Mode) -> Result<Arc<PdfQaService>> {
    let needs_watsonx =
        mode == Mode::Chat || matches!(config.embedder, EmbeddingBackend::Watsonx { .. });
    let client = if needs_watsonx {
        Some(watsonx_client(config)?)
    } else {
        None
    };

    let embedder: Arc<dyn EmbeddingProvider> = match (&config.embedder, &client) {
        (EmbeddingBackend::Watsonx { model_id }, Some(client)) => Arc::new(WatsonxEmbedder::new(
            client.clone(),
            model_id.clone(),
            config.embedding_dimension,
        )),
        (EmbeddingBackend::Local { cache_dir }, _) => Arc::new(
            MiniLmEmbedder::load(cache_dir.clone())
                .await
                .context("failed to load the local embedding model (PDFQA_EMBEDDER=hashing needs no download)")?,
        ),
        _ => Arc::new(HashingEmbedder::new(config.embedding_dimension)?),
    };

    let model: Arc<dyn GenerationModel> = match (mode, client) {
        (Mode::Chat, Some(client)) => client as Arc<dyn GenerationModel>,
        _ => Arc::new(GenerationDisabled),
    };

    let index = open_index(config)
        .await
        .context("failed to open the vector index")?;

    info!(
        index = index.backend(),
        embedder = embedder.model_id(),
        model = model.model_id(),
        "pipeline ready"
    );

    let service = PdfQaService::new(config, Arc::new(LopdfExtractor::new()), embedder, index, model)?;
    Ok(Arc::new(service))
}
