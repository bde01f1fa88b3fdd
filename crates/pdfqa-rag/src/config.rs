//! Pipeline configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use pdfqa_core::{DecodingConfig, Error, Result};

use crate::chunker::ChunkConfig;
use crate::embedder::HashingEmbedder;
use crate::minilm::MiniLmEmbedder;

/// Similarity floor for sentence-model embeddings
const SENTENCE_MODEL_THRESHOLD: f32 = 0.4;

/// Where chunk vectors are stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndexBackend {
    /// Flat in-process index, gone when the process exits
    Memory,
    /// Persistent Qdrant collection
    Qdrant {
        url: String,
        collection: String,
        #[serde(skip_serializing)]
        api_key: Option<String>,
    },
}

/// Which embedding provider turns text into vectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmbeddingBackend {
    /// all-MiniLM-L6-v2 run in-process
    Local { cache_dir: Option<PathBuf> },
    /// Lexical feature hashing, no model download
    Hashing,
    /// watsonx.ai embedding model
    Watsonx { model_id: String },
}

impl EmbeddingBackend {
    /// Threshold used when `SCORE_THRESHOLD` is not set
    pub fn default_score_threshold(&self) -> f32 {
        match self {
            EmbeddingBackend::Hashing => HashingEmbedder::SCORE_THRESHOLD,
            EmbeddingBackend::Local { .. } | EmbeddingBackend::Watsonx { .. } => {
                SENTENCE_MODEL_THRESHOLD
            }
        }
    }
}

/// Settings for the whole ingest/retrieve/generate pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    pub index: IndexBackend,
    pub embedder: EmbeddingBackend,
    pub embedding_dimension: usize,
    pub chunk: ChunkConfig,
    pub top_k: usize,
    pub score_threshold: Option<f32>,
    pub max_contexts: usize,
    pub decoding: DecodingConfig,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            index: IndexBackend::Memory,
            embedder: EmbeddingBackend::Local { cache_dir: None },
            embedding_dimension: MiniLmEmbedder::DIMENSION,
            chunk: ChunkConfig::default(),
            top_k: 5,
            score_threshold: Some(SENTENCE_MODEL_THRESHOLD),
            max_contexts: 5,
            decoding: DecodingConfig::default(),
        }
    }
}

fn parse<T: FromStr>(name: &str, value: Option<String>, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|e| {
            Error::Configuration(format!("invalid value '{}' for {}: {}", raw, name, e))
        }),
    }
}

impl RagConfig {
    /// Load `.env`, then read the process environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a configuration from a variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let index = match var("PDFQA_INDEX").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("memory") => IndexBackend::Memory,
            Some("qdrant") => IndexBackend::Qdrant {
                url: var("QDRANT_URL").unwrap_or_else(|| "http://localhost:6334".to_string()),
                collection: var("QDRANT_COLLECTION").unwrap_or_else(|| "documents".to_string()),
                api_key: var("QDRANT_API_KEY"),
            },
            Some(other) => {
                return Err(Error::Configuration(format!(
                    "unknown PDFQA_INDEX '{}', expected 'memory' or 'qdrant'",
                    other
                )));
            }
        };

        let embedder = match var("PDFQA_EMBEDDER").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("local") => EmbeddingBackend::Local {
                cache_dir: var("EMBEDDING_CACHE_DIR").map(PathBuf::from),
            },
            Some("hashing") => EmbeddingBackend::Hashing,
            Some("watsonx") => EmbeddingBackend::Watsonx {
                model_id: var("EMBEDDING_MODEL")
                    .unwrap_or_else(|| "ibm/slate-30m-english-rtrvr".to_string()),
            },
            Some(other) => {
                return Err(Error::Configuration(format!(
                    "unknown PDFQA_EMBEDDER '{}', expected 'local', 'hashing' or 'watsonx'",
                    other
                )));
            }
        };

        let embedding_dimension = parse(
            "EMBEDDING_DIMENSION",
            var("EMBEDDING_DIMENSION"),
            defaults.embedding_dimension,
        )?;
        if embedding_dimension == 0 {
            return Err(Error::Configuration(
                "EMBEDDING_DIMENSION must be greater than zero".to_string(),
            ));
        }
        if matches!(embedder, EmbeddingBackend::Local { .. })
            && embedding_dimension != MiniLmEmbedder::DIMENSION
        {
            return Err(Error::Configuration(format!(
                "the local embedding model produces {} dimensions, EMBEDDING_DIMENSION is {}",
                MiniLmEmbedder::DIMENSION,
                embedding_dimension
            )));
        }

        let top_k = parse("TOP_K", var("TOP_K"), defaults.top_k)?;
        if top_k == 0 {
            return Err(Error::Configuration(
                "TOP_K must be greater than zero".to_string(),
            ));
        }

        let chunk = ChunkConfig::new(
            parse("CHUNK_SIZE", var("CHUNK_SIZE"), defaults.chunk.chunk_size)?,
            parse("CHUNK_OVERLAP", var("CHUNK_OVERLAP"), defaults.chunk.chunk_overlap)?,
        );
        chunk.validate()?;

        let score_threshold = match var("SCORE_THRESHOLD") {
            Some(raw) if raw.trim().eq_ignore_ascii_case("none") => None,
            raw => Some(parse(
                "SCORE_THRESHOLD",
                raw,
                embedder.default_score_threshold(),
            )?),
        };

        let mut decoding = DecodingConfig::default();
        if let Some(model_id) = var("GENERATION_MODEL") {
            decoding.model_id = model_id;
        }
        decoding.max_new_tokens = parse("MAX_NEW_TOKENS", var("MAX_NEW_TOKENS"), decoding.max_new_tokens)?;
        decoding.repetition_penalty = parse(
            "REPETITION_PENALTY",
            var("REPETITION_PENALTY"),
            decoding.repetition_penalty,
        )?;
        let decoding = decoding.with_beams(parse("NUM_BEAMS", var("NUM_BEAMS"), 5u32)?);

        Ok(Self {
            index,
            embedder,
            embedding_dimension,
            chunk,
            top_k,
            score_threshold,
            max_contexts: parse("MAX_CONTEXTS", var("MAX_CONTEXTS"), defaults.max_contexts)?,
            decoding,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfqa_core::DecodingStrategy;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RagConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.score_threshold, Some(0.4));
        insta::assert_yaml_snapshot!(config, {
            ".score_threshold" => "[threshold]",
            ".decoding" => "[decoding]",
        }, @r#"
        index:
          kind: memory
        embedder:
          kind: local
          cache_dir: ~
        embedding_dimension: 384
        chunk:
          chunk_size: 150
          chunk_overlap: 30
        top_k: 5
        score_threshold: "[threshold]"
        max_contexts: 5
        decoding: "[decoding]"
        "#);
    }

    #[test]
    fn test_qdrant_and_watsonx() {
        let config = RagConfig::from_lookup(lookup(&[
            ("PDFQA_INDEX", "Qdrant"),
            ("QDRANT_URL", "http://qdrant:6334"),
            ("QDRANT_API_KEY", "secret"),
            ("PDFQA_EMBEDDER", "watsonx"),
            ("EMBEDDING_DIMENSION", "768"),
        ]))
        .unwrap();

        assert_eq!(
            config.index,
            IndexBackend::Qdrant {
                url: "http://qdrant:6334".to_string(),
                collection: "documents".to_string(),
                api_key: Some("secret".to_string()),
            }
        );
        assert_eq!(
            config.embedder,
            EmbeddingBackend::Watsonx {
                model_id: "ibm/slate-30m-english-rtrvr".to_string()
            }
        );
        assert_eq!(config.embedding_dimension, 768);
    }

    #[test]
    fn test_decoding_overrides() {
        let config = RagConfig::from_lookup(lookup(&[
            ("GENERATION_MODEL", "ibm/granite-13b-instruct-v2"),
            ("MAX_NEW_TOKENS", "64"),
            ("NUM_BEAMS", "1"),
            ("REPETITION_PENALTY", "1.1"),
        ]))
        .unwrap();

        assert_eq!(config.decoding.model_id, "ibm/granite-13b-instruct-v2");
        assert_eq!(config.decoding.max_new_tokens, 64);
        assert_eq!(config.decoding.strategy, DecodingStrategy::Greedy);
        assert!((config.decoding.repetition_penalty - 1.1).abs() < 1e-6);
    }

    #[test]
    fn test_hashing_gets_its_own_threshold() {
        let config = RagConfig::from_lookup(lookup(&[("PDFQA_EMBEDDER", "hashing")])).unwrap();
        assert_eq!(config.embedder, EmbeddingBackend::Hashing);
        assert_eq!(config.score_threshold, Some(HashingEmbedder::SCORE_THRESHOLD));

        let config = RagConfig::from_lookup(lookup(&[
            ("PDFQA_EMBEDDER", "hashing"),
            ("SCORE_THRESHOLD", "0.3"),
        ]))
        .unwrap();
        assert_eq!(config.score_threshold, Some(0.3));
    }

    #[test]
    fn test_local_model_cache_dir() {
        let config = RagConfig::from_lookup(lookup(&[
            ("PDFQA_EMBEDDER", "LOCAL"),
            ("EMBEDDING_CACHE_DIR", "/var/cache/pdfqa"),
        ]))
        .unwrap();
        assert_eq!(
            config.embedder,
            EmbeddingBackend::Local {
                cache_dir: Some(PathBuf::from("/var/cache/pdfqa"))
            }
        );
    }

    #[test]
    fn test_threshold_can_be_disabled() {
        let config = RagConfig::from_lookup(lookup(&[("SCORE_THRESHOLD", "none")])).unwrap();
        assert_eq!(config.score_threshold, None);

        let config = RagConfig::from_lookup(lookup(&[("SCORE_THRESHOLD", "0.25")])).unwrap();
        assert_eq!(config.score_threshold, Some(0.25));
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = RagConfig::from_lookup(lookup(&[("TOP_K", "  ")])).unwrap();
        assert_eq!(config.top_k, 5);
    }

    #[test]
    fn test_invalid_values_are_configuration_errors() {
        for pairs in [
            &[("TOP_K", "many")][..],
            &[("CHUNK_SIZE", "100"), ("CHUNK_OVERLAP", "100")][..],
            &[("PDFQA_INDEX", "sqlite")][..],
            &[("PDFQA_EMBEDDER", "openai")][..],
            &[("EMBEDDING_DIMENSION", "0")][..],
            &[("TOP_K", "0")][..],
            &[("EMBEDDING_DIMENSION", "768")][..],
        ] {
            assert!(
                matches!(RagConfig::from_lookup(lookup(pairs)), Err(Error::Configuration(_))),
                "{:?} should be rejected",
                pairs
            );
        }
    }
}
