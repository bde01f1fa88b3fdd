//! Generation model trait and decoding configuration

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::Result;

/// How the model should pick output tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum DecodingStrategy {
    /// Beam search; deterministic
    Beam { num_beams: u32 },
    /// Greedy decoding; deterministic
    Greedy,
    /// Nucleus/top-k sampling
    Sample {
        temperature: f32,
        top_p: f32,
        top_k: u32,
    },
}

/// Configuration for answer generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodingConfig {
    pub model_id: String,
    pub max_new_tokens: u32,
    pub min_new_tokens: u32,
    /// Prompt truncation bound, in model tokens
    pub max_input_tokens: u32,
    pub strategy: DecodingStrategy,
    pub repetition_penalty: f32,
    pub stop_sequences: Vec<String>,
    pub timeout: Duration,
}

impl Default for DecodingConfig {
    fn default() -> Self {
        Self {
            model_id: "ibm/granite-3-3-8b-instruct".to_string(),
            max_new_tokens: 200,
            min_new_tokens: 1,
            max_input_tokens: 768,
            strategy: DecodingStrategy::Beam { num_beams: 5 },
            repetition_penalty: 1.3,
            stop_sequences: vec!["Question:".to_string(), "Context:".to_string()],
            timeout: Duration::from_secs(60),
        }
    }
}

impl DecodingConfig {
    /// Set the beam width; a width of 1 means greedy decoding
    pub fn with_beams(mut self, num_beams: u32) -> Self {
        self.strategy = if num_beams > 1 {
            DecodingStrategy::Beam { num_beams }
        } else {
            DecodingStrategy::Greedy
        };
        self
    }
}

/// Trait for text generation models (e.g., watsonx.ai)
///
/// Calls are synchronous from the pipeline's point of view: one prompt in, one
/// bounded completion out.
#[async_trait]
pub trait GenerationModel: Send + Sync {
    /// Generate a completion for `prompt`
    async fn generate(&self, prompt: &str, config: &DecodingConfig) -> Result<String>;

    /// Get the model ID being used
    fn model_id(&self) -> &str;
}
