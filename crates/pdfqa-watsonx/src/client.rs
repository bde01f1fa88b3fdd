//! watsonx.ai client implementation

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, warn};

use pdfqa_core::{
    DecodingConfig, DecodingStrategy, EmbeddingProvider, Error, GenerationModel, Result, normalize,
};

use crate::config::WatsonxConfig;

const GENERATION_VERSION: &str = "2023-05-29";
const EMBEDDING_VERSION: &str = "2023-10-25";

/// Inputs sent per embedding request
const EMBEDDING_BATCH: usize = 64;

/// watsonx.ai client for text generation
///
/// The IAM token is fetched on first use and dropped again when the service
/// answers 401, so the next call authenticates afresh.
pub struct WatsonxClient {
    config: WatsonxConfig,
    access_token: RwLock<Option<String>>,
    client: Client,
    current_model: String,
}

#[derive(Serialize)]
struct TokenRequest {
    grant_type: String,
    apikey: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct GenerationParams {
    decoding_method: &'static str,
    max_new_tokens: u32,
    min_new_tokens: u32,
    repetition_penalty: f32,
    truncate_input_tokens: u32,
    stop_sequences: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
}

impl GenerationParams {
    /// watsonx has no beam search, so beams fall back to deterministic greedy
    pub(crate) fn from_decoding(config: &DecodingConfig) -> Self {
        let (decoding_method, temperature, top_p, top_k) = match &config.strategy {
            DecodingStrategy::Beam { .. } | DecodingStrategy::Greedy => ("greedy", None, None, None),
            DecodingStrategy::Sample {
                temperature,
                top_p,
                top_k,
            } => ("sample", Some(*temperature), Some(*top_p), Some(*top_k)),
        };

        Self {
            decoding_method,
            max_new_tokens: config.max_new_tokens,
            min_new_tokens: config.min_new_tokens,
            repetition_penalty: config.repetition_penalty,
            truncate_input_tokens: config.max_input_tokens,
            stop_sequences: config.stop_sequences.clone(),
            temperature,
            top_p,
            top_k,
        }
    }
}

#[derive(Serialize)]
struct GenerationRequest<'a> {
    input: &'a str,
    parameters: GenerationParams,
    model_id: &'a str,
    project_id: &'a str,
}

#[derive(Deserialize)]
struct GenerationResults {
    generated_text: String,
}

#[derive(Deserialize)]
struct GenerationData {
    results: Vec<GenerationResults>,
}

#[derive(Serialize)]
struct EmbeddingParams {
    truncate_input_tokens: u32,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    inputs: &'a [String],
    model_id: &'a str,
    project_id: &'a str,
    parameters: EmbeddingParams,
}

#[derive(Deserialize)]
struct EmbeddingResult {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    results: Vec<EmbeddingResult>,
}

/// Concatenate the generated text of every `data:` event in a generation stream
pub(crate) fn parse_event_stream(body: &str) -> String {
    let mut answer = String::new();

    for line in body.lines() {
        let Some(json_data) = line.strip_prefix("data:") else {
            continue;
        };
        let json_data = json_data.trim();
        if json_data.is_empty() || json_data == "[DONE]" {
            continue;
        }

        match serde_json::from_str::<GenerationData>(json_data) {
            Ok(data) => {
                if let Some(result) = data.results.first() {
                    answer.push_str(&result.generated_text);
                }
            }
            Err(e) => {
                warn!(line = json_data, error = %e, "failed to parse generation event");
            }
        }
    }

    answer
}

impl WatsonxClient {
    /// Model constants
    pub const GRANITE_3_3_8B_INSTRUCT: &'static str = "ibm/granite-3-3-8b-instruct";
    pub const GRANITE_13B_INSTRUCT: &'static str = "ibm/granite-13b-instruct-v2";

    /// Create a new client from configuration
    pub fn new(config: WatsonxConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            config,
            access_token: RwLock::new(None),
            client,
            current_model: Self::GRANITE_3_3_8B_INSTRUCT.to_string(),
        })
    }

    /// Set the model reported by `model_id` when no decoding config overrides it
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.current_model = model_id.into();
        self
    }

    /// Exchange the API key for an IAM access token
    pub async fn connect(&self) -> Result<()> {
        let token_request = TokenRequest {
            grant_type: "urn:ibm:params:oauth:grant-type:apikey".to_string(),
            apikey: self.config.api_key.clone(),
        };

        let response = self
            .client
            .post(self.config.token_url())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .form(&token_request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Authentication(format!(
                "Authentication failed: {}",
                response.status()
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))?;

        *self.access_token.write().await = Some(token_response.access_token);
        debug!("obtained IAM access token");
        Ok(())
    }

    async fn token(&self) -> Result<String> {
        if let Some(token) = self.access_token.read().await.clone() {
            return Ok(token);
        }
        self.connect().await?;
        self.access_token
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::Authentication("no access token after connect".to_string()))
    }

    /// POST `body` to `path` and return the response text
    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<String> {
        let token = self.token().await?;
        let url = format!("{}{}", self.config.api_url, path);

        let response = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", token))
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            *self.access_token.write().await = None;
            return Err(Error::Authentication(
                "watsonx.ai rejected the access token".to_string(),
            ));
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Network(format!(
                "watsonx.ai request failed with status {}: {}",
                status, text
            )));
        }

        Ok(text)
    }

    async fn perform_generation(&self, prompt: &str, config: &DecodingConfig) -> Result<String> {
        let request = GenerationRequest {
            input: prompt,
            parameters: GenerationParams::from_decoding(config),
            model_id: &config.model_id,
            project_id: &self.config.project_id,
        };

        let path = format!("/ml/v1/text/generation_stream?version={}", GENERATION_VERSION);
        let body = self.post(&path, &request).await?;

        let answer = parse_event_stream(&body);
        if answer.trim().is_empty() {
            return Err(Error::Generation(format!(
                "Empty response from watsonx.ai. Raw response: {}",
                body
            )));
        }

        Ok(answer.trim().to_string())
    }

    /// Embed one batch with `model_id`
    pub async fn embed_texts(&self, model_id: &str, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            inputs: texts,
            model_id,
            project_id: &self.config.project_id,
            parameters: EmbeddingParams {
                truncate_input_tokens: 512,
            },
        };

        let path = format!("/ml/v1/text/embeddings?version={}", EMBEDDING_VERSION);
        let body = self.post(&path, &request).await?;
        let response: EmbeddingResponse =
            serde_json::from_str(&body).map_err(|e| Error::Serialization(e.to_string()))?;

        Ok(response.results.into_iter().map(|r| r.embedding).collect())
    }
}

#[async_trait]
impl GenerationModel for WatsonxClient {
    async fn generate(&self, prompt: &str, config: &DecodingConfig) -> Result<String> {
        debug!(model = %config.model_id, "calling watsonx.ai generation");
        match timeout(config.timeout, self.perform_generation(prompt, config)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout("Request timed out".to_string())),
        }
    }

    fn model_id(&self) -> &str {
        &self.current_model
    }
}

/// Embedding provider backed by a watsonx.ai embedding model
pub struct WatsonxEmbedder {
    client: Arc<WatsonxClient>,
    model_id: String,
    dimension: usize,
}

impl WatsonxEmbedder {
    pub const SLATE_30M_ENGLISH: &'static str = "ibm/slate-30m-english-rtrvr";

    pub fn new(client: Arc<WatsonxClient>, model_id: impl Into<String>, dimension: usize) -> Self {
        Self {
            client,
            model_id: model_id.into(),
            dimension,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for WatsonxEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(EMBEDDING_BATCH) {
            let embedded = self
                .client
                .embed_texts(&self.model_id, batch)
                .await
                .map_err(|e| Error::EmbeddingProvider(e.to_string()))?;

            if embedded.len() != batch.len() {
                return Err(Error::EmbeddingProvider(format!(
                    "requested {} embeddings, received {}",
                    batch.len(),
                    embedded.len()
                )));
            }

            for mut vector in embedded {
                if vector.len() != self.dimension {
                    return Err(Error::EmbeddingProvider(format!(
                        "model {} returned dimension {}, expected {}",
                        self.model_id,
                        vector.len(),
                        self.dimension
                    )));
                }
                normalize(&mut vector);
                vectors.push(vector);
            }
        }

        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_event_stream() {
        let body = "id: 1\n\
                    event: message\n\
                    data: {\"results\":[{\"generated_text\":\"The warranty \"}]}\n\
                    \n\
                    data: {\"results\":[{\"generated_text\":\"lasts two years.\"}]}\n\
                    data: not json\n\
                    data: [DONE]\n";
        assert_eq!(parse_event_stream(body), "The warranty lasts two years.");
    }

    #[test]
    fn test_parse_event_stream_without_events() {
        assert_eq!(parse_event_stream("event: close\n"), "");
    }

    #[test]
    fn test_beam_maps_to_greedy() {
        let params = GenerationParams::from_decoding(&DecodingConfig::default());
        assert_eq!(params.decoding_method, "greedy");
        assert_eq!(params.truncate_input_tokens, 768);
        assert_eq!(params.max_new_tokens, 200);
        assert_eq!(params.top_k, None);
    }

    #[test]
    fn test_sampling_params() {
        let config = DecodingConfig {
            strategy: DecodingStrategy::Sample {
                temperature: 0.7,
                top_p: 0.9,
                top_k: 50,
            },
            ..DecodingConfig::default()
        };
        let params = GenerationParams::from_decoding(&config);
        assert_eq!(params.decoding_method, "sample");
        assert_eq!(params.top_k, Some(50));

        let json = serde_json::to_value(&params).unwrap();
        assert!(json.get("temperature").is_some());
        assert_eq!(json["stop_sequences"][0], "Question:");
    }

    #[test]
    fn test_greedy_params_omit_sampling_fields() {
        let json = serde_json::to_value(GenerationParams::from_decoding(&DecodingConfig::default()))
            .unwrap();
        assert!(json.get("temperature").is_none());
        assert!(json.get("top_p").is_none());
    }
}
