//! watsonx.ai configuration

use serde::{Deserialize, Serialize};
use std::env;

use pdfqa_core::{Error, Result};

const DEFAULT_IAM_URL: &str = "iam.cloud.ibm.com";
const DEFAULT_API_URL: &str = "https://us-south.ml.cloud.ibm.com";

/// Credentials and endpoints for the watsonx.ai client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatsonxConfig {
    #[serde(skip_serializing)]
    pub api_key: String,
    pub project_id: String,
    pub iam_url: String,
    pub api_url: String,
}

impl WatsonxConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Create configuration from a variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = var("WATSONX_API_KEY")
            .or_else(|| var("API_KEY"))
            .ok_or_else(|| {
                Error::Configuration(
                    "WATSONX_API_KEY or API_KEY environment variable not found".to_string(),
                )
            })?;

        let project_id = var("WATSONX_PROJECT_ID")
            .or_else(|| var("PROJECT_ID"))
            .ok_or_else(|| {
                Error::Configuration(
                    "WATSONX_PROJECT_ID or PROJECT_ID environment variable not found".to_string(),
                )
            })?;

        Ok(Self {
            api_key,
            project_id,
            iam_url: var("IAM_IBM_CLOUD_URL").unwrap_or_else(|| DEFAULT_IAM_URL.to_string()),
            api_url: var("WATSONX_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        })
    }

    /// Create configuration with explicit credentials and default endpoints
    pub fn new(api_key: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            project_id: project_id.into(),
            iam_url: DEFAULT_IAM_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    /// IAM token endpoint; a bare host name is assumed to speak https
    pub fn token_url(&self) -> String {
        let base = if self.iam_url.starts_with("http://") || self.iam_url.starts_with("https://") {
            self.iam_url.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", self.iam_url.trim_end_matches('/'))
        };
        format!("{}/identity/token", base)
    }
}
