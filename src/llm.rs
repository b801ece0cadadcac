//! Ollama client.
//!
//! Thin wrapper over the local Ollama HTTP API: single-shot text
//! generation plus a fast health probe. The `LlmBackend` trait is the
//! seam the agent loop runs against, so tests can script a backend
//! without a live server.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const HEALTH_TIMEOUT_SECONDS: u64 = 2;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("cannot connect to Ollama at {url}. Is Ollama running?")]
    Connect { url: String },

    #[error("request timed out after {seconds}s. Try a smaller model or raise the timeout")]
    Timeout { seconds: u64 },

    #[error("Ollama API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to parse Ollama response: {0}")]
    InvalidResponse(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Per-request generation knobs.
#[derive(Debug, Clone, Copy)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub num_predict: i32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            num_predict: 500,
        }
    }
}

/// Seam between the agent loop and the model serving it.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn generate(&self, prompt: &str, options: GenerateOptions) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: RequestOptions,
}

#[derive(Debug, Serialize)]
struct RequestOptions {
    temperature: f32,
    num_predict: i32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

/// Outcome of the `/api/tags` probe.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub available: bool,
    pub url: String,
    pub models: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct OllamaClient {
    base_url: String,
    model: String,
    timeout_seconds: u64,
    http_client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout_seconds: u64) -> Result<Self, LlmError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout_seconds,
            http_client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Probe `/api/tags` with a short deadline and report what is served.
    pub async fn health_check(&self) -> HealthStatus {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .timeout(Duration::from_secs(HEALTH_TIMEOUT_SECONDS))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => match resp.json::<TagsResponse>().await {
                Ok(tags) => HealthStatus {
                    available: true,
                    url: self.base_url.clone(),
                    models: tags.models.into_iter().map(|m| m.name).collect(),
                    error: None,
                },
                Err(e) => HealthStatus {
                    available: false,
                    url: self.base_url.clone(),
                    models: Vec::new(),
                    error: Some(format!("invalid tags response: {}", e)),
                },
            },
            Ok(resp) => HealthStatus {
                available: false,
                url: self.base_url.clone(),
                models: Vec::new(),
                error: Some(format!("HTTP {}", resp.status())),
            },
            Err(e) => HealthStatus {
                available: false,
                url: self.base_url.clone(),
                models: Vec::new(),
                error: Some(self.map_error(e).to_string()),
            },
        }
    }

    fn map_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_timeout() {
            LlmError::Timeout {
                seconds: self.timeout_seconds,
            }
        } else if e.is_connect() {
            LlmError::Connect {
                url: self.base_url.clone(),
            }
        } else {
            LlmError::Http(e)
        }
    }
}

#[async_trait]
impl LlmBackend for OllamaClient {
    async fn generate(&self, prompt: &str, options: GenerateOptions) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: RequestOptions {
                temperature: options.temperature,
                num_predict: options.num_predict,
            },
        };

        debug!("Sending generate request ({} prompt chars)", prompt.len());

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }

        let generate_response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(generate_response.response)
    }
}
