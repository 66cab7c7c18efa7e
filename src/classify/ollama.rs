//! Ollama-compatible inference client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{OllamaConfig, INFERENCE_PROBE_TIMEOUT, MAX_ANSWER_PREVIEW_CHARS};
use crate::error_handling::InferenceError;
use crate::utils::truncate_chars;

/// A text completion service.
#[async_trait]
pub trait Inference: Send + Sync {
    /// Sends `prompt` and returns the raw answer text.
    async fn infer(&self, prompt: &str) -> Result<String, InferenceError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
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

/// Client for `POST {base_url}/api/generate`.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(client: reqwest::Client, config: &OllamaConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Checks that the service answers and knows the configured model.
    ///
    /// Returns `Ok(false)` when the service is up but the model is missing.
    ///
    /// # Errors
    ///
    /// Returns an `InferenceError` if the service cannot be reached or answers
    /// with an error status.
    pub async fn check_model(&self) -> Result<bool, InferenceError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(INFERENCE_PROBE_TIMEOUT)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let tags: TagsResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(map_reqwest_error)?;
        Ok(tags.models.iter().any(|tag| tag.name.contains(&self.model)))
    }
}

#[async_trait]
impl Inference for OllamaClient {
    async fn infer(&self, prompt: &str) -> Result<String, InferenceError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: "json",
        };
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let body: GenerateResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(map_reqwest_error)?;
        Ok(body.response)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, InferenceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = if text.trim().is_empty() {
        status.canonical_reason().unwrap_or("").to_string()
    } else {
        truncate_chars(text.trim(), MAX_ANSWER_PREVIEW_CHARS)
    };
    Err(InferenceError::Status {
        status: status.as_u16(),
        message,
    })
}

fn map_reqwest_error(error: reqwest::Error) -> InferenceError {
    if error.is_timeout() {
        InferenceError::Timeout
    } else if error.is_decode() {
        InferenceError::InvalidResponse(error.to_string())
    } else if let Some(status) = error.status() {
        InferenceError::Status {
            status: status.as_u16(),
            message: error.to_string(),
        }
    } else {
        InferenceError::ServiceUnavailable(error.to_string())
    }
}
