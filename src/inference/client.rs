//! Core `InferenceApi` trait and the hosted-endpoint implementation.
//!
//! [`HfInferenceClient`] speaks the Hugging Face hosted-inference wire
//! format: `POST {base_url}/models/{model}` with a bearer credential, raw
//! binary bodies for audio/image tasks and JSON `inputs` bodies for text
//! tasks. All connection details come from [`InferenceConfig`]; nothing is
//! hardcoded.
//!
//! The client performs no retries. Each call classifies its outcome into a
//! success value or a typed [`InferenceError`]; retry policy, if any,
//! belongs to the caller.

use async_trait::async_trait;
use base64::Engine;
use thiserror::Error;

use crate::config::InferenceConfig;
use crate::inference::decode::extract_text;

// ---------------------------------------------------------------------------
// InferenceError
// ---------------------------------------------------------------------------

/// Errors that can occur during an inference call.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("inference request timed out")]
    Timeout,

    /// The endpoint answered with a non-success status. Carries the raw
    /// body for diagnostics.
    #[error("inference endpoint returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The response body could not be read or parsed as JSON.
    #[error("failed to read inference response: {0}")]
    Response(String),
}

impl From<reqwest::Error> for InferenceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            InferenceError::Timeout
        } else {
            InferenceError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// InferenceApi trait
// ---------------------------------------------------------------------------

/// Async, object-safe interface to the inference capabilities.
///
/// Implementors must be `Send + Sync` so they can be shared across threads
/// behind an `Arc<dyn InferenceApi>`. Every call is independent; the
/// implementation retains no state between calls.
#[async_trait]
pub trait InferenceApi: Send + Sync {
    /// Speech-to-text: `audio` is a complete PCM-in-container file.
    async fn transcribe(&self, audio: &[u8]) -> Result<String, InferenceError>;

    /// Text generation from `prompt`, bounded by the configured token limit.
    async fn generate(&self, prompt: &str) -> Result<String, InferenceError>;

    /// Visual question answering over `image`. An empty `question` is
    /// forwarded as-is; the backend defines its behaviour.
    async fn answer_visual_question(
        &self,
        image: &[u8],
        question: &str,
    ) -> Result<String, InferenceError>;

    /// Image captioning over `image`.
    async fn caption_image(&self, image: &[u8]) -> Result<String, InferenceError>;

    /// Text-to-speech: returns the synthesized audio bytes.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, InferenceError>;
}

// ---------------------------------------------------------------------------
// HfInferenceClient
// ---------------------------------------------------------------------------

/// Production [`InferenceApi`] over hosted inference endpoints.
///
/// # Credential handling
///
/// The `Authorization: Bearer …` header is attached **only** when the
/// configured token is non-empty — safe against local gateways that require
/// no authentication.
pub struct HfInferenceClient {
    client: reqwest::Client,
    config: InferenceConfig,
}

impl HfInferenceClient {
    /// Build a client from inference config.
    ///
    /// The HTTP client is pre-configured with the per-request timeout from
    /// `config.timeout_secs`. A default client is used as a last-resort
    /// fallback if the builder fails (should never happen in practice).
    pub fn from_config(config: &InferenceConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    fn model_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut req = self.client.post(url);
        if !self.config.api_token.is_empty() {
            req = req.bearer_auth(&self.config.api_token);
        }
        req
    }

    /// Decode a text-task response body leniently.
    async fn read_text(&self, response: reqwest::Response) -> Result<String, InferenceError> {
        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| InferenceError::Response(e.to_string()))?;
        Ok(extract_text(&value))
    }
}

/// Turn a non-success status into [`InferenceError::Api`], capturing the
/// raw body for diagnostics.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, InferenceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(InferenceError::Api {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl InferenceApi for HfInferenceClient {
    async fn transcribe(&self, audio: &[u8]) -> Result<String, InferenceError> {
        log::debug!(
            "inference: transcribe ({} bytes → {})",
            audio.len(),
            self.config.asr_model
        );
        let url = self.model_url(&self.config.asr_model);
        let response = self.request(&url).body(audio.to_vec()).send().await?;
        let response = check_status(response).await?;
        self.read_text(response).await
    }

    async fn generate(&self, prompt: &str) -> Result<String, InferenceError> {
        log::debug!("inference: generate ({})", self.config.text_model);
        let url = self.model_url(&self.config.text_model);
        let body = serde_json::json!({
            "inputs": prompt,
            "parameters": { "max_new_tokens": self.config.max_new_tokens }
        });
        let response = self.request(&url).json(&body).send().await?;
        let response = check_status(response).await?;
        self.read_text(response).await
    }

    async fn answer_visual_question(
        &self,
        image: &[u8],
        question: &str,
    ) -> Result<String, InferenceError> {
        log::debug!(
            "inference: vqa ({} bytes, question len {})",
            image.len(),
            question.len()
        );
        let url = self.model_url(&self.config.vqa_model);
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let body = serde_json::json!({
            "inputs": { "image": encoded, "question": question }
        });
        let response = self.request(&url).json(&body).send().await?;
        let response = check_status(response).await?;
        self.read_text(response).await
    }

    async fn caption_image(&self, image: &[u8]) -> Result<String, InferenceError> {
        log::debug!(
            "inference: caption ({} bytes → {})",
            image.len(),
            self.config.caption_model
        );
        let url = self.model_url(&self.config.caption_model);
        let response = self.request(&url).body(image.to_vec()).send().await?;
        let response = check_status(response).await?;
        self.read_text(response).await
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, InferenceError> {
        log::debug!("inference: synthesize ({})", self.config.tts_model);
        let url = self.model_url(&self.config.tts_model);
        let body = serde_json::json!({ "inputs": text });
        let response = self.request(&url).json(&body).send().await?;
        let response = check_status(response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| InferenceError::Response(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
