//! Completion backends.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::{GeminiConfig, GenerationConfig};
use crate::error::{GenerationError, Result};

/// A model that turns a prompt into text.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Produce the whole response in one call.
    async fn complete(&self, prompt: &str, config: &GenerationConfig) -> Result<String>;

    /// Produce the response as ordered fragments. A fragment whose text
    /// could not be read is `None`.
    async fn complete_stream(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<Vec<Option<String>>>;
}

/// Gemini on Vertex AI.
pub struct GeminiBackend {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Check if project and credentials are set.
    pub fn is_available(&self) -> bool {
        self.config.project.is_some() && self.config.access_token.is_some()
    }

    async fn post(&self, method: &str, prompt: &str, config: &GenerationConfig) -> Result<reqwest::Response> {
        let project = self
            .config
            .project
            .as_deref()
            .ok_or_else(|| GenerationError::NotConfigured("GCP project not set".to_string()))?;
        let token = self
            .config
            .access_token
            .as_deref()
            .ok_or_else(|| GenerationError::NotConfigured("access token not set".to_string()))?;

        let url = format!(
            "{}/v1/projects/{project}/locations/{}/publishers/google/models/{}:{method}",
            self.config.endpoint(),
            self.config.location,
            config.model.model_id()
        );
        debug!("Requesting {method} from {}", config.model.model_id());

        let body = serde_json::json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}],
            "generationConfig": {
                "temperature": config.temperature,
                "maxOutputTokens": config.max_output_tokens
            },
            "safetySettings": config.safety_settings
        });

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {token}"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl CompletionBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, prompt: &str, config: &GenerationConfig) -> Result<String> {
        let response: GeminiResponse = self.post("generateContent", prompt, config).await?.json().await?;
        response.text().ok_or_else(|| {
            GenerationError::InvalidResponse("response has no candidate text".to_string())
        })
    }

    async fn complete_stream(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<Vec<Option<String>>> {
        let chunks: Vec<GeminiResponse> = self
            .post("streamGenerateContent", prompt, config)
            .await?
            .json()
            .await?;
        Ok(chunks.iter().map(GeminiResponse::text).collect())
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

impl GeminiResponse {
    /// Text of the first candidate, if it has any.
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let texts: Vec<&str> = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    }
}
