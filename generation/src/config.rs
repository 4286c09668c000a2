//! Generation settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Gemini model variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeminiModel {
    #[default]
    Flash,
    Pro,
}

impl GeminiModel {
    /// Model id as published on Vertex AI.
    pub fn model_id(self) -> &'static str {
        match self {
            GeminiModel::Flash => "gemini-1.5-flash-001",
            GeminiModel::Pro => "gemini-1.5-pro-001",
        }
    }
}

/// How the response is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// One request, one complete response.
    #[default]
    SingleShot,

    /// Streamed fragments joined with a single space.
    Incremental,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HarmCategory {
    #[serde(rename = "HARM_CATEGORY_HATE_SPEECH")]
    HateSpeech,
    #[serde(rename = "HARM_CATEGORY_DANGEROUS_CONTENT")]
    DangerousContent,
    #[serde(rename = "HARM_CATEGORY_SEXUALLY_EXPLICIT")]
    SexuallyExplicit,
    #[serde(rename = "HARM_CATEGORY_HARASSMENT")]
    Harassment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold {
    BlockLowAndAbove,
    BlockMediumAndAbove,
    BlockOnlyHigh,
    BlockNone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

/// Bounded retry with a fixed delay between attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,

    /// Pause between attempts, in milliseconds.
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay_ms: delay.as_millis() as u64,
        }
    }

    /// Attempts actually made; at least one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Settings sent with every generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub model: GeminiModel,
    pub mode: GenerationMode,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub safety_settings: Vec<SafetySetting>,
    pub retry: RetryPolicy,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        let block_only_high = |category| SafetySetting {
            category,
            threshold: HarmBlockThreshold::BlockOnlyHigh,
        };
        Self {
            model: GeminiModel::Flash,
            mode: GenerationMode::SingleShot,
            temperature: 0.7,
            max_output_tokens: 1024,
            safety_settings: vec![
                block_only_high(HarmCategory::HateSpeech),
                block_only_high(HarmCategory::DangerousContent),
                block_only_high(HarmCategory::SexuallyExplicit),
                block_only_high(HarmCategory::Harassment),
            ],
            retry: RetryPolicy::default(),
        }
    }
}

impl GenerationConfig {
    pub fn with_model(mut self, model: GeminiModel) -> Self {
        self.model = model;
        self
    }

    pub fn with_mode(mut self, mode: GenerationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Where and how to reach Vertex AI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub project: Option<String>,
    pub location: String,

    /// OAuth bearer token.
    #[serde(skip_serializing)]
    pub access_token: Option<String>,

    /// Endpoint override, mostly for tests.
    pub base_url: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            project: None,
            location: "us-central1".to_string(),
            access_token: None,
            base_url: None,
        }
    }
}

impl GeminiConfig {
    /// Read `GCP_PROJECT`, `GCP_REGION` and `GOOGLE_ACCESS_TOKEN`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            project: std::env::var("GCP_PROJECT").ok(),
            location: std::env::var("GCP_REGION").unwrap_or(defaults.location),
            access_token: std::env::var("GOOGLE_ACCESS_TOKEN").ok(),
            base_url: None,
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn endpoint(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}-aiplatform.googleapis.com", self.location))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_generation_config() {
        let config = GenerationConfig::default();
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.max_output_tokens, 1024);
        assert_eq!(config.safety_settings.len(), 4);
        assert!(
            config
                .safety_settings
                .iter()
                .all(|s| s.threshold == HarmBlockThreshold::BlockOnlyHigh)
        );
        assert_eq!(config.retry.attempts(), 3);
        assert_eq!(config.retry.delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_model_ids() {
        assert_eq!(GeminiModel::Flash.model_id(), "gemini-1.5-flash-001");
        assert_eq!(GeminiModel::Pro.model_id(), "gemini-1.5-pro-001");
    }

    #[test]
    fn test_safety_setting_wire_format() {
        let setting = SafetySetting {
            category: HarmCategory::HateSpeech,
            threshold: HarmBlockThreshold::BlockOnlyHigh,
        };
        assert_eq!(
            serde_json::to_value(setting).unwrap(),
            serde_json::json!({
                "category": "HARM_CATEGORY_HATE_SPEECH",
                "threshold": "BLOCK_ONLY_HIGH"
            })
        );
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).attempts(), 1);
    }

    #[test]
    fn test_endpoint() {
        let config = GeminiConfig::default();
        assert_eq!(config.endpoint(), "https://us-central1-aiplatform.googleapis.com");
        let config = config.with_base_url("http://localhost:1234");
        assert_eq!(config.endpoint(), "http://localhost:1234");
    }
}
