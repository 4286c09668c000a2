//! Generation client with bounded retries.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backend::CompletionBackend;
use crate::config::{GenerationConfig, GenerationMode};
use crate::error::{GenerationError, Result};

/// Calls a [`CompletionBackend`], retrying failed attempts with a fixed delay.
///
/// At most `retry.max_attempts` attempts are made. The wait between attempts
/// ends early with [`GenerationError::Cancelled`] when the client's
/// cancellation token fires.
pub struct GenerationClient {
    backend: Arc<dyn CompletionBackend>,
    config: GenerationConfig,
    cancel: CancellationToken,
}

impl GenerationClient {
    pub fn new(backend: Arc<dyn CompletionBackend>, config: GenerationConfig) -> Self {
        Self {
            backend,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Generate with the configured mode.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_with_mode(prompt, self.config.mode).await
    }

    /// Generate, retrying transient failures.
    pub async fn generate_with_mode(&self, prompt: &str, mode: GenerationMode) -> Result<String> {
        let max_attempts = self.config.retry.attempts();
        let mut attempt = 1;

        loop {
            if self.cancel.is_cancelled() {
                return Err(GenerationError::Cancelled);
            }

            let err = match self.attempt(prompt, mode).await {
                Ok(text) => {
                    if attempt > 1 {
                        info!("Generation succeeded on attempt {attempt}");
                    }
                    return Ok(text);
                }
                Err(err) => err,
            };

            if !err.is_retryable() {
                return Err(err);
            }

            if attempt >= max_attempts {
                error!(attempts = attempt, error = %err, "Generation failed, giving up");
                return Err(GenerationError::Exhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            warn!(
                attempt,
                max_attempts,
                error = %err,
                "Generation attempt failed, retrying"
            );

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(GenerationError::Cancelled),
                _ = tokio::time::sleep(self.config.retry.delay()) => {}
            }
            attempt += 1;
        }
    }

    async fn attempt(&self, prompt: &str, mode: GenerationMode) -> Result<String> {
        match mode {
            GenerationMode::SingleShot => self.backend.complete(prompt, &self.config).await,
            GenerationMode::Incremental => {
                let fragments = self.backend.complete_stream(prompt, &self.config).await?;
                debug!("Received {} fragments", fragments.len());
                Ok(join_fragments(fragments))
            }
        }
    }
}

/// Join fragments with a single space, using "" for unreadable ones.
pub fn join_fragments(fragments: Vec<Option<String>>) -> String {
    fragments
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect::<Vec<_>>()
        .join(" ")
}
