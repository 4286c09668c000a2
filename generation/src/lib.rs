//! # Generation
//!
//! Prompt completion against a generative model, with a bounded retry loop
//! and single-shot or incremental (streamed) responses.

pub mod backend;
pub mod client;
pub mod config;
pub mod error;

pub use backend::{CompletionBackend, GeminiBackend};
pub use client::{GenerationClient, join_fragments};
pub use config::{
    GeminiConfig, GeminiModel, GenerationConfig, GenerationMode, HarmBlockThreshold, HarmCategory,
    RetryPolicy, SafetySetting,
};
pub use error::{GenerationError, Result};
