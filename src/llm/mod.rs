//! Generation-model abstraction.
//!
//! Evolutions and filters talk to language models through the
//! [`GenerationModel`] trait so the orchestrator never depends on a
//! concrete backend. [`OpenAiModel`] is the built-in HTTP backend for
//! OpenAI-compatible chat-completion endpoints.

pub mod error;
pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use error::LlmError;
pub use openai::{OpenAiConfig, OpenAiModel};

/// One completion round-trip sent to a generation model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Optional system instruction prepended to the conversation.
    #[serde(default)]
    pub system: Option<String>,
    /// The rendered user prompt.
    pub prompt: String,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<i32>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Response from a completion round-trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
}

/// A text-generation backend.
///
/// Implementations are shared behind `Arc` and invoked concurrently by
/// many in-flight generation tasks, so they must be `Send + Sync`.
#[async_trait]
pub trait GenerationModel: Send + Sync {
    /// Stable identifier used in logs.
    fn id(&self) -> &str;

    /// Run one completion round-trip.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}
