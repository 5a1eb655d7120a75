//! LLM abstraction layer
//!
//! Providers turn prompts into natural-language output through the `Llm`
//! trait. The concrete backend is an Ollama server reached over HTTP.

mod ollama;

pub use ollama::OllamaClient;

use anyhow::Result;
use async_trait::async_trait;

/// A single completion request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            temperature: 0.3,
            max_tokens: 4000,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Generated text plus token accounting
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub text: String,
    pub tokens_used: u64,
}

/// Trait for text-generation backends
#[async_trait]
pub trait Llm: Send + Sync {
    /// Generate a completion for the request
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;

    /// Get the model name
    fn model(&self) -> &str;
}
