//! Ollama LLM implementation
//!
//! Talks to the `/api/chat` endpoint directly so sampling options and
//! token counts are available.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Completion, CompletionRequest, Llm};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
    #[serde(default)]
    prompt_eval_count: u64,
    #[serde(default)]
    eval_count: u64,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Ollama client wrapper
pub struct OllamaClient {
    base_url: String,
    http_client: reqwest::Client,
    model: String,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(url: &str, model: &str) -> Self {
        // Normalize to scheme://host:port; fall back to the local default
        let base_url = match url::Url::parse(url) {
            Ok(parsed) => {
                let host = parsed.host_str().unwrap_or("localhost");
                let port = parsed.port().unwrap_or(11434);
                format!("{}://{}:{}", parsed.scheme(), host, port)
            }
            Err(e) => {
                tracing::warn!("Invalid Ollama URL '{}' ({}), using {}", url, e, DEFAULT_OLLAMA_URL);
                DEFAULT_OLLAMA_URL.to_string()
            }
        };

        Self {
            base_url,
            http_client: reqwest::Client::new(),
            model: model.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Llm for OllamaClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let body = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: ChatOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        tracing::debug!("Ollama request: model={} prompt_len={}", self.model, request.prompt.len());

        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Failed to send HTTP request to Ollama")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Ollama API error {}: {}", status, body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        Ok(Completion {
            text: parsed.message.content,
            tokens_used: parsed.prompt_eval_count + parsed.eval_count,
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}
