use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use common::LlmConfig;

use super::{Completion, CompletionProvider, CompletionRequest, TokenUsage};

const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct RemoteLlmProvider {
    endpoint: String,
    api_key: String,
    model: String,
    timeout: Duration,
    max_tokens: usize,
    http: reqwest::Client,
}

impl RemoteLlmProvider {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let defaults = LlmConfig::default();
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout: Duration::from_secs(defaults.timeout_seconds),
            max_tokens: defaults.max_tokens,
            http: reqwest::Client::new(),
        }
    }

    /// Provider for the `[llm]` section. The key is read from the environment
    /// by the caller so a missing key can disable AI summaries instead.
    pub fn from_config(config: &LlmConfig, api_key: impl Into<String>) -> Self {
        let mut provider = Self::new(&config.api_url, api_key, &config.model);
        provider.timeout = Duration::from_secs(config.timeout_seconds);
        provider.max_tokens = config.max_tokens;
        provider
    }

    async fn post(&self, body: &ChatRequest<'_>) -> Result<ChatResponse> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .context("completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            bail!("completion endpoint returned {}: {}", status, detail.trim());
        }

        response
            .json::<ChatResponse>()
            .await
            .context("unreadable completion response")
    }
}

#[async_trait::async_trait]
impl CompletionProvider for RemoteLlmProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        let timeout = request.timeout.unwrap_or(self.timeout);

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref() {
            messages.push(ChatMessage { role: "system", content: system });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        let body = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: request.max_tokens.unwrap_or(self.max_tokens),
            temperature: request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        };

        // One deadline for connect, status and body
        let reply = tokio::time::timeout(timeout, self.post(&body))
            .await
            .with_context(|| format!("completion request timed out after {:?}", timeout))??;

        let text = reply
            .choices
            .into_iter()
            .next()
            .context("completion response has no choices")?
            .message
            .content
            .unwrap_or_default();

        let usage = reply.usage.map(|u| TokenUsage {
            prompt: u.prompt_tokens,
            completion: u.completion_tokens,
            total: u.total_tokens,
        });
        debug!(model = %self.model, ?usage, "completion received");

        Ok(Completion {
            text,
            model: reply.model.unwrap_or_else(|| self.model.clone()),
            usage,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    // null when the model refuses or only calls tools
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
    #[serde(default)]
    total_tokens: usize,
}
