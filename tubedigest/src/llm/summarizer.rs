// Summary generation: ordered strategies, AI completion first, extractive last.
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{CompletionProvider, CompletionRequest};
use crate::error::SummaryError;

pub const INSUFFICIENT_CONTENT: &str = "Unable to generate summary due to insufficient content.";
pub const NO_SUMMARY: &str = "No summary could be generated.";
pub const SUMMARY_UNAVAILABLE: &str = "Unable to generate summary.";

const MIN_INPUT_CHARS: usize = 10;
const MAX_INPUT_CHARS: usize = 5000;
const EXTRACTIVE_SEGMENTS: usize = 3;
const DEFAULT_MAX_TOKENS: usize = 425;

const SYSTEM_INSTRUCTION: &str =
    "You are a helpful assistant that summarizes video content concisely with important details.";

/// One way of turning description text into a summary.
#[async_trait::async_trait]
pub trait SummaryStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn summarize(&self, text: &str) -> Result<String, SummaryError>;
}

/// Summary written by a completion provider.
pub struct LlmSummary {
    provider: Arc<dyn CompletionProvider>,
    max_tokens: usize,
}

impl LlmSummary {
    pub fn new(provider: Arc<dyn CompletionProvider>, max_tokens: usize) -> Self {
        Self {
            provider,
            max_tokens,
        }
    }
}

#[async_trait::async_trait]
impl SummaryStrategy for LlmSummary {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn summarize(&self, text: &str) -> Result<String, SummaryError> {
        let request = CompletionRequest::new(format!(
            "Please provide a concise summary of this video content: {}",
            text
        ))
        .system(SYSTEM_INSTRUCTION)
        .max_tokens(self.max_tokens);

        let completion = self
            .provider
            .complete(request)
            .await
            .map_err(SummaryError::Provider)?;

        let summary = completion.text.trim();
        if summary.is_empty() {
            return Err(SummaryError::EmptyCompletion);
        }

        debug!(
            model = %completion.model,
            total_tokens = completion.usage.map(|u| u.total),
            "completion summary generated"
        );
        Ok(summary.to_string())
    }
}

/// First sentences of the text, no outbound calls.
pub struct ExtractiveSummary;

#[async_trait::async_trait]
impl SummaryStrategy for ExtractiveSummary {
    fn name(&self) -> &'static str {
        "extractive"
    }

    async fn summarize(&self, text: &str) -> Result<String, SummaryError> {
        Ok(extractive_summary(text))
    }
}

/// Split on '.', keep the first three segments and mark truncation with "...".
pub fn extractive_summary(text: &str) -> String {
    let segments: Vec<&str> = text.split('.').collect();

    let mut summary = segments
        .iter()
        .take(EXTRACTIVE_SEGMENTS)
        .map(|s| s.trim())
        .collect::<Vec<_>>()
        .join(". ")
        .trim()
        .to_string();

    if segments.len() > EXTRACTIVE_SEGMENTS {
        summary.push_str("...");
    }

    if summary.is_empty() {
        NO_SUMMARY.to_string()
    } else {
        summary
    }
}

/// Produces a summary for description text. Never fails: each strategy is tried
/// in order and the first success wins.
pub struct SummaryGenerator {
    strategies: Vec<Box<dyn SummaryStrategy>>,
}

impl SummaryGenerator {
    /// AI completion when a provider is configured, extractive summary otherwise
    /// and as the fallback.
    pub fn new(provider: Option<Arc<dyn CompletionProvider>>, max_tokens: usize) -> Self {
        let mut strategies: Vec<Box<dyn SummaryStrategy>> = Vec::with_capacity(2);
        if let Some(provider) = provider {
            strategies.push(Box::new(LlmSummary::new(provider, max_tokens)));
        }
        strategies.push(Box::new(ExtractiveSummary));
        Self { strategies }
    }

    pub fn extractive_only() -> Self {
        Self::new(None, DEFAULT_MAX_TOKENS)
    }

    pub fn with_strategies(strategies: Vec<Box<dyn SummaryStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub async fn generate(&self, text: &str) -> String {
        if text.trim().chars().count() < MIN_INPUT_CHARS {
            return INSUFFICIENT_CONTENT.to_string();
        }

        let text: String = text.chars().take(MAX_INPUT_CHARS).collect();

        for strategy in &self.strategies {
            match strategy.summarize(&text).await {
                Ok(summary) => {
                    info!(strategy = strategy.name(), chars = summary.chars().count(), "summary generated");
                    return summary;
                }
                Err(e) => {
                    warn!(strategy = strategy.name(), error = %e, "summary strategy failed, trying next");
                }
            }
        }

        SUMMARY_UNAVAILABLE.to_string()
    }
}
