use crate::error::FailureKind;
use crate::llm::tiers::ModelTier;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Generation parameters sent with every model call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4096,
        }
    }
}

/// One call to the remote model service.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    pub model: &'a str,
    pub system_prompt: Option<&'a str>,
    pub prompt: &'a str,
    pub params: GenerationParams,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    /// Rough character-based estimate used when the service reports no usage.
    pub fn estimate(prompt: &str, output: &str) -> Self {
        Self {
            input_tokens: u64::try_from(prompt.chars().count() / 4).unwrap_or(u64::MAX),
            output_tokens: u64::try_from(output.chars().count() / 4).unwrap_or(u64::MAX),
        }
    }

    pub fn total(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelResponse {
    pub text: String,
    pub usage: Option<TokenUsage>,
    /// Model id echoed by the service, when it reports one.
    pub model: Option<String>,
}

impl ModelResponse {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
            model: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    RateLimited,
    Error,
}

impl From<FailureKind> for AttemptOutcome {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::RateLimited => Self::RateLimited,
            FailureKind::Transient | FailureKind::Permanent => Self::Error,
        }
    }
}

/// Telemetry for a single call inside the retry loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationAttempt {
    pub model: String,
    /// 1-based attempt number for this model.
    pub attempt: u32,
    pub outcome: AttemptOutcome,
    pub latency: Duration,
    pub usage: Option<TokenUsage>,
    pub output_chars: Option<usize>,
    pub error_code: Option<String>,
}

/// What a node asks the invoker to do.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub node: &'a str,
    pub tier: ModelTier,
    pub prompt: &'a str,
    pub system_prompt: Option<&'a str>,
    /// Model tried ahead of the tier's chain.
    pub pinned_model: Option<&'a str>,
}

impl<'a> Invocation<'a> {
    pub fn new(node: &'a str, tier: ModelTier, prompt: &'a str) -> Self {
        Self {
            node,
            tier,
            prompt,
            system_prompt: None,
            pinned_model: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: Option<&'a str>) -> Self {
        self.system_prompt = system_prompt;
        self
    }

    pub fn with_pinned_model(mut self, model: Option<&'a str>) -> Self {
        self.pinned_model = model;
        self
    }
}

#[derive(Debug, Clone)]
pub struct InvocationSuccess {
    pub text: String,
    pub model: String,
    pub total_attempts: u32,
    /// Number of times the invoker moved on to another model.
    pub fallbacks: u32,
    pub usage: Option<TokenUsage>,
    pub history: Vec<InvocationAttempt>,
}
