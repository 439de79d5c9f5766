use crate::llm::tiers::ModelTier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Remote model service ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of an OpenAI-compatible endpoint (`/chat/completions` is appended).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:4000/v1".into()
}

fn default_timeout_secs() -> u64 {
    crate::llm::http_client::DEFAULT_TIMEOUT_SECS
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ── Generation parameters ────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    4096
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

// ── Retry / fallback ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    /// Attempts per model, including the first call.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Lower tiers whose primary model is appended to a tier's chain.
    #[serde(default = "default_cross_tier_depth")]
    pub cross_tier_depth: usize,
    /// Provider error codes treated as throttling.
    #[serde(default = "default_throttling_codes")]
    pub throttling_codes: Vec<String>,
    /// Also retry transient failures on the same model.
    #[serde(default)]
    pub retry_transient: bool,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    60_000
}

fn default_cross_tier_depth() -> usize {
    1
}

fn default_throttling_codes() -> Vec<String> {
    vec![
        "ThrottlingException".into(),
        "TooManyRequestsException".into(),
        "429".into(),
    ]
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            cross_tier_depth: default_cross_tier_depth(),
            throttling_codes: default_throttling_codes(),
            retry_transient: false,
        }
    }
}

// ── Agents and providers ─────────────────────────────────────────

/// Per-agent override: `[agents.pricing_strategist]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<ModelTier>,
    /// Model tried before the tier's chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Custom tier table: `[providers.bedrock_eu] tiers = { tier1 = ["..."] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomProviderConfig {
    #[serde(default)]
    pub tiers: BTreeMap<ModelTier, Vec<String>>,
}
