use crate::llm::tiers::ModelTier;
use crate::llm::types::InvocationAttempt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for the crew orchestrator.
///
/// Configuration problems are the only errors that abort a run before it
/// starts. Node-level failures are folded into [`NodeError`] and reported in
/// the run result instead of being raised.
#[derive(Debug, Error)]
pub enum CrewError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Prompt / Template ───────────────────────────────────────────────
    #[error("template: {0}")]
    Template(#[from] TemplateError),

    // ── Model service ───────────────────────────────────────────────────
    #[error("model: {0}")]
    ModelCall(#[from] ModelCallError),

    #[error("model invocation: {0}")]
    ModelInvocation(#[from] ModelInvocationError),

    // ── Caller input ────────────────────────────────────────────────────
    #[error("input rejected: {0}")]
    Input(#[from] InputRejection),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("task graph has no nodes")]
    EmptyGraph,

    #[error("invalid node name {0:?}: names must be non-empty and contain no whitespace")]
    InvalidNodeName(String),

    #[error("duplicate node name: {0}")]
    DuplicateNode(String),

    #[error("node {node} depends on unknown node {dependency} (known nodes: [{known}])")]
    UnknownDependency {
        node: String,
        dependency: String,
        known: String,
    },

    #[error("node {node} lists dependency {dependency} more than once")]
    DuplicateDependency { node: String, dependency: String },

    #[error("cycle detected: {0}")]
    Cycle(String),

    #[error("final node {0} is not part of the graph")]
    UnknownFinalNode(String),

    #[error("node {node} has an invalid prompt template: {message}")]
    InvalidTemplate { node: String, message: String },

    #[error("unknown provider: {name} (known providers: [{known}])")]
    UnknownProvider { name: String, known: String },

    #[error("{tier} is not defined for provider {provider}")]
    TierNotResolvable { provider: String, tier: ModelTier },

    #[error("invalid model tier: {0}")]
    InvalidTier(String),

    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Template errors ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("node {node}: {message}")]
pub struct TemplateError {
    pub node: String,
    pub message: String,
}

// ─── Model service errors ───────────────────────────────────────────────────

/// Coarse failure class reported by the remote model service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    RateLimited,
    Transient,
    Permanent,
}

/// Typed failure from one remote model call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelCallError {
    #[error("rate limited ({code}): {message}")]
    RateLimited {
        code: String,
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("transient error ({code}): {message}")]
    Transient { code: String, message: String },

    #[error("permanent error ({code}): {message}")]
    Permanent { code: String, message: String },
}

impl ModelCallError {
    pub fn rate_limited(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RateLimited {
            code: code.into(),
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn transient(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transient {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn permanent(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Permanent {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::RateLimited { .. } => FailureKind::RateLimited,
            Self::Transient { .. } => FailureKind::Transient,
            Self::Permanent { .. } => FailureKind::Permanent,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::RateLimited { code, .. }
            | Self::Transient { code, .. }
            | Self::Permanent { code, .. } => code,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::RateLimited { message, .. }
            | Self::Transient { message, .. }
            | Self::Permanent { message, .. } => message,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Every candidate model for a tier was tried and none produced a response.
#[derive(Debug, Clone, Error)]
#[error(
    "{tier}: {total_attempts} attempt(s) failed, last model {last_model}: {last_error}"
)]
pub struct ModelInvocationError {
    pub tier: ModelTier,
    pub last_model: String,
    pub last_error: ModelCallError,
    pub total_attempts: u32,
    /// Times the invoker moved on to the next model in the chain.
    pub fallbacks: u32,
    pub history: Vec<InvocationAttempt>,
}

impl ModelInvocationError {
    pub fn code(&self) -> &str {
        self.last_error.code()
    }
}

/// Failure of [`crate::llm::ResilientInvoker::invoke`].
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Exhausted(#[from] ModelInvocationError),
}

// ─── Node errors ─────────────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeErrorKind {
    Template,
    ModelInvocation,
    DependencyFailed,
    Cancelled,
}

/// Terminal error recorded on a failed node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeError {
    Template {
        message: String,
    },
    ModelInvocation {
        code: String,
        message: String,
        tier: ModelTier,
        model: String,
        attempts: u32,
    },
    DependencyFailed {
        dependencies: Vec<String>,
    },
    Cancelled,
}

impl NodeError {
    pub fn kind(&self) -> NodeErrorKind {
        match self {
            Self::Template { .. } => NodeErrorKind::Template,
            Self::ModelInvocation { .. } => NodeErrorKind::ModelInvocation,
            Self::DependencyFailed { .. } => NodeErrorKind::DependencyFailed,
            Self::Cancelled => NodeErrorKind::Cancelled,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::ModelInvocation { attempts, .. } => *attempts,
            _ => 0,
        }
    }
}

impl std::fmt::Display for NodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Template { message } => write!(f, "template error: {message}"),
            Self::ModelInvocation {
                code,
                message,
                model,
                attempts,
                ..
            } => write!(
                f,
                "model invocation failed after {attempts} attempt(s), last model {model} ({code}): {message}"
            ),
            Self::DependencyFailed { dependencies } => {
                write!(f, "dependency failed: {}", dependencies.join(", "))
            }
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl From<TemplateError> for NodeError {
    fn from(err: TemplateError) -> Self {
        Self::Template {
            message: err.message,
        }
    }
}

impl From<ModelInvocationError> for NodeError {
    fn from(err: ModelInvocationError) -> Self {
        Self::ModelInvocation {
            code: err.last_error.code().to_string(),
            message: err.last_error.message().to_string(),
            tier: err.tier,
            model: err.last_model,
            attempts: err.total_attempts,
        }
    }
}

// ─── Input errors ────────────────────────────────────────────────────────────

/// Caller input turned away before any node runs.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "error_type", rename_all = "snake_case")]
pub enum InputRejection {
    #[error(
        "only hotel revenue management, pricing strategy and demand forecasting requests are supported"
    )]
    IrrelevantQuery,

    #[error(
        "more information about the hotel is needed (missing: {})",
        .missing_critical_info.join(", ")
    )]
    InsufficientInformation { missing_critical_info: Vec<String> },
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, CrewError>;
