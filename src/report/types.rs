use crate::error::{NodeError, NodeErrorKind};
use crate::llm::tiers::ModelTier;
use crate::llm::types::TokenUsage;
use crate::planner::NodeState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    Success,
    PartialSuccess,
    Failure,
}

impl RunStatus {
    /// Process exit code for the CLI.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::PartialSuccess => 2,
            Self::Failure => 1,
        }
    }
}

/// Terminal record of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeReport {
    pub name: String,
    pub agent: String,
    pub tier: ModelTier,
    pub state: NodeState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<NodeError>,
    /// Operator-facing reason for a failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub attempts: u32,
    pub fallbacks: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
}

impl NodeReport {
    pub fn succeeded(&self) -> bool {
        self.state == NodeState::Succeeded
    }

    pub fn error_kind(&self) -> Option<NodeErrorKind> {
        self.error.as_ref().map(NodeError::kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: String,
    pub provider: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub completed: Vec<String>,
    pub failed: Vec<String>,
    pub cancelled: bool,
}

/// Everything a run produced. Built once by the aggregator and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: RunStatus,
    pub title: String,
    pub final_node: String,
    /// Nodes in topological order.
    pub nodes: Vec<NodeReport>,
    /// Composite report, or a degraded summary when the final node failed.
    pub document: String,
    pub metadata: RunMetadata,
}

impl ExecutionResult {
    pub fn node(&self, name: &str) -> Option<&NodeReport> {
        self.nodes.iter().find(|node| node.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&str> {
        self.node(name).and_then(|node| node.output.as_deref())
    }

    pub fn total_usage(&self) -> TokenUsage {
        self.nodes
            .iter()
            .filter_map(|node| node.usage)
            .fold(TokenUsage::default(), |total, usage| TokenUsage {
                input_tokens: total.input_tokens.saturating_add(usage.input_tokens),
                output_tokens: total.output_tokens.saturating_add(usage.output_tokens),
            })
    }
}
