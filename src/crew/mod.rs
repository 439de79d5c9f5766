//! The hotel revenue crew: four agents wired into a diamond-shaped task graph.
//!
//! ```text
//! market_analysis ──┐
//!                   ├──> pricing_strategy ──> revenue_management
//! demand_forecast ──┘                                 ^
//!  (both analyses also feed revenue_management) ──────┘
//! ```

pub mod agents;
pub mod input;
pub mod prompts;

pub use agents::{AgentProfile, CREW};
pub use input::{InputFormat, PreparedInput, guidance, prepare_input};

use crate::config::AgentConfig;
use crate::error::ConfigError;
use crate::planner::{TaskGraph, TaskNode};
use std::collections::BTreeMap;

pub const TITLE: &str = "Revenue Optimization Plan";
pub const FINAL_NODE: &str = "revenue_management";

struct CrewTask {
    name: &'static str,
    agent: &'static AgentProfile,
    template: &'static str,
    depends_on: &'static [&'static str],
}

static TASKS: [CrewTask; 4] = [
    CrewTask {
        name: "market_analysis",
        agent: &agents::MARKET_ANALYST,
        template: prompts::MARKET_ANALYSIS,
        depends_on: &[],
    },
    CrewTask {
        name: "demand_forecast",
        agent: &agents::DEMAND_FORECASTER,
        template: prompts::DEMAND_FORECAST,
        depends_on: &[],
    },
    CrewTask {
        name: "pricing_strategy",
        agent: &agents::PRICING_STRATEGIST,
        template: prompts::PRICING_STRATEGY,
        depends_on: &["market_analysis", "demand_forecast"],
    },
    CrewTask {
        name: FINAL_NODE,
        agent: &agents::REVENUE_MANAGER,
        template: prompts::REVENUE_MANAGEMENT,
        depends_on: &["market_analysis", "demand_forecast", "pricing_strategy"],
    },
];

/// Build the crew's task graph, applying per-agent tier and model overrides.
///
/// `overrides` is keyed by agent key (`market_analyst`, ...). The topology
/// never changes; overrides only move a node to another tier or pin a model.
pub fn build_crew_graph(
    overrides: &BTreeMap<String, AgentConfig>,
) -> Result<TaskGraph, ConfigError> {
    let nodes = TASKS
        .iter()
        .map(|task| {
            let agent = task.agent;
            let custom = overrides.get(agent.key);
            let tier = custom
                .and_then(|config| config.tier)
                .unwrap_or_else(|| agent.tier());
            let pinned = custom.and_then(|config| config.model.clone());

            if tier != agent.tier() || pinned.is_some() {
                tracing::debug!(
                    agent = agent.key,
                    %tier,
                    model = pinned.as_deref().unwrap_or("-"),
                    "Applying agent override"
                );
            }

            TaskNode::new(task.name, tier, task.template)
                .with_agent(agent.key)
                .depends_on(task.depends_on.iter().copied())
                .with_system_prompt(agent.system_prompt())
                .with_pinned_model(pinned)
        })
        .collect();

    TaskGraph::new(TITLE, nodes)?.with_final_node(FINAL_NODE)
}
