//! Plain-text views printed by the CLI.

use crate::error::{ConfigError, InputRejection};
use crate::llm::tiers::{ProviderConfig, TierRegistry};
use crate::observability::{EventKind, RecordingObserver};
use crate::planner::TaskGraph;
use crate::report::ExecutionResult;

/// Execution layers and each node's resolved model chain.
pub fn render_plan(
    graph: &TaskGraph,
    registry: &TierRegistry,
    provider: &ProviderConfig,
) -> Result<String, ConfigError> {
    let mut lines = vec![
        format!("◆ {}", graph.title()),
        format!("  provider     {}", provider.name),
        format!("  final node   {}", graph.final_node()),
        String::new(),
    ];

    for (depth, layer) in graph.layers().iter().enumerate() {
        lines.push(format!("Layer {}", depth + 1));
        for name in layer {
            let Some(node) = graph.node(name) else {
                continue;
            };
            let chain =
                registry.resolve_pinned(node.tier, node.pinned_model.as_deref(), provider)?;
            let deps = if node.depends_on.is_empty() {
                String::new()
            } else {
                format!(" after {}", node.depends_on.join(", "))
            };
            lines.push(format!(
                "  {name} ({}, {}){deps}",
                node.agent, node.tier
            ));
            lines.push(format!("    models: {}", chain.join(" -> ")));
        }
    }

    Ok(lines.join("\n"))
}

/// Tier table of `provider` with the chain each tier resolves to.
pub fn render_tiers(registry: &TierRegistry, provider: &ProviderConfig) -> String {
    let mut lines = vec![format!(
        "◆ Provider {} (cross-tier depth {})",
        provider.name,
        registry.cross_tier_depth()
    )];
    for (tier, models) in &provider.tiers {
        let chain = registry
            .resolve(*tier, provider)
            .map_or_else(|e| format!("unresolvable: {e}"), |chain| chain.join(" -> "));
        lines.push(format!("  {tier}  {}", models.join(", ")));
        lines.push(format!("         chain: {chain}"));
    }
    lines.join("\n")
}

/// One-screen run summary, printed to stderr after the plan.
pub fn render_summary(result: &ExecutionResult, recorder: &RecordingObserver) -> String {
    let total = result.nodes.len();
    let usage = result.total_usage();
    let mut lines = vec![
        format!(
            "Status: {} ({}/{total} nodes completed in {:.1}s)",
            result.status,
            result.metadata.completed.len(),
            result.metadata.duration_ms as f64 / 1000.0
        ),
        format!(
            "Run {} on {}: {} fallback(s), {} rate limit(s), {} tokens",
            result.metadata.run_id,
            result.metadata.provider,
            recorder.count(EventKind::ModelFallback),
            recorder.count(EventKind::RateLimit),
            usage.total()
        ),
    ];
    if result.metadata.cancelled {
        lines.push("Run was cancelled before all nodes finished.".into());
    }
    for node in result.nodes.iter().filter(|node| !node.succeeded()) {
        lines.push(format!(
            "  ✗ {}: {}",
            node.name,
            node.explanation.as_deref().unwrap_or("failed")
        ));
    }
    lines.join("\n")
}

/// Why a request was turned away and how to phrase a better one.
pub fn render_rejection(rejection: &InputRejection) -> String {
    let mut lines = vec![format!("Request rejected: {rejection}")];
    let tips = crate::crew::guidance(rejection);
    if !tips.is_empty() {
        lines.push(String::new());
        lines.extend(tips.iter().map(|tip| format!("  - {tip}")));
    }
    lines.join("\n")
}
