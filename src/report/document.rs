use super::types::NodeReport;
use std::fmt::Write as _;

/// Render the human-readable report for a run.
///
/// A succeeded final node is the report. Otherwise the document lists the
/// missing sections with their reasons and keeps every section that did
/// complete.
pub fn compose(title: &str, final_node: &str, nodes: &[NodeReport]) -> String {
    if let Some(output) = nodes
        .iter()
        .find(|node| node.name == final_node && node.succeeded())
        .and_then(|node| node.output.as_deref())
    {
        return format!("# {title}\n\n{}\n", output.trim());
    }

    degraded(title, final_node, nodes)
}

fn degraded(title: &str, final_node: &str, nodes: &[NodeReport]) -> String {
    let mut doc = format!("# {title} (incomplete)\n\n");
    let _ = writeln!(
        doc,
        "The final section `{final_node}` could not be produced. \
         The sections below are what the run completed.\n"
    );

    doc.push_str("## Missing sections\n\n");
    for node in nodes.iter().filter(|node| !node.succeeded()) {
        let reason = node.explanation.as_deref().unwrap_or("did not complete");
        let _ = writeln!(doc, "- **{}** ({}): {reason}", node.name, node.agent);
    }

    let available = nodes
        .iter()
        .filter(|node| node.succeeded())
        .filter_map(|node| node.output.as_deref().map(|output| (node, output)))
        .collect::<Vec<_>>();
    if available.is_empty() {
        doc.push_str("\nNo sections completed.\n");
        return doc;
    }

    doc.push_str("\n## Available sections\n");
    for (node, output) in available {
        let _ = write!(doc, "\n### {}\n\n{}\n", node.name, output.trim());
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::tiers::ModelTier;
    use crate::planner::NodeState;

    fn node(name: &str, output: Option<&str>, explanation: Option<&str>) -> NodeReport {
        NodeReport {
            name: name.to_string(),
            agent: format!("{name}_agent"),
            tier: ModelTier::HIGHEST,
            state: if output.is_some() {
                NodeState::Succeeded
            } else {
                NodeState::Failed
            },
            output: output.map(str::to_string),
            error: None,
            explanation: explanation.map(str::to_string),
            model: None,
            attempts: 0,
            fallbacks: 0,
            usage: None,
            started_at: None,
            duration_ms: 0,
        }
    }

    #[test]
    fn composite_is_final_output() {
        let nodes = [node("a", Some("ignored"), None), node("z", Some("  body \n"), None)];
        assert_eq!(compose("Plan", "z", &nodes), "# Plan\n\nbody\n");
    }

    #[test]
    fn degraded_summary_lists_missing_and_keeps_available() {
        let nodes = [
            node("market", Some("market findings"), None),
            node("pricing", None, Some("model invocation exhausted retries")),
            node("revenue", None, Some("skipped because upstream dependency failed: pricing")),
        ];
        let doc = compose("Plan", "revenue", &nodes);

        assert!(doc.starts_with("# Plan (incomplete)\n"));
        assert!(doc.contains("- **pricing** (pricing_agent): model invocation exhausted retries"));
        assert!(doc.contains(
            "- **revenue** (revenue_agent): skipped because upstream dependency failed: pricing"
        ));
        assert!(doc.contains("### market\n\nmarket findings\n"));
        assert!(!doc.contains("### pricing"));
    }

    #[test]
    fn degraded_summary_with_nothing_completed() {
        let nodes = [node("only", None, Some("cancelled before the node completed"))];
        let doc = compose("Plan", "only", &nodes);
        assert!(doc.ends_with("No sections completed.\n"));
    }
}
