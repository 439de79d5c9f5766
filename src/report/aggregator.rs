use super::document;
use super::types::{ExecutionResult, NodeReport, RunMetadata, RunStatus};
use crate::error::NodeError;

/// `success` when every node succeeded, `failure` when none did.
pub fn overall_status(nodes: &[NodeReport]) -> RunStatus {
    let succeeded = nodes.iter().filter(|node| node.succeeded()).count();
    if succeeded == nodes.len() && !nodes.is_empty() {
        RunStatus::Success
    } else if succeeded == 0 {
        RunStatus::Failure
    } else {
        RunStatus::PartialSuccess
    }
}

/// Operator-facing reason for a node failure. A model that gave up and a
/// node that never ran read differently.
pub fn explain(error: &NodeError) -> String {
    match error {
        NodeError::Template { message } => {
            format!("prompt could not be rendered: {message}")
        }
        NodeError::ModelInvocation {
            code,
            message,
            tier,
            model,
            attempts,
        } => format!(
            "model invocation exhausted retries: {attempts} attempt(s) on the {tier} fallback chain, \
             last model {model} failed with {code}: {message}"
        ),
        NodeError::DependencyFailed { dependencies } => format!(
            "skipped because upstream dependency failed: {}",
            dependencies.join(", ")
        ),
        NodeError::Cancelled => "cancelled before the node completed".to_string(),
    }
}

/// Fold terminal node records into the run result.
pub fn assemble(
    title: &str,
    final_node: &str,
    mut nodes: Vec<NodeReport>,
    mut metadata: RunMetadata,
) -> ExecutionResult {
    for node in &mut nodes {
        node.explanation = node.error.as_ref().map(explain);
    }

    let (completed, failed): (Vec<&NodeReport>, Vec<&NodeReport>) =
        nodes.iter().partition(|node| node.succeeded());
    metadata.completed = completed.iter().map(|node| node.name.clone()).collect();
    metadata.failed = failed.iter().map(|node| node.name.clone()).collect();

    let status = overall_status(&nodes);
    let document = document::compose(title, final_node, &nodes);

    ExecutionResult {
        status,
        title: title.to_string(),
        final_node: final_node.to_string(),
        nodes,
        document,
        metadata,
    }
}
