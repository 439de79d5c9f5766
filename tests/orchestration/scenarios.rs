use std::collections::BTreeMap;
use std::time::Duration;

use hotel_revenue_crew::error::{ConfigError, NodeError, NodeErrorKind};
use hotel_revenue_crew::observability::{EventKind, ObserverEvent};
use hotel_revenue_crew::planner::{NodeState, TaskGraph, TaskNode};
use hotel_revenue_crew::prompt::{CallerInput, PromptEngine};
use hotel_revenue_crew::report::RunStatus;
use tokio_util::sync::CancellationToken;

use crate::crew_harness::{Behavior, ScriptedModels, harness, test_provider, tier};

fn input() -> CallerInput {
    CallerInput::new().with("hotel", "Seaside Resort")
}

/// A, B independent; C after A and B; D after C.
fn chain_graph() -> TaskGraph {
    TaskGraph::new(
        "Chain",
        vec![
            TaskNode::new("a", tier(2), "a: market for {{ hotel }}"),
            TaskNode::new("b", tier(2), "b: demand for {{ hotel }}"),
            TaskNode::new("c", tier(1), "c: pricing\n{{ upstream.a }}\n{{ upstream.b }}")
                .depends_on(["a", "b"]),
            TaskNode::new("d", tier(2), "d: plan\n{{ context }}").depends_on(["c"]),
        ],
    )
    .unwrap()
}

/// Two analyses feed a strategy; the synthesis reads all three.
fn diamond_graph() -> TaskGraph {
    TaskGraph::new(
        "Diamond",
        vec![
            TaskNode::new("market", tier(2), "market: {{ hotel }}"),
            TaskNode::new("demand", tier(2), "demand: {{ hotel }}"),
            TaskNode::new("strategy", tier(1), "strategy\n{{ context }}")
                .depends_on(["market", "demand"]),
            TaskNode::new("synthesis", tier(2), "synthesis\n{{ context }}")
                .depends_on(["market", "demand", "strategy"]),
        ],
    )
    .unwrap()
}

#[tokio::test]
async fn diamond_all_succeed_is_success() {
    let h = harness(ScriptedModels::new(), test_provider());
    let result = h.executor.run(&diamond_graph(), &input()).await.unwrap();

    assert_eq!(result.status, RunStatus::Success);
    assert_eq!(result.final_node, "synthesis");
    assert_eq!(
        result.document,
        "# Diamond\n\nsynthesis via beta\n"
    );
    assert!(result.nodes.iter().all(|node| node.state == NodeState::Succeeded));
    assert_eq!(result.metadata.completed.len(), 4);
    assert!(result.metadata.failed.is_empty());
    assert_eq!(result.total_usage().total(), 4 * 30);
}

#[tokio::test]
async fn failed_analysis_skips_dependents_without_calling_them() {
    let models = ScriptedModels::new().prompt_containing("b: demand", Behavior::Fail);
    let h = harness(models, test_provider());
    let result = h.executor.run(&chain_graph(), &input()).await.unwrap();

    assert_eq!(result.status, RunStatus::PartialSuccess);
    assert_eq!(result.output("a"), Some("a: market for Seaside Resort via beta"));

    let b = result.node("b").unwrap();
    assert_eq!(b.error_kind(), Some(NodeErrorKind::ModelInvocation));
    assert!(
        b.explanation
            .as_deref()
            .unwrap()
            .starts_with("model invocation exhausted retries")
    );

    for name in ["c", "d"] {
        let node = result.node(name).unwrap();
        assert_eq!(node.state, NodeState::Failed);
        assert_eq!(node.error_kind(), Some(NodeErrorKind::DependencyFailed));
        assert_eq!(node.attempts, 0);
    }
    assert_eq!(
        result.node("c").unwrap().error,
        Some(NodeError::DependencyFailed {
            dependencies: vec!["b".into()]
        })
    );
    assert_eq!(
        result.node("d").unwrap().explanation.as_deref(),
        Some("skipped because upstream dependency failed: c")
    );

    assert_eq!(h.models.calls_for("c:"), 0);
    assert_eq!(h.models.calls_for("d:"), 0);
    assert!(h.events.for_node("c", EventKind::NodeStart).is_empty());
    assert_eq!(h.events.for_node("d", EventKind::NodeEnd).len(), 1);

    assert!(result.document.starts_with("# Chain (incomplete)"));
    assert!(result.document.contains("### a\n\na: market for Seaside Resort via beta"));
}

#[tokio::test]
async fn every_node_failing_is_failure() {
    let models = ScriptedModels::new()
        .model("alpha", Behavior::Fail)
        .model("alpha-backup", Behavior::Fail)
        .model("beta", Behavior::Fail);
    let h = harness(models, test_provider());
    let result = h.executor.run(&diamond_graph(), &input()).await.unwrap();

    assert_eq!(result.status, RunStatus::Failure);
    assert!(result.metadata.completed.is_empty());
    assert_eq!(result.metadata.failed.len(), 4);
    assert!(result.document.contains("No sections completed."));
    assert_eq!(
        result.node("strategy").unwrap().error_kind(),
        Some(NodeErrorKind::DependencyFailed)
    );
}

#[tokio::test]
async fn dependents_start_only_after_dependencies_finish() {
    let h = harness(ScriptedModels::new(), test_provider());
    h.executor.run(&chain_graph(), &input()).await.unwrap();

    let events = h.events.events();
    let position = |node: &str, kind: EventKind| {
        events
            .iter()
            .position(|event| event.kind() == kind && event.node() == Some(node))
            .unwrap()
    };

    for (node, dependencies) in [("c", &["a", "b"][..]), ("d", &["c"][..])] {
        let started = position(node, EventKind::NodeStart);
        for dependency in dependencies {
            assert!(
                position(*dependency, EventKind::NodeEnd) < started,
                "{node} started before {dependency} finished"
            );
        }
    }
    // d's deepest dependency chain is a/b -> c -> d.
    assert!(position("a", EventKind::NodeEnd) < position("d", EventKind::NodeStart));
}

#[tokio::test]
async fn upstream_outputs_reach_downstream_prompts() {
    // Only d's prompt carries c's output, so only d trips this rule.
    let models = ScriptedModels::new().prompt_containing("c: pricing via alpha", Behavior::Fail);
    let h = harness(models, test_provider());
    let result = h.executor.run(&chain_graph(), &input()).await.unwrap();

    assert_eq!(result.status, RunStatus::PartialSuccess);
    assert_eq!(result.output("c"), Some("c: pricing via alpha"));
    assert_eq!(
        result.node("d").unwrap().error_kind(),
        Some(NodeErrorKind::ModelInvocation)
    );
    assert_eq!(h.models.calls_for("c: pricing"), 1);
    assert_eq!(h.models.calls_for("d: plan"), 1);
}

#[test]
fn cyclic_graph_is_rejected_before_execution() {
    let err = TaskGraph::new(
        "Cycle",
        vec![
            TaskNode::new("a", tier(1), "a").depends_on(["b"]),
            TaskNode::new("b", tier(1), "b").depends_on(["a"]),
        ],
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Cycle(_)));
}

#[tokio::test]
async fn unresolvable_tier_fails_before_any_call() {
    let graph = TaskGraph::new(
        "Tiers",
        vec![
            TaskNode::new("a", tier(2), "a"),
            TaskNode::new("b", tier(4), "b").depends_on(["a"]),
        ],
    )
    .unwrap();
    let h = harness(ScriptedModels::new(), test_provider());
    let err = h.executor.run(&graph, &input()).await.unwrap_err();

    assert!(matches!(err, ConfigError::TierNotResolvable { .. }));
    assert_eq!(err.to_string(), "tier4 is not defined for provider test");
    assert!(h.models.calls().is_empty());
    assert!(h.events.events().is_empty());
}

#[tokio::test]
async fn missing_placeholder_fails_only_that_branch() {
    let graph = TaskGraph::new(
        "Templates",
        vec![
            TaskNode::new("a", tier(2), "a: {{ hotel }}"),
            TaskNode::new("b", tier(2), "b: {{ budget }}"),
            TaskNode::new("c", tier(2), "c\n{{ context }}").depends_on(["b"]),
        ],
    )
    .unwrap();
    let h = harness(ScriptedModels::new(), test_provider());
    let result = h.executor.run(&graph, &input()).await.unwrap();

    assert_eq!(result.status, RunStatus::PartialSuccess);
    assert_eq!(result.node("b").unwrap().error_kind(), Some(NodeErrorKind::Template));
    assert_eq!(
        result.node("c").unwrap().error_kind(),
        Some(NodeErrorKind::DependencyFailed)
    );
    assert_eq!(h.models.calls_for("b:"), 0);
}

#[test]
fn rendering_is_deterministic() {
    let node = TaskNode::new(
        "c",
        tier(1),
        "Pricing for {{ hotel }}\n{{ upstream.a }}\n{{ context }}",
    )
    .depends_on(["a", "b"]);
    let engine = PromptEngine::new();
    let mut upstream = BTreeMap::new();
    upstream.insert("a".to_string(), "market notes".to_string());
    upstream.insert("b".to_string(), "demand notes".to_string());

    let first = node.render_prompt(&engine, &input(), &upstream).unwrap();
    let second = node.render_prompt(&engine, &input(), &upstream).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first,
        "Pricing for Seaside Resort\nmarket notes\n## a\n\nmarket notes\n\n## b\n\ndemand notes"
    );
}

#[tokio::test]
async fn cancellation_reports_unfinished_nodes_as_cancelled() {
    let models = ScriptedModels::new().prompt_containing("b: demand", Behavior::Hang);
    let h = harness(models, test_provider());
    let graph = chain_graph();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        h.executor.run_with_cancel(&graph, &input(), cancel),
    )
    .await
    .expect("cancelled run must return")
    .unwrap();

    assert!(result.metadata.cancelled);
    assert_eq!(result.status, RunStatus::PartialSuccess);
    assert!(result.node("a").unwrap().succeeded());
    for name in ["b", "c", "d"] {
        assert_eq!(
            result.node(name).unwrap().error,
            Some(NodeError::Cancelled),
            "{name}"
        );
    }
    let cancelled_end = h
        .events
        .events()
        .into_iter()
        .filter(|event| matches!(event, ObserverEvent::NodeEnd { status, .. } if status == "failed"))
        .count();
    assert_eq!(cancelled_end, 3);
}
