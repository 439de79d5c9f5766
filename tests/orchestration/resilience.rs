use hotel_revenue_crew::error::{NodeError, NodeErrorKind};
use hotel_revenue_crew::llm::{ProviderConfig, TierRegistry};
use hotel_revenue_crew::observability::{EventKind, ObserverEvent};
use hotel_revenue_crew::planner::{TaskGraph, TaskNode};
use hotel_revenue_crew::prompt::CallerInput;
use hotel_revenue_crew::report::RunStatus;

use crate::crew_harness::{Behavior, ScriptedModels, harness_with, test_provider, tier};

/// One tier with a primary and a same-tier fallback and nothing below it.
fn two_model_provider() -> ProviderConfig {
    ProviderConfig::new("resilience").with_tier(tier(1), ["primary", "fallback"])
}

fn single_node_graph() -> TaskGraph {
    TaskGraph::new(
        "Pricing",
        vec![TaskNode::new("pricing", tier(1), "pricing for {{ hotel }}")],
    )
    .unwrap()
}

fn input() -> CallerInput {
    CallerInput::new().with("hotel", "Harbor View Inn")
}

#[tokio::test]
async fn persistent_throttling_falls_back_to_next_model() {
    let models = ScriptedModels::new().model("primary", Behavior::RateLimited);
    let h = harness_with(models, TierRegistry::empty(), two_model_provider());
    let result = h.executor.run(&single_node_graph(), &input()).await.unwrap();

    assert_eq!(result.status, RunStatus::Success);
    assert_eq!(result.output("pricing"), Some("pricing for Harbor View Inn via fallback"));

    let node = result.node("pricing").unwrap();
    assert_eq!(node.model.as_deref(), Some("fallback"));
    assert_eq!(node.fallbacks, 1);
    assert_eq!(node.attempts, 4);

    assert_eq!(h.models.calls_to("primary"), 3);
    assert_eq!(h.models.calls_to("fallback"), 1);
    assert_eq!(h.events.count(EventKind::RateLimit), 2);

    let fallbacks = h.events.for_node("pricing", EventKind::ModelFallback);
    assert_eq!(fallbacks.len(), 1);
    let ObserverEvent::ModelFallback {
        from_model,
        to_model,
        attempts,
        ..
    } = &fallbacks[0]
    else {
        panic!("expected a fallback event");
    };
    assert_eq!(from_model, "primary");
    assert_eq!(to_model, "fallback");
    assert_eq!(*attempts, 3);
}

#[tokio::test]
async fn permanent_error_moves_on_without_retrying() {
    let models = ScriptedModels::new().model("primary", Behavior::Fail);
    let h = harness_with(models, TierRegistry::empty(), two_model_provider());
    let result = h.executor.run(&single_node_graph(), &input()).await.unwrap();

    assert_eq!(result.status, RunStatus::Success);
    assert_eq!(h.models.calls_to("primary"), 1);
    assert_eq!(h.events.count(EventKind::RateLimit), 0);
    assert_eq!(h.events.count(EventKind::ModelFallback), 1);
    assert_eq!(result.node("pricing").unwrap().attempts, 2);
}

#[tokio::test]
async fn exhausted_chain_fails_the_node_with_the_last_error() {
    let models = ScriptedModels::new()
        .model("primary", Behavior::RateLimited)
        .model("fallback", Behavior::RateLimited);
    let h = harness_with(models, TierRegistry::empty(), two_model_provider());
    let result = h.executor.run(&single_node_graph(), &input()).await.unwrap();

    assert_eq!(result.status, RunStatus::Failure);
    let node = result.node("pricing").unwrap();
    assert_eq!(node.error_kind(), Some(NodeErrorKind::ModelInvocation));
    let Some(NodeError::ModelInvocation {
        code,
        model,
        attempts,
        ..
    }) = &node.error
    else {
        panic!("expected a model invocation error");
    };
    assert_eq!(code, "ThrottlingException");
    assert_eq!(model, "fallback");
    assert_eq!(*attempts, 6);
    assert_eq!(h.events.count(EventKind::RateLimit), 4);
    assert!(result.document.contains("No sections completed."));
}

#[tokio::test]
async fn cross_tier_fallback_reaches_the_next_tier_primary() {
    let models = ScriptedModels::new()
        .model("alpha", Behavior::Fail)
        .model("alpha-backup", Behavior::Fail);
    let h = harness_with(models, TierRegistry::empty(), test_provider());
    let result = h.executor.run(&single_node_graph(), &input()).await.unwrap();

    let node = result.node("pricing").unwrap();
    assert!(node.succeeded());
    assert_eq!(node.model.as_deref(), Some("beta"));
    assert_eq!(node.fallbacks, 2);
    assert_eq!(h.events.count(EventKind::ModelFallback), 2);
}

#[tokio::test]
async fn failed_node_reports_every_fallback_taken() {
    let models = ScriptedModels::new()
        .model("alpha", Behavior::Fail)
        .model("alpha-backup", Behavior::Fail)
        .model("beta", Behavior::Fail);
    let h = harness_with(models, TierRegistry::empty(), test_provider());
    let result = h.executor.run(&single_node_graph(), &input()).await.unwrap();

    assert_eq!(result.status, RunStatus::Failure);
    let node = result.node("pricing").unwrap();
    assert!(!node.succeeded());
    assert_eq!(node.model.as_deref(), Some("beta"));
    assert_eq!(node.attempts, 3);
    assert_eq!(node.fallbacks, 2);
    assert_eq!(h.events.count(EventKind::ModelFallback), 2);

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["nodes"][0]["fallbacks"], 2);
}

#[tokio::test]
async fn disabling_cross_tier_fallback_keeps_the_chain_in_tier() {
    let models = ScriptedModels::new()
        .model("alpha", Behavior::Fail)
        .model("alpha-backup", Behavior::Fail);
    let registry = TierRegistry::empty().with_cross_tier_depth(0);
    let h = harness_with(models, registry, test_provider());
    let result = h.executor.run(&single_node_graph(), &input()).await.unwrap();

    assert_eq!(result.status, RunStatus::Failure);
    assert_eq!(h.models.calls_to("beta"), 0);
}

#[tokio::test]
async fn pinned_model_is_tried_first() {
    let graph = TaskGraph::new(
        "Pinned",
        vec![
            TaskNode::new("pricing", tier(1), "pricing for {{ hotel }}")
                .with_pinned_model(Some("fallback".into())),
        ],
    )
    .unwrap();
    let h = harness_with(ScriptedModels::new(), TierRegistry::empty(), two_model_provider());
    let result = h.executor.run(&graph, &input()).await.unwrap();

    assert_eq!(result.node("pricing").unwrap().model.as_deref(), Some("fallback"));
    assert_eq!(h.models.calls_to("primary"), 0);
}
