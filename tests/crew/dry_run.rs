use std::collections::BTreeMap;

use chrono::NaiveDate;
use hotel_revenue_crew::crew::{self, InputFormat, build_crew_graph, prepare_input};
use hotel_revenue_crew::error::{NodeError, NodeErrorKind};
use hotel_revenue_crew::observability::EventKind;
use hotel_revenue_crew::report::{RunStatus, write_outputs};
use serde_json::{Value, json};

use crate::crew_harness::{Behavior, ScriptedModels, harness, test_provider};

fn prepared() -> hotel_revenue_crew::prompt::CallerInput {
    let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
    let prepared = prepare_input(
        &json!({
            "hotel_name": "Harbor View Inn",
            "hotel_location": "Boston, MA",
            "current_adr": "$229"
        }),
        today,
    )
    .unwrap();
    assert_eq!(prepared.format, InputFormat::Structured);
    prepared.input
}

#[tokio::test]
async fn crew_run_produces_the_revenue_plan() {
    let h = harness(ScriptedModels::new(), test_provider());
    let graph = build_crew_graph(&BTreeMap::new()).unwrap();
    let result = h.executor.run(&graph, &prepared()).await.unwrap();

    assert_eq!(result.status, RunStatus::Success);
    assert_eq!(result.final_node, crew::FINAL_NODE);
    assert_eq!(
        result.document,
        "# Revenue Optimization Plan\n\n\
         Write the revenue optimization plan for Harbor View Inn in Boston, MA. via beta\n"
    );
    assert_eq!(
        result.metadata.completed,
        vec![
            "market_analysis",
            "demand_forecast",
            "pricing_strategy",
            "revenue_management"
        ]
    );
    // The pricing strategist runs on tier1.
    assert_eq!(result.node("pricing_strategy").unwrap().model.as_deref(), Some("alpha"));
    assert_eq!(h.models.calls().len(), 4);
    assert_eq!(h.events.count(EventKind::NodeEnd), 4);
}

#[tokio::test]
async fn pricing_failure_keeps_the_analyses() {
    let models =
        ScriptedModels::new().prompt_containing("Design a pricing strategy", Behavior::Fail);
    let h = harness(models, test_provider());
    let graph = build_crew_graph(&BTreeMap::new()).unwrap();
    let result = h.executor.run(&graph, &prepared()).await.unwrap();

    assert_eq!(result.status, RunStatus::PartialSuccess);
    assert_eq!(result.metadata.completed, vec!["market_analysis", "demand_forecast"]);
    assert_eq!(
        result.node("pricing_strategy").unwrap().error_kind(),
        Some(NodeErrorKind::ModelInvocation)
    );
    assert_eq!(
        result.node("revenue_management").unwrap().error,
        Some(NodeError::DependencyFailed {
            dependencies: vec!["pricing_strategy".into()]
        })
    );
    assert_eq!(h.models.calls_for("Write the revenue optimization plan"), 0);

    assert!(result.document.starts_with("# Revenue Optimization Plan (incomplete)"));
    assert!(result.document.contains("### market_analysis\n\nAnalyze the market position of Harbor View Inn"));
    assert!(result.document.contains("- **pricing_strategy** (pricing_strategist): model invocation exhausted retries"));
}

#[tokio::test]
async fn outputs_are_written_to_disk() {
    let models =
        ScriptedModels::new().prompt_containing("Design a pricing strategy", Behavior::Fail);
    let h = harness(models, test_provider());
    let graph = build_crew_graph(&BTreeMap::new()).unwrap();
    let result = h.executor.run(&graph, &prepared()).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("reports");
    let written = write_outputs(&result, &out).await.unwrap();

    assert_eq!(written.document, out.join("revenue_optimization_plan.md"));
    assert_eq!(
        std::fs::read_to_string(&written.document).unwrap(),
        result.document
    );

    let json: Value =
        serde_json::from_str(&std::fs::read_to_string(&written.result).unwrap()).unwrap();
    assert_eq!(json["status"], "partial_success");
    assert_eq!(json["metadata"]["run_id"], result.metadata.run_id.as_str());
    assert_eq!(json["nodes"][3]["name"], "revenue_management");
    assert_eq!(json["nodes"][3]["error"]["kind"], "dependency_failed");
}

#[test]
fn natural_language_request_feeds_the_crew() {
    let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
    let prepared = prepare_input(
        &json!("Optimize revenue for Seaside Resort in Miami, FL with 75% occupancy and $250 ADR"),
        today,
    )
    .unwrap();
    assert_eq!(prepared.format, InputFormat::NaturalLanguage);

    let graph = build_crew_graph(&BTreeMap::new()).unwrap();
    let node = graph.node("pricing_strategy").unwrap();
    let mut upstream = BTreeMap::new();
    upstream.insert("market_analysis".to_string(), "Market notes".to_string());
    upstream.insert("demand_forecast".to_string(), "Demand notes".to_string());
    let prompt = node
        .render_prompt(graph.engine(), &prepared.input, &upstream)
        .unwrap();

    assert!(prompt.starts_with("Design a pricing strategy for Seaside Resort (Miami, FL)"));
    assert!(prompt.contains("Market notes"));
    assert!(prompt.contains("Demand notes"));
}
