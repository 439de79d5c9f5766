use std::sync::Arc;

use hotel_revenue_crew::llm::{
    Invocation, OpenAiCompatibleClient, ProviderConfig, ResilientInvoker, TierRegistry,
};
use hotel_revenue_crew::observability::{EventKind, RecordingObserver};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::crew_harness::{fast_policy, tier};

fn provider() -> ProviderConfig {
    ProviderConfig::new("gateway").with_tier(tier(1), ["primary", "fallback"])
}

fn completion(text: &str) -> serde_json::Value {
    json!({
        "model": "primary",
        "choices": [{"message": {"role": "assistant", "content": text}}],
        "usage": {"prompt_tokens": 12, "completion_tokens": 34}
    })
}

fn invoker(server: &MockServer, events: Arc<RecordingObserver>) -> ResilientInvoker {
    let _ = rustls::crypto::ring::default_provider().install_default();
    let client = OpenAiCompatibleClient::new(&format!("{}/v1", server.uri()), Some("test-key"), 5);
    ResilientInvoker::new(Arc::new(client), Arc::new(TierRegistry::empty()))
        .with_policy(fast_policy())
        .with_observer(events)
}

#[tokio::test]
async fn completion_is_returned_with_usage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "primary",
            "messages": [
                {"role": "system", "content": "You are the Pricing Strategist."},
                {"role": "user", "content": "Price the suites"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("  Raise suite rates 8%.  ")))
        .expect(1)
        .mount(&server)
        .await;

    let events = Arc::new(RecordingObserver::new());
    let invocation = Invocation::new("pricing_strategy", tier(1), "Price the suites")
        .with_system_prompt(Some("You are the Pricing Strategist."));
    let success = invoker(&server, events.clone())
        .invoke(invocation, &provider())
        .await
        .unwrap();

    assert_eq!(success.text, "Raise suite rates 8%.");
    assert_eq!(success.model, "primary");
    assert_eq!(success.total_attempts, 1);
    let usage = success.usage.unwrap();
    assert_eq!(usage.input_tokens, 12);
    assert_eq!(usage.output_tokens, 34);
    assert_eq!(events.count(EventKind::InvocationEnd), 1);
}

#[tokio::test]
async fn throttled_reply_is_retried_on_the_same_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "0")
                .set_body_json(json!({
                    "error": {"message": "Rate exceeded", "code": "ThrottlingException"}
                })),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Forecast ready.")))
        .mount(&server)
        .await;

    let events = Arc::new(RecordingObserver::new());
    let success = invoker(&server, events.clone())
        .invoke(
            Invocation::new("demand_forecast", tier(1), "Forecast demand"),
            &provider(),
        )
        .await
        .unwrap();

    assert_eq!(success.text, "Forecast ready.");
    assert_eq!(success.model, "primary");
    assert_eq!(success.total_attempts, 2);
    assert_eq!(success.fallbacks, 0);
    assert_eq!(events.count(EventKind::RateLimit), 1);
}

#[tokio::test]
async fn rejected_model_falls_back_to_the_next() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"model": "primary"})))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "model not enabled", "code": "ValidationException"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"model": "fallback"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Plan drafted.")))
        .expect(1)
        .mount(&server)
        .await;

    let events = Arc::new(RecordingObserver::new());
    let success = invoker(&server, events.clone())
        .invoke(
            Invocation::new("revenue_management", tier(1), "Write the plan"),
            &provider(),
        )
        .await
        .unwrap();

    assert_eq!(success.model, "fallback");
    assert_eq!(success.fallbacks, 1);
    assert_eq!(events.count(EventKind::RateLimit), 0);
    assert_eq!(events.count(EventKind::ModelFallback), 1);
}
