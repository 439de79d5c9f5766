#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hotel_revenue_crew::error::ModelCallError;
use hotel_revenue_crew::llm::{
    BackoffPolicy, ModelClient, ModelFuture, ModelRequest, ModelResponse, ModelTier,
    ProviderConfig, ResilientInvoker, TierRegistry, TokenUsage,
};
use hotel_revenue_crew::observability::RecordingObserver;
use hotel_revenue_crew::planner::GraphExecutor;

/// What a scripted model does when called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    RateLimited,
    Fail,
    Hang,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub model: String,
    pub first_line: String,
}

/// In-process model service. Prompt rules (matched against the system and
/// user prompt) win over per-model rules; anything unmatched succeeds.
#[derive(Default)]
pub struct ScriptedModels {
    by_prompt: Vec<(String, Behavior)>,
    by_model: HashMap<String, Behavior>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedModels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: &str, behavior: Behavior) -> Self {
        self.by_model.insert(model.to_string(), behavior);
        self
    }

    pub fn prompt_containing(mut self, needle: &str, behavior: Behavior) -> Self {
        self.by_prompt.push((needle.to_string(), behavior));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, model: &str) -> usize {
        self.calls().iter().filter(|call| call.model == model).count()
    }

    /// Calls whose prompt starts with `first_line`.
    pub fn calls_for(&self, first_line: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.first_line.starts_with(first_line))
            .count()
    }

    fn behavior(&self, request: &ModelRequest<'_>) -> Behavior {
        let system = request.system_prompt.unwrap_or_default();
        self.by_prompt
            .iter()
            .find(|(needle, _)| request.prompt.contains(needle) || system.contains(needle))
            .map(|(_, behavior)| *behavior)
            .or_else(|| self.by_model.get(request.model).copied())
            .unwrap_or(Behavior::Succeed)
    }
}

impl ModelClient for ScriptedModels {
    fn name(&self) -> &str {
        "scripted"
    }

    fn complete<'a>(&'a self, request: ModelRequest<'a>) -> ModelFuture<'a> {
        Box::pin(async move {
            let first_line = request.prompt.lines().next().unwrap_or_default().to_string();
            self.calls.lock().unwrap().push(Call {
                model: request.model.to_string(),
                first_line: first_line.clone(),
            });

            match self.behavior(&request) {
                Behavior::Succeed => {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    Ok(ModelResponse {
                        text: format!("{first_line} via {}", request.model),
                        usage: Some(TokenUsage {
                            input_tokens: 10,
                            output_tokens: 20,
                        }),
                        model: Some(request.model.to_string()),
                    })
                }
                Behavior::RateLimited => Err(ModelCallError::rate_limited(
                    "ThrottlingException",
                    "Rate exceeded",
                )),
                Behavior::Fail => Err(ModelCallError::permanent(
                    "ValidationException",
                    "model rejected the request",
                )),
                Behavior::Hang => std::future::pending().await,
            }
        })
    }
}

pub fn tier(level: u8) -> ModelTier {
    ModelTier::new(level).unwrap()
}

/// Two tiers: `tier1` = alpha, alpha-backup; `tier2` = beta.
pub fn test_provider() -> ProviderConfig {
    ProviderConfig::new("test")
        .with_tier(tier(1), ["alpha", "alpha-backup"])
        .with_tier(tier(2), ["beta"])
}

/// Millisecond backoff so retry paths finish quickly.
pub fn fast_policy() -> BackoffPolicy {
    BackoffPolicy::new(3, Duration::from_millis(1), Duration::from_millis(4)).without_jitter()
}

pub struct Harness {
    pub executor: GraphExecutor,
    pub models: Arc<ScriptedModels>,
    pub events: Arc<RecordingObserver>,
}

pub fn harness(models: ScriptedModels, provider: ProviderConfig) -> Harness {
    harness_with(models, TierRegistry::builtin(), provider)
}

pub fn harness_with(
    models: ScriptedModels,
    registry: TierRegistry,
    provider: ProviderConfig,
) -> Harness {
    let registry = Arc::new(registry.with_provider(provider.clone()).unwrap());
    let models = Arc::new(models);
    let events = Arc::new(RecordingObserver::new());
    let invoker = ResilientInvoker::new(models.clone(), Arc::clone(&registry))
        .with_policy(fast_policy())
        .with_observer(events.clone());
    let executor = GraphExecutor::new(registry, Arc::new(provider), Arc::new(invoker))
        .with_observer(events.clone());
    Harness {
        executor,
        models,
        events,
    }
}
