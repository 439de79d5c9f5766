use super::backoff::BackoffPolicy;
use super::classifier::{FailureAction, FailureClassifier, ThrottleClassifier};
use super::tiers::{ProviderConfig, TierRegistry};
use super::traits::ModelClient;
use super::types::{
    AttemptOutcome, GenerationParams, Invocation, InvocationAttempt, InvocationSuccess,
    ModelRequest, TokenUsage,
};
use crate::error::{ConfigError, InvokeError, ModelCallError, ModelInvocationError};
use crate::observability::{NoopObserver, Observer, ObserverEvent};
use std::sync::Arc;
use std::time::Instant;

/// Model caller with per-model retry and fallback down the tier chain.
///
/// For each candidate model the call is repeated while the classifier reports
/// a throttling signal and the policy has attempts left, sleeping between
/// attempts. Any other failure, or an exhausted budget, moves on to the next
/// candidate with a fresh budget. The invoker holds no per-call state, so a
/// single instance serves concurrent nodes.
pub struct ResilientInvoker {
    client: Arc<dyn ModelClient>,
    registry: Arc<TierRegistry>,
    policy: BackoffPolicy,
    classifier: Arc<dyn FailureClassifier>,
    observer: Arc<dyn Observer>,
    params: GenerationParams,
}

impl ResilientInvoker {
    pub fn new(client: Arc<dyn ModelClient>, registry: Arc<TierRegistry>) -> Self {
        Self {
            client,
            registry,
            policy: BackoffPolicy::default(),
            classifier: Arc::new(ThrottleClassifier::default()),
            observer: Arc::new(NoopObserver),
            params: GenerationParams::default(),
        }
    }

    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn FailureClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    pub fn registry(&self) -> &TierRegistry {
        &self.registry
    }

    /// Models tried for `invocation`, in order. A pinned model goes first and
    /// is not repeated later in the chain.
    pub fn candidates(
        &self,
        invocation: &Invocation<'_>,
        provider: &ProviderConfig,
    ) -> Result<Vec<String>, ConfigError> {
        self.registry
            .resolve_pinned(invocation.tier, invocation.pinned_model, provider)
    }

    pub async fn invoke(
        &self,
        invocation: Invocation<'_>,
        provider: &ProviderConfig,
    ) -> Result<InvocationSuccess, InvokeError> {
        let candidates = self.candidates(&invocation, provider)?;
        let node = invocation.node;
        let mut history: Vec<InvocationAttempt> = Vec::new();
        let mut fallbacks = 0_u32;
        let mut last_failure: Option<(String, ModelCallError)> = None;

        for (index, model) in candidates.iter().enumerate() {
            let mut attempt = 0_u32;

            loop {
                attempt += 1;
                self.observer.record_event(&ObserverEvent::InvocationStart {
                    node: node.to_string(),
                    model: model.clone(),
                    attempt,
                });

                let started = Instant::now();
                let result = self
                    .client
                    .complete(ModelRequest {
                        model,
                        system_prompt: invocation.system_prompt,
                        prompt: invocation.prompt,
                        params: self.params,
                    })
                    .await;
                let latency = started.elapsed();

                match result {
                    Ok(response) => {
                        let usage = response
                            .usage
                            .unwrap_or_else(|| TokenUsage::estimate(invocation.prompt, &response.text));
                        history.push(InvocationAttempt {
                            model: model.clone(),
                            attempt,
                            outcome: AttemptOutcome::Success,
                            latency,
                            usage: Some(usage),
                            output_chars: Some(response.text.chars().count()),
                            error_code: None,
                        });
                        self.observer.record_event(&ObserverEvent::InvocationEnd {
                            node: node.to_string(),
                            model: model.clone(),
                            attempt,
                            outcome: AttemptOutcome::Success,
                            duration: latency,
                        });
                        if attempt > 1 || index > 0 {
                            tracing::info!(
                                node = node,
                                model = model.as_str(),
                                attempt,
                                "Model call recovered after retries"
                            );
                        }
                        return Ok(InvocationSuccess {
                            text: response.text,
                            model: model.clone(),
                            total_attempts: count(&history),
                            fallbacks,
                            usage: Some(usage),
                            history,
                        });
                    }
                    Err(error) => {
                        let outcome = AttemptOutcome::from(error.kind());
                        history.push(InvocationAttempt {
                            model: model.clone(),
                            attempt,
                            outcome,
                            latency,
                            usage: None,
                            output_chars: None,
                            error_code: Some(error.code().to_string()),
                        });
                        self.observer.record_event(&ObserverEvent::InvocationEnd {
                            node: node.to_string(),
                            model: model.clone(),
                            attempt,
                            outcome,
                            duration: latency,
                        });

                        let throttled =
                            self.classifier.classify(&error) == FailureAction::RetrySameModel;
                        if throttled && self.policy.has_attempts_left(attempt) {
                            let delay = error.retry_after().map_or_else(
                                || self.policy.delay_for(attempt - 1),
                                |hint| hint.min(self.policy.max_delay()),
                            );
                            self.observer.record_event(&ObserverEvent::RateLimit {
                                node: node.to_string(),
                                model: model.clone(),
                                attempt,
                                delay,
                            });
                            tracing::warn!(
                                node = node,
                                model = model.as_str(),
                                attempt,
                                max_attempts = self.policy.max_attempts(),
                                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                                "Model throttled, retrying"
                            );
                            tokio::time::sleep(delay).await;
                            continue;
                        }

                        if !throttled {
                            tracing::warn!(
                                node = node,
                                model = model.as_str(),
                                code = error.code(),
                                "Non-retryable model error"
                            );
                        }
                        last_failure = Some((model.clone(), error));
                        break;
                    }
                }
            }

            if let Some(next) = candidates.get(index + 1) {
                fallbacks += 1;
                let reason = last_failure.as_ref().map_or_else(String::new, |(_, error)| {
                    format!("{} after {attempt} attempt(s): {error}", error.kind())
                });
                self.observer.record_event(&ObserverEvent::ModelFallback {
                    node: node.to_string(),
                    from_model: model.clone(),
                    to_model: next.clone(),
                    reason,
                    attempts: attempt,
                });
                tracing::warn!(
                    node = node,
                    model = model.as_str(),
                    next_model = next.as_str(),
                    "Switching to fallback model"
                );
            }
        }

        let Some((last_model, last_error)) = last_failure else {
            return Err(ConfigError::TierNotResolvable {
                provider: provider.name.clone(),
                tier: invocation.tier,
            }
            .into());
        };

        Err(ModelInvocationError {
            tier: invocation.tier,
            last_model,
            last_error,
            total_attempts: count(&history),
            fallbacks,
            history,
        }
        .into())
    }
}

fn count(history: &[InvocationAttempt]) -> u32 {
    u32::try_from(history.len()).unwrap_or(u32::MAX)
}
