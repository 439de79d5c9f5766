use crate::llm::tiers::ModelTier;
use crate::llm::types::AttemptOutcome;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    RunStart,
    RunEnd,
    NodeStart,
    NodeEnd,
    InvocationStart,
    InvocationEnd,
    RateLimit,
    ModelFallback,
}

/// Events the observer can record
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverEvent {
    RunStart {
        run_id: String,
        graph: String,
        provider: String,
        nodes: usize,
    },
    RunEnd {
        run_id: String,
        status: String,
        duration: Duration,
    },
    NodeStart {
        node: String,
        tier: ModelTier,
    },
    NodeEnd {
        node: String,
        status: String,
        model: Option<String>,
        attempts: u32,
        duration: Duration,
    },
    InvocationStart {
        node: String,
        model: String,
        attempt: u32,
    },
    InvocationEnd {
        node: String,
        model: String,
        attempt: u32,
        outcome: AttemptOutcome,
        duration: Duration,
    },
    RateLimit {
        node: String,
        model: String,
        attempt: u32,
        delay: Duration,
    },
    ModelFallback {
        node: String,
        from_model: String,
        to_model: String,
        reason: String,
        attempts: u32,
    },
}

/// The common field set every event is flattened to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventFields<'a> {
    pub event_kind: EventKind,
    pub node_name: Option<&'a str>,
    pub model_id: Option<&'a str>,
    pub status: Option<&'a str>,
    pub duration: Option<Duration>,
    pub attempt_count: Option<u32>,
}

impl ObserverEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::RunStart { .. } => EventKind::RunStart,
            Self::RunEnd { .. } => EventKind::RunEnd,
            Self::NodeStart { .. } => EventKind::NodeStart,
            Self::NodeEnd { .. } => EventKind::NodeEnd,
            Self::InvocationStart { .. } => EventKind::InvocationStart,
            Self::InvocationEnd { .. } => EventKind::InvocationEnd,
            Self::RateLimit { .. } => EventKind::RateLimit,
            Self::ModelFallback { .. } => EventKind::ModelFallback,
        }
    }

    pub fn node(&self) -> Option<&str> {
        match self {
            Self::RunStart { .. } | Self::RunEnd { .. } => None,
            Self::NodeStart { node, .. }
            | Self::NodeEnd { node, .. }
            | Self::InvocationStart { node, .. }
            | Self::InvocationEnd { node, .. }
            | Self::RateLimit { node, .. }
            | Self::ModelFallback { node, .. } => Some(node.as_str()),
        }
    }

    pub fn fields(&self) -> EventFields<'_> {
        let mut fields = EventFields {
            event_kind: self.kind(),
            node_name: self.node(),
            model_id: None,
            status: None,
            duration: None,
            attempt_count: None,
        };
        match self {
            Self::RunStart { .. } | Self::NodeStart { .. } => {}
            Self::RunEnd {
                status, duration, ..
            } => {
                fields.status = Some(status.as_str());
                fields.duration = Some(*duration);
            }
            Self::NodeEnd {
                status,
                model,
                attempts,
                duration,
                ..
            } => {
                fields.status = Some(status.as_str());
                fields.model_id = model.as_deref();
                fields.attempt_count = Some(*attempts);
                fields.duration = Some(*duration);
            }
            Self::InvocationStart { model, attempt, .. } => {
                fields.model_id = Some(model.as_str());
                fields.attempt_count = Some(*attempt);
            }
            Self::InvocationEnd {
                model,
                attempt,
                outcome,
                duration,
                ..
            } => {
                fields.model_id = Some(model.as_str());
                fields.attempt_count = Some(*attempt);
                fields.status = Some(outcome_label(*outcome));
                fields.duration = Some(*duration);
            }
            Self::RateLimit {
                model,
                attempt,
                delay,
                ..
            } => {
                fields.model_id = Some(model.as_str());
                fields.attempt_count = Some(*attempt);
                fields.duration = Some(*delay);
            }
            Self::ModelFallback {
                from_model,
                attempts,
                ..
            } => {
                fields.model_id = Some(from_model.as_str());
                fields.attempt_count = Some(*attempts);
            }
        }
        fields
    }
}

fn outcome_label(outcome: AttemptOutcome) -> &'static str {
    match outcome {
        AttemptOutcome::Success => "success",
        AttemptOutcome::RateLimited => "rate_limited",
        AttemptOutcome::Error => "error",
    }
}

/// Sink for orchestration events.
///
/// Observers are sinks: nothing they do may affect scheduling or retries.
pub trait Observer: Send + Sync {
    /// Record a discrete event
    fn record_event(&self, event: &ObserverEvent);

    /// Flush any buffered data (no-op for most backends)
    fn flush(&self) {}

    /// Human-readable name of this observer
    fn name(&self) -> &str;
}
