use super::traits::{Observer, ObserverEvent};
use tracing::{info, warn};

/// Writes every event as a `tracing` record.
pub struct LogObserver;

impl LogObserver {
    pub fn new() -> Self {
        Self
    }
}

fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Observer for LogObserver {
    fn record_event(&self, event: &ObserverEvent) {
        let fields = event.fields();
        let event_kind = fields.event_kind.to_string();
        let node_name = fields.node_name.unwrap_or("-");
        let model_id = fields.model_id.unwrap_or("-");
        let status = fields.status.unwrap_or("-");
        let duration_ms = fields.duration.map_or(0, millis);
        let attempt_count = fields.attempt_count.unwrap_or(0);

        match event {
            ObserverEvent::RateLimit { .. } => {
                warn!(
                    event_kind = %event_kind,
                    node_name = %node_name,
                    model_id = %model_id,
                    attempt_count,
                    delay_ms = duration_ms,
                    "model.rate_limited"
                );
            }
            ObserverEvent::ModelFallback {
                to_model, reason, ..
            } => {
                warn!(
                    event_kind = %event_kind,
                    node_name = %node_name,
                    model_id = %model_id,
                    to_model = %to_model,
                    attempt_count,
                    reason = %reason,
                    "model.fallback"
                );
            }
            ObserverEvent::RunStart {
                run_id,
                graph,
                provider,
                nodes,
            } => {
                info!(
                    event_kind = %event_kind,
                    run_id = %run_id,
                    graph = %graph,
                    provider = %provider,
                    nodes,
                    "run.start"
                );
            }
            ObserverEvent::RunEnd { run_id, .. } => {
                info!(
                    event_kind = %event_kind,
                    run_id = %run_id,
                    status = %status,
                    duration_ms,
                    "run.end"
                );
            }
            ObserverEvent::NodeStart { tier, .. } => {
                info!(event_kind = %event_kind, node_name = %node_name, tier = %tier, "node.start");
            }
            _ => {
                info!(
                    event_kind = %event_kind,
                    node_name = %node_name,
                    model_id = %model_id,
                    status = %status,
                    duration_ms,
                    attempt_count,
                    "observer.event"
                );
            }
        }
    }

    fn name(&self) -> &str {
        "log"
    }
}
