pub mod log;
pub mod multi;
pub mod noop;
pub mod recording;
pub mod traits;

pub use self::log::LogObserver;
pub use multi::MultiObserver;
pub use noop::NoopObserver;
pub use recording::RecordingObserver;
pub use traits::{EventFields, EventKind, Observer, ObserverEvent};

use crate::config::ObservabilityConfig;
use std::sync::Arc;

/// Observer for the configured backend (`log` or `none`).
pub fn create_observer(config: &ObservabilityConfig) -> Arc<dyn Observer> {
    match config.backend.as_str() {
        "log" => Arc::new(LogObserver::new()),
        "none" | "noop" => Arc::new(NoopObserver),
        _ => {
            tracing::warn!(
                "Unknown observability backend '{}', falling back to noop",
                config.backend
            );
            Arc::new(NoopObserver)
        }
    }
}
