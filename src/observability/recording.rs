use super::traits::{EventKind, Observer, ObserverEvent};
use std::sync::{Mutex, PoisonError};

/// Keeps every event in memory. Used for run summaries and assertions.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObserverEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ObserverEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|event| event.kind() == kind)
            .count()
    }

    /// Events of `kind` emitted for `node`, in emission order.
    pub fn for_node(&self, node: &str, kind: EventKind) -> Vec<ObserverEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|event| event.kind() == kind && event.node() == Some(node))
            .cloned()
            .collect()
    }
}

impl Observer for RecordingObserver {
    fn record_event(&self, event: &ObserverEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }

    fn name(&self) -> &str {
        "recording"
    }
}
