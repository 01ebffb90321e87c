use std::sync::{Arc, Mutex};

use crate::{events::EventPublisher, models::RatingEvent};

/// Publisher that keeps every event in memory, in publish order.
#[derive(Clone, Default)]
pub struct InMemoryPublisher {
    events: Arc<Mutex<Vec<RatingEvent>>>,
}

impl InMemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RatingEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn events_for_key(&self, key: &str) -> Vec<RatingEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.partition_key() == key)
            .collect()
    }
}

impl EventPublisher for InMemoryPublisher {
    fn publish(&self, event: RatingEvent) {
        tracing::debug!(
            event_type = %event.event_type,
            key = %event.partition_key(),
            "Recorded rating event"
        );
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}
