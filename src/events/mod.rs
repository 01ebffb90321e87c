//! Rating event propagation: publishing committed mutations onto the ratings
//! topic, and the downstream consumer that folds them into course aggregates.

pub mod aggregator;
pub mod consumer;
pub mod kafka;
pub mod memory;

use crate::models::RatingEvent;

pub use aggregator::{ApplyOutcome, CourseCatalog, HttpCourseCatalog, RatingAggregator};
pub use consumer::{RecordDisposition, handle_record};
pub use kafka::KafkaRatingPublisher;
pub use memory::InMemoryPublisher;

/// Hands a committed event to the transport.
///
/// Implementations must return without waiting for the broker. Delivery
/// outcome is observed out of band and never reported back to the caller.
/// Calls made in sequence for the same partition key must be enqueued in
/// that order.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: RatingEvent);
}
