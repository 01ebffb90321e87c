use std::time::Duration;

use rdkafka::{
    config::ClientConfig,
    producer::{FutureProducer, FutureRecord, Producer},
    util::Timeout,
};

use crate::{errors::AppError, events::EventPublisher, models::RatingEvent};

/// Publishes rating events to a Kafka-compatible broker.
///
/// Records are keyed by `"<userId>-<courseId>"` so every event for one pair
/// lands on one partition. The producer is idempotent, which keeps broker
/// order equal to enqueue order even when librdkafka retries internally.
pub struct KafkaRatingPublisher {
    producer: FutureProducer,
    topic: String,
}

impl KafkaRatingPublisher {
    /// `delivery_timeout` bounds how long librdkafka keeps trying a record
    /// before reporting it as failed.
    pub fn new(
        brokers: &str,
        topic: impl Into<String>,
        delivery_timeout: Duration,
    ) -> Result<Self, AppError> {
        let topic = topic.into();

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set(
                "message.timeout.ms",
                delivery_timeout.as_millis().to_string(),
            )
            .set("acks", "all")
            .set("enable.idempotence", "true")
            .create()
            .map_err(|e| AppError::Transport(format!("Failed to create producer: {e}")))?;

        tracing::info!(
            brokers = %brokers,
            topic = %topic,
            "Kafka rating publisher created"
        );

        Ok(Self { producer, topic })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Waits for queued records on shutdown.
    pub fn flush(&self, timeout: Duration) {
        if let Err(e) = self.producer.flush(Timeout::After(timeout)) {
            tracing::warn!(error = %e, "Producer flush did not complete");
        }
    }
}

pub fn encode_event(event: &RatingEvent) -> Result<Vec<u8>, AppError> {
    serde_json::to_vec(event).map_err(|e| AppError::Serialization(e.to_string()))
}

impl EventPublisher for KafkaRatingPublisher {
    fn publish(&self, event: RatingEvent) {
        let payload = match encode_event(&event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, ?event, "Failed to encode rating event");
                return;
            }
        };
        let key = event.partition_key();

        // Enqueued synchronously so per-key order follows call order; only
        // the delivery report is awaited in the background.
        let record = FutureRecord::to(&self.topic)
            .key(key.as_str())
            .payload(&payload);
        let delivery = match self.producer.send_result(record) {
            Ok(delivery) => delivery,
            Err((e, _)) => {
                tracing::error!(
                    topic = %self.topic,
                    key = %key,
                    error = %e,
                    "Failed to enqueue rating event"
                );
                return;
            }
        };

        let topic = self.topic.clone();
        tokio::spawn(async move {
            match delivery.await {
                Ok(Ok((partition, offset))) => {
                    tracing::info!(
                        topic = %topic,
                        key = %key,
                        partition = partition,
                        offset = offset,
                        event_type = %event.event_type,
                        rating_id = event.rating_id,
                        "Rating event delivered"
                    );
                }
                Ok(Err((e, _))) => {
                    tracing::error!(
                        topic = %topic,
                        key = %key,
                        error = %e,
                        ?event,
                        "Failed to deliver rating event"
                    );
                }
                Err(_) => {
                    tracing::error!(
                        topic = %topic,
                        key = %key,
                        ?event,
                        "Delivery report dropped before completion"
                    );
                }
            }
        });
    }
}
