use std::time::Duration;

use futures::StreamExt;
use rdkafka::{
    config::ClientConfig,
    consumer::{CommitMode, Consumer, StreamConsumer},
    message::Message,
};

use crate::{
    config::AggregatorConfig,
    errors::AppError,
    events::{ApplyOutcome, RatingAggregator},
    models::RatingEvent,
};

const APPLY_ATTEMPTS: u32 = 3;
const APPLY_BASE_DELAY: Duration = Duration::from_millis(500);
const REDELIVERY_BASE_DELAY: Duration = Duration::from_secs(1);
const REDELIVERY_MAX_DELAY: Duration = Duration::from_secs(30);

pub fn decode_event(payload: Option<&[u8]>) -> Result<RatingEvent, AppError> {
    let payload =
        payload.ok_or_else(|| AppError::Deserialization("Message has no payload".into()))?;
    serde_json::from_slice(payload).map_err(|e| AppError::Deserialization(e.to_string()))
}

/// Whether a consumed record may be acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordDisposition {
    Commit,
    /// The record was not applied and its offset must stay uncommitted.
    Hold,
}

/// Decodes and applies one record from the ratings topic.
///
/// Applied records, records for courses the catalog does not know, and
/// undecodable records are committed. A record whose apply keeps failing
/// is held.
pub async fn handle_record(
    aggregator: &RatingAggregator,
    payload: Option<&[u8]>,
) -> RecordDisposition {
    let event = match decode_event(payload) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!(error = %e, "Skipping undecodable rating event");
            return RecordDisposition::Commit;
        }
    };

    match aggregator
        .apply_with_retry(&event, APPLY_ATTEMPTS, APPLY_BASE_DELAY)
        .await
    {
        ApplyOutcome::Applied | ApplyOutcome::Skipped => RecordDisposition::Commit,
        ApplyOutcome::RetryLater => RecordDisposition::Hold,
    }
}

/// Consumes the ratings topic until ctrl-c.
///
/// A record's offset is committed only once [`handle_record`] settles it.
/// A held record is retried in place with capped backoff, so later records
/// of its partition wait behind it and nothing past it is acknowledged.
pub async fn run_aggregator(
    config: &AggregatorConfig,
    aggregator: RatingAggregator,
) -> Result<(), AppError> {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &config.kafka_brokers)
        .set("group.id", &config.group_id)
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "earliest")
        .set("session.timeout.ms", "6000")
        .set("enable.partition.eof", "false")
        .create()
        .map_err(|e| AppError::Transport(format!("Failed to create consumer: {e}")))?;

    consumer
        .subscribe(&[config.ratings_topic.as_str()])
        .map_err(|e| AppError::Transport(format!("Failed to subscribe: {e}")))?;

    tracing::info!(
        topic = %config.ratings_topic,
        consumer_group = %config.group_id,
        "Rating aggregator subscribed"
    );

    let mut stream = consumer.stream();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    'consume: loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutdown requested, stopping rating aggregator");
                break;
            }
            next = stream.next() => {
                let Some(result) = next else {
                    break;
                };

                let message = match result {
                    Ok(message) => message,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to receive rating event");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        continue;
                    }
                };

                tracing::debug!(
                    partition = message.partition(),
                    offset = message.offset(),
                    "Received rating event"
                );

                let mut delay = REDELIVERY_BASE_DELAY;
                loop {
                    match handle_record(&aggregator, message.payload()).await {
                        RecordDisposition::Commit => break,
                        RecordDisposition::Hold => {
                            tracing::warn!(
                                partition = message.partition(),
                                offset = message.offset(),
                                retry_in_ms = delay.as_millis() as u64,
                                "Holding rating event, offset not committed"
                            );
                            tokio::select! {
                                _ = &mut shutdown => {
                                    tracing::info!("Shutdown requested, stopping rating aggregator");
                                    break 'consume;
                                }
                                _ = tokio::time::sleep(delay) => {}
                            }
                            delay = (delay * 2).min(REDELIVERY_MAX_DELAY);
                        }
                    }
                }

                if let Err(e) = consumer.commit_message(&message, CommitMode::Async) {
                    tracing::warn!(
                        partition = message.partition(),
                        offset = message.offset(),
                        error = %e,
                        "Failed to commit offset (message may be redelivered)"
                    );
                }
            }
        }
    }

    tracing::info!("Rating aggregator stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RatingEventType;

    #[test]
    fn decodes_wire_record() {
        let raw = br#"{"eventType":"DELETED","ratingId":5,"userId":7,"courseId":42,"rating":5,"timestamp":"2024-05-01T10:00:00Z"}"#;
        let event = decode_event(Some(&raw[..])).unwrap();

        assert_eq!(event.event_type, RatingEventType::Deleted);
        assert_eq!(event.review, None);
        assert_eq!(event.partition_key(), "7-42");
    }

    #[test]
    fn missing_payload_is_an_error() {
        assert!(matches!(
            decode_event(None),
            Err(AppError::Deserialization(_))
        ));
        assert!(decode_event(Some(&b"not json"[..])).is_err());
    }
}
