//! Background consumer that logs user events.

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::message::{BorrowedMessage, Message};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};

/// Pause after a receive error before polling again.
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Bytes of the message value included in the log line.
const PREVIEW_BYTES: usize = 20;

/// Errors from starting or closing the consumer.
#[derive(Error, Debug)]
pub enum ConsumerError {
    /// librdkafka rejected the consumer configuration.
    #[error("Failed to create consumer: {0}")]
    Create(#[source] KafkaError),

    /// Subscribing to the topic failed.
    #[error("Failed to subscribe to '{topic}': {source}")]
    Subscribe {
        /// The topic
        topic: String,
        /// Underlying error
        source: KafkaError,
    },

    /// The consume loop did not stop in time and was aborted.
    #[error("Consumer did not stop within {0:?}")]
    CloseTimeout(Duration),

    /// The consume loop panicked.
    #[error("Consumer task failed: {0}")]
    Task(#[from] JoinError),
}

/// Handle to the running consume loop.
#[derive(Debug)]
pub struct EventConsumer {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl EventConsumer {
    /// Subscribe to `topic` in consumer group `group` and start logging
    /// messages on a background task.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerError::Create`] or [`ConsumerError::Subscribe`] if
    /// librdkafka rejects the configuration or subscription.
    pub fn start(brokers: &str, group: &str, topic: &str) -> Result<Self, ConsumerError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group)
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .set("enable.partition.eof", "false")
            .create()
            .map_err(ConsumerError::Create)?;

        consumer
            .subscribe(&[topic])
            .map_err(|source| ConsumerError::Subscribe {
                topic: topic.to_string(),
                source,
            })?;

        tracing::info!(topic, group, "Event consumer subscribed");

        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(consume(consumer, shutdown_rx));
        Ok(Self { shutdown, task })
    }

    /// Stop the consume loop and leave the group.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerError::CloseTimeout`] if the loop is still running
    /// after `timeout` (it is aborted), or [`ConsumerError::Task`] if it
    /// panicked.
    pub async fn close(self, timeout: Duration) -> Result<(), ConsumerError> {
        // Err only when the loop already exited.
        let _ = self.shutdown.send(true);

        let mut task = self.task;
        match tokio::time::timeout(timeout, &mut task).await {
            Ok(joined) => joined.map_err(ConsumerError::from),
            Err(_) => {
                task.abort();
                Err(ConsumerError::CloseTimeout(timeout))
            }
        }
    }
}

async fn consume(consumer: StreamConsumer, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            received = consumer.recv() => match received {
                Ok(message) => log_message(&message),
                Err(e) => {
                    tracing::error!(error = %e, "Event consumer receive failed");
                    tokio::select! {
                        _ = shutdown.changed() => {}
                        () = tokio::time::sleep(ERROR_BACKOFF) => {}
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
            },
        }
    }

    consumer.unsubscribe();
    tracing::info!("Event consumer stopped");
}

fn log_message(message: &BorrowedMessage<'_>) {
    let key = message.key().map(String::from_utf8_lossy).unwrap_or_default();
    let preview = message.payload().map(preview).unwrap_or_default();

    tracing::info!(
        topic = message.topic(),
        partition = message.partition(),
        offset = message.offset(),
        key = %key,
        preview = %preview,
        "Consumed event"
    );
}

/// Lossy UTF-8 rendering of the first [`PREVIEW_BYTES`] bytes.
fn preview(payload: &[u8]) -> String {
    let end = payload.len().min(PREVIEW_BYTES);
    String::from_utf8_lossy(&payload[..end]).into_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_to_twenty_bytes() {
        let payload = br#"{"event_type":"user_register","user_id":1}"#;
        assert_eq!(preview(payload), r#"{"event_type":"user_"#);
        assert_eq!(preview(b"short"), "short");
        assert_eq!(preview(b""), "");
    }

    #[test]
    fn preview_tolerates_split_utf8() {
        // 19 ASCII bytes followed by a two-byte character split at the cut.
        let mut payload = vec![b'a'; 19];
        payload.extend_from_slice("é".as_bytes());
        let rendered = preview(&payload);
        assert!(rendered.starts_with(&"a".repeat(19)));
        assert!(rendered.ends_with('\u{FFFD}'));
    }

    #[tokio::test]
    async fn close_stops_loop_without_broker() {
        let consumer =
            EventConsumer::start("127.0.0.1:1", "student-portal-group", "user-auth-events")
                .unwrap();
        consumer.close(Duration::from_secs(10)).await.unwrap();
    }
}
