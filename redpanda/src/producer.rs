//! Kafka producer implementing [`EventSink`].

use portal_core::event_sink::PublishFuture;
use portal_core::{DomainEvent, EventSink, EventSinkError};
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use std::time::Duration;

const DEFAULT_ACKS: &str = "1";
const DEFAULT_COMPRESSION: &str = "none";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Event sink backed by an rdkafka `FutureProducer`.
///
/// The producer is internally synchronized and cheap to clone, so one sink is
/// shared by every delivery task.
///
/// # Example
///
/// ```no_run
/// use portal_redpanda::RedpandaEventSink;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let sink = RedpandaEventSink::builder()
///     .brokers("localhost:9092,localhost:9093")
///     .producer_acks("all")
///     .compression("lz4")
///     .timeout(Duration::from_secs(10))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedpandaEventSink {
    producer: FutureProducer,
    brokers: String,
    timeout: Duration,
}

impl RedpandaEventSink {
    /// Create a sink with default producer settings.
    ///
    /// # Errors
    ///
    /// Returns [`EventSinkError::ConnectionFailed`] if the producer cannot be
    /// created from the given configuration.
    pub fn new(brokers: &str) -> Result<Self, EventSinkError> {
        Self::builder().brokers(brokers).build()
    }

    /// Start configuring a sink.
    #[must_use]
    pub fn builder() -> RedpandaEventSinkBuilder {
        RedpandaEventSinkBuilder::default()
    }

    /// Bootstrap servers this sink was built with.
    #[must_use]
    pub fn brokers(&self) -> &str {
        &self.brokers
    }

    /// Per-message delivery timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Flush buffered messages, waiting at most `timeout`.
    ///
    /// librdkafka's flush blocks, so it runs on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns [`EventSinkError::PublishFailed`] if messages are still queued
    /// when the timeout expires.
    pub async fn flush(&self, timeout: Duration) -> Result<(), EventSinkError> {
        let producer = self.producer.clone();
        let flushed = tokio::task::spawn_blocking(move || producer.flush(Timeout::After(timeout)))
            .await
            .map_err(|e| EventSinkError::ConnectionFailed(format!("Flush task failed: {e}")))?;

        flushed.map_err(|e| EventSinkError::PublishFailed {
            topic: "*".to_string(),
            reason: format!("Flush incomplete: {e}"),
        })?;

        tracing::info!(brokers = %self.brokers, "Kafka producer flushed");
        Ok(())
    }
}

impl std::fmt::Debug for RedpandaEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedpandaEventSink")
            .field("brokers", &self.brokers)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl EventSink for RedpandaEventSink {
    fn publish<'a>(&'a self, topic: &'a str, event: &'a DomainEvent) -> PublishFuture<'a> {
        Box::pin(async move {
            let payload = serde_json::to_vec(event)
                .map_err(|e| EventSinkError::SerializationFailed(e.to_string()))?;

            let record = FutureRecord::to(topic).payload(&payload).key(event.key());

            match self.producer.send(record, Timeout::After(self.timeout)).await {
                Ok((partition, offset)) => {
                    tracing::debug!(
                        topic,
                        partition,
                        offset,
                        event_type = %event.event_type,
                        user_id = event.user_id,
                        "Event delivered to broker"
                    );
                    Ok(())
                }
                Err((kafka_error, _)) => Err(EventSinkError::PublishFailed {
                    topic: topic.to_string(),
                    reason: kafka_error.to_string(),
                }),
            }
        })
    }
}

/// Builder for a [`RedpandaEventSink`].
#[derive(Debug, Default)]
pub struct RedpandaEventSinkBuilder {
    brokers: Option<String>,
    producer_acks: Option<String>,
    compression: Option<String>,
    timeout: Option<Duration>,
}

impl RedpandaEventSinkBuilder {
    /// Comma-separated bootstrap servers (e.g. `"localhost:9092"`).
    #[must_use]
    pub fn brokers(mut self, brokers: impl Into<String>) -> Self {
        self.brokers = Some(brokers.into());
        self
    }

    /// Acknowledgment mode: `"0"`, `"1"` or `"all"`.
    ///
    /// Default: `"1"` (leader ack).
    #[must_use]
    pub fn producer_acks(mut self, acks: impl Into<String>) -> Self {
        self.producer_acks = Some(acks.into());
        self
    }

    /// Compression codec: `"none"`, `"gzip"`, `"snappy"`, `"lz4"`, `"zstd"`.
    ///
    /// Default: `"none"`
    #[must_use]
    pub fn compression(mut self, compression: impl Into<String>) -> Self {
        self.compression = Some(compression.into());
        self
    }

    /// Per-message delivery timeout.
    ///
    /// Default: 5 seconds
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the sink.
    ///
    /// Creating the producer does not contact the brokers; connection errors
    /// surface on the first publish.
    ///
    /// # Errors
    ///
    /// Returns [`EventSinkError::ConnectionFailed`] if brokers are not set or
    /// librdkafka rejects the configuration.
    pub fn build(self) -> Result<RedpandaEventSink, EventSinkError> {
        let brokers = self
            .brokers
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| EventSinkError::ConnectionFailed("Brokers not configured".to_string()))?;
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let acks = self.producer_acks.as_deref().unwrap_or(DEFAULT_ACKS);
        let compression = self.compression.as_deref().unwrap_or(DEFAULT_COMPRESSION);

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &brokers)
            .set("message.timeout.ms", timeout.as_millis().to_string())
            .set("acks", acks)
            .set("compression.type", compression)
            .create()
            .map_err(|e| EventSinkError::ConnectionFailed(format!("Failed to create producer: {e}")))?;

        tracing::info!(brokers = %brokers, acks, compression, "Kafka producer created");

        Ok(RedpandaEventSink {
            producer,
            brokers,
            timeout,
        })
    }
}
