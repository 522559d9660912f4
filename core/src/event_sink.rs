//! Outbound event sink abstraction.
//!
//! The [`EventSink`] trait is the capability the event emitter uses to hand a
//! single [`DomainEvent`] to the broker. It knows nothing about queues,
//! concurrency or retries: those belong to the emitter.
//!
//! # Implementations
//!
//! - `RedpandaEventSink` (`portal-redpanda`) - Kafka-compatible producer
//! - `RecordingEventSink` / `FailingEventSink` (`portal-testing`) - for tests
//!
//! # Dyn Compatibility
//!
//! This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
//! so it can be held as `Arc<dyn EventSink>` by the emitter.

use crate::event::DomainEvent;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur while delivering an event.
#[derive(Error, Debug, Clone)]
pub enum EventSinkError {
    /// Failed to connect to the broker.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Failed to serialize the event payload.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// The broker rejected or timed out the publish.
    #[error("Publish failed for topic '{topic}': {reason}")]
    PublishFailed {
        /// The topic that failed
        topic: String,
        /// The reason for failure
        reason: String,
    },

    /// The sink has been closed.
    #[error("Event sink closed")]
    Closed,
}

/// Boxed future returned by [`EventSink::publish`].
pub type PublishFuture<'a> = Pin<Box<dyn Future<Output = Result<(), EventSinkError>> + Send + 'a>>;

/// Destination for domain events.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: a single sink is shared by every
/// delivery task the emitter runs.
pub trait EventSink: Send + Sync {
    /// Deliver one event to `topic`, keyed by `event.key()`.
    ///
    /// # Errors
    ///
    /// Returns [`EventSinkError`] if the event could not be serialized or the
    /// broker did not accept it.
    fn publish<'a>(&'a self, topic: &'a str, event: &'a DomainEvent) -> PublishFuture<'a>;
}
