//! Redpanda (Kafka-compatible) integration for the student portal.
//!
//! Three pieces, each built on rdkafka:
//!
//! - [`RedpandaEventSink`]: implements `EventSink` from `portal-core` on a
//!   `FutureProducer`. Events are serialized as JSON and keyed by email, so
//!   all events for one account land on the same partition.
//! - [`ensure_topics`]: creates the topics the service publishes to before it
//!   takes traffic. A topic that already exists counts as success.
//! - [`EventConsumer`]: a background consumer that logs every message on the
//!   user events topic until it is closed.
//!
//! # Delivery Semantics
//!
//! Publishing is at-most-once from the application's point of view: the sink
//! makes one attempt per event and reports the broker's answer. Retries and
//! backpressure live in the event emitter, not here.
//!
//! # Example
//!
//! ```no_run
//! use portal_redpanda::{RedpandaEventSink, TopicSpec, ensure_topics};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! ensure_topics(
//!     "localhost:9092",
//!     &[TopicSpec::new("user-auth-events")],
//!     Duration::from_secs(10),
//! )
//! .await?;
//!
//! let sink = RedpandaEventSink::builder()
//!     .brokers("localhost:9092")
//!     .producer_acks("1")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod admin;
mod consumer;
mod producer;

pub use admin::{TopicError, TopicSpec, ensure_topics};
pub use consumer::{ConsumerError, EventConsumer};
pub use producer::{RedpandaEventSink, RedpandaEventSinkBuilder};
