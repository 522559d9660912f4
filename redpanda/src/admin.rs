//! Topic provisioning.

use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::error::KafkaError;
use rdkafka::types::RDKafkaErrorCode;
use std::time::Duration;
use thiserror::Error;

/// Errors from topic provisioning.
#[derive(Error, Debug)]
pub enum TopicError {
    /// The admin client could not be created.
    #[error("Failed to create admin client: {0}")]
    Client(#[source] KafkaError),

    /// The create request failed as a whole (broker unreachable, timeout).
    #[error("Topic creation request failed: {0}")]
    Request(#[source] KafkaError),

    /// The broker refused one topic.
    #[error("Failed to create topic '{topic}': {code}")]
    Rejected {
        /// The topic that was refused
        topic: String,
        /// Broker error code
        code: RDKafkaErrorCode,
    },
}

/// Desired shape of a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSpec {
    /// Topic name.
    pub name: String,
    /// Partition count.
    pub partitions: i32,
    /// Replication factor.
    pub replication: i32,
}

impl TopicSpec {
    /// A single-partition, unreplicated topic.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partitions: 1,
            replication: 1,
        }
    }

    /// Override the partition count.
    #[must_use]
    pub const fn partitions(mut self, partitions: i32) -> Self {
        self.partitions = partitions;
        self
    }

    /// Override the replication factor.
    #[must_use]
    pub const fn replication(mut self, replication: i32) -> Self {
        self.replication = replication;
        self
    }
}

/// Make sure every topic in `topics` exists.
///
/// Topics that already exist are left untouched and count as success. The
/// request doubles as a reachability check: if no broker answers within
/// `timeout` the call fails.
///
/// # Errors
///
/// Returns [`TopicError::Request`] when the brokers cannot be reached in time
/// and [`TopicError::Rejected`] for the first topic the broker refuses.
pub async fn ensure_topics(
    brokers: &str,
    topics: &[TopicSpec],
    timeout: Duration,
) -> Result<(), TopicError> {
    let admin: AdminClient<DefaultClientContext> = ClientConfig::new()
        .set("bootstrap.servers", brokers)
        .create()
        .map_err(TopicError::Client)?;

    let new_topics: Vec<NewTopic<'_>> = topics
        .iter()
        .map(|t| NewTopic::new(&t.name, t.partitions, TopicReplication::Fixed(t.replication)))
        .collect();
    let options = AdminOptions::new()
        .operation_timeout(Some(timeout))
        .request_timeout(Some(timeout));

    let results = admin
        .create_topics(&new_topics, &options)
        .await
        .map_err(TopicError::Request)?;

    for result in results {
        match result {
            Ok(topic) => tracing::info!(topic = %topic, "Created topic"),
            Err((topic, RDKafkaErrorCode::TopicAlreadyExists)) => {
                tracing::info!(topic = %topic, "Topic already exists");
            }
            Err((topic, code)) => {
                tracing::error!(topic = %topic, code = %code, "Broker refused topic");
                return Err(TopicError::Rejected { topic, code });
            }
        }
    }

    Ok(())
}
