//! Fire-and-forget domain event emitter.
//!
//! Business operations call [`EventEmitter::publish`] synchronously. The call
//! only enqueues: it never awaits, never fails and never reports delivery
//! outcome. Delivery happens on tasks owned by the emitter, so cancelling or
//! dropping the request that produced an event cannot abort its delivery.
//!
//! # Backpressure
//!
//! ```text
//! publish ─try_send─▶ [bounded queue] ─▶ dispatcher ─permit─▶ delivery task ─▶ EventSink
//!    │                                                 (≤ max_in_flight)
//!    └─ queue full / closed: drop, log, count
//! ```
//!
//! The queue holds at most `queue_capacity` events and at most
//! `max_in_flight` deliveries run concurrently. When the queue is full the
//! new event is dropped and logged. Delivery is at-most-once: a failed
//! publish is logged and discarded, never retried here.
//!
//! # Shutdown
//!
//! [`EmitterHandle::shutdown`] closes the queue to new events, delivers what
//! is already queued, waits for in-flight deliveries, and gives up after the
//! supplied timeout.

use crate::metrics::EmitterMetrics;
use portal_core::{DomainEvent, EventSink, USER_EVENTS_TOPIC};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc, watch};
use tokio::task::{JoinError, JoinHandle, JoinSet};

/// Largest accepted `queue_capacity`.
pub const MAX_QUEUE_CAPACITY: usize = 1 << 20;

/// Largest accepted `max_in_flight`.
pub const MAX_IN_FLIGHT: usize = 4096;

/// Emitter tuning.
///
/// Both limits are clamped to `1..=MAX_*` when the emitter starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitterConfig {
    /// Topic every event is published to.
    pub topic: String,
    /// Maximum number of queued, not yet dispatched events.
    pub queue_capacity: usize,
    /// Maximum number of concurrent deliveries.
    pub max_in_flight: usize,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            topic: USER_EVENTS_TOPIC.to_string(),
            queue_capacity: 1024,
            max_in_flight: 32,
        }
    }
}

/// Errors reported when shutting the emitter down.
#[derive(Error, Debug)]
pub enum EmitterError {
    /// Queued or in-flight deliveries did not finish in time and were aborted.
    #[error("Event emitter did not drain within {0:?}")]
    DrainTimeout(Duration),

    /// The dispatcher task panicked or was cancelled.
    #[error("Event dispatcher failed: {0}")]
    Dispatcher(#[from] JoinError),
}

/// Request-side handle for submitting events. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: mpsc::Sender<DomainEvent>,
}

/// Owner-side handle used to stop and drain the emitter.
#[derive(Debug)]
pub struct EmitterHandle {
    shutdown: watch::Sender<bool>,
    dispatcher: JoinHandle<()>,
}

impl EventEmitter {
    /// Start the dispatcher and return the submission and shutdown handles.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn start(sink: Arc<dyn EventSink>, config: EmitterConfig) -> (Self, EmitterHandle) {
        let queue_capacity = config.queue_capacity.clamp(1, MAX_QUEUE_CAPACITY);
        let max_in_flight = config.max_in_flight.clamp(1, MAX_IN_FLIGHT);
        if queue_capacity != config.queue_capacity || max_in_flight != config.max_in_flight {
            tracing::warn!(
                requested_queue_capacity = config.queue_capacity,
                requested_max_in_flight = config.max_in_flight,
                queue_capacity,
                max_in_flight,
                "Emitter limits out of range, clamped"
            );
        }

        let (tx, rx) = mpsc::channel(queue_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let dispatcher = Dispatcher {
            rx,
            shutdown: shutdown_rx,
            sink,
            topic: Arc::from(config.topic.as_str()),
            permits: Arc::new(Semaphore::new(max_in_flight)),
            deliveries: JoinSet::new(),
        };

        tracing::info!(
            topic = %config.topic,
            queue_capacity,
            max_in_flight,
            "Event emitter started"
        );

        let handle = EmitterHandle {
            shutdown: shutdown_tx,
            dispatcher: tokio::spawn(dispatcher.run()),
        };
        (Self { tx }, handle)
    }

    /// Submit an event for background delivery.
    ///
    /// Returns immediately. If the queue is full or the emitter has shut down
    /// the event is dropped and the drop is logged.
    pub fn publish(&self, event: DomainEvent) {
        let event_type = event.event_type;
        let user_id = event.user_id;

        match self.tx.try_send(event) {
            Ok(()) => {
                tracing::debug!(event_type = %event_type, user_id, "Event queued");
                EmitterMetrics::record_queue_depth(self.queue_depth());
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(event_type = %event_type, user_id, "Event queue full, dropping event");
                EmitterMetrics::record_dropped("queue_full");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!(event_type = %event_type, user_id, "Event emitter closed, dropping event");
                EmitterMetrics::record_dropped("closed");
            }
        }
    }

    /// Number of events waiting to be dispatched.
    #[must_use]
    pub fn queue_depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

impl EmitterHandle {
    /// Stop accepting events and drain the queue.
    ///
    /// # Errors
    ///
    /// Returns [`EmitterError::DrainTimeout`] if draining takes longer than
    /// `timeout` (remaining deliveries are aborted), or
    /// [`EmitterError::Dispatcher`] if the dispatcher task failed.
    pub async fn shutdown(self, timeout: Duration) -> Result<(), EmitterError> {
        tracing::info!(timeout_ms = timeout.as_millis(), "Draining event emitter");
        // Err only when the dispatcher already exited.
        let _ = self.shutdown.send(true);

        let mut dispatcher = self.dispatcher;
        match tokio::time::timeout(timeout, &mut dispatcher).await {
            Ok(joined) => joined.map_err(EmitterError::from),
            Err(_) => {
                dispatcher.abort();
                Err(EmitterError::DrainTimeout(timeout))
            }
        }
    }
}

struct Dispatcher {
    rx: mpsc::Receiver<DomainEvent>,
    shutdown: watch::Receiver<bool>,
    sink: Arc<dyn EventSink>,
    topic: Arc<str>,
    permits: Arc<Semaphore>,
    deliveries: JoinSet<()>,
}

impl Dispatcher {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                Ok(()) = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        break;
                    }
                }
                event = self.rx.recv() => match event {
                    Some(event) => self.dispatch(event).await,
                    // Every EventEmitter was dropped.
                    None => break,
                },
                Some(joined) = self.deliveries.join_next(), if !self.deliveries.is_empty() => {
                    log_join(joined);
                }
            }
        }

        self.rx.close();
        let mut drained = 0usize;
        while let Some(event) = self.rx.recv().await {
            self.dispatch(event).await;
            drained += 1;
        }
        while let Some(joined) = self.deliveries.join_next().await {
            log_join(joined);
        }

        tracing::info!(drained, "Event emitter drained");
    }

    async fn dispatch(&mut self, event: DomainEvent) {
        // The semaphore is never closed.
        let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
            return;
        };
        // The select loop only joins when the queue is idle.
        self.reap_finished();
        EmitterMetrics::record_queue_depth(self.rx.len());
        self.deliveries.spawn(deliver(
            Arc::clone(&self.sink),
            Arc::clone(&self.topic),
            event,
            permit,
        ));
    }

    fn reap_finished(&mut self) {
        while let Some(joined) = self.deliveries.try_join_next() {
            log_join(joined);
        }
    }
}

async fn deliver(
    sink: Arc<dyn EventSink>,
    topic: Arc<str>,
    event: DomainEvent,
    _permit: OwnedSemaphorePermit,
) {
    let started = Instant::now();
    match sink.publish(&topic, &event).await {
        Ok(()) => {
            tracing::info!(
                topic = %topic,
                event_type = %event.event_type,
                user_id = event.user_id,
                "Published domain event"
            );
            EmitterMetrics::record_published(started.elapsed());
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                topic = %topic,
                event_type = %event.event_type,
                user_id = event.user_id,
                correlation_id = event.correlation_id.as_deref().unwrap_or_default(),
                "Failed to publish domain event"
            );
            EmitterMetrics::record_failed();
        }
    }
}

fn log_join(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        tracing::error!(error = %e, "Event delivery task failed");
        EmitterMetrics::record_failed();
    }
}
