use portal_core::event_sink::PublishFuture;
use portal_core::{DomainEvent, EventSink, EventSinkError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Event sink that records every delivered event.
///
/// With [`with_delay`](Self::with_delay) each publish sleeps first, which is
/// useful for exercising shutdown drains and in-flight limits.
#[derive(Debug, Clone, Default)]
pub struct RecordingEventSink {
    events: Arc<Mutex<Vec<(String, DomainEvent)>>>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
    notify: Arc<Notify>,
    delay: Option<Duration>,
}

impl RecordingEventSink {
    /// Create a sink that records immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink that sleeps for `delay` before recording each event.
    #[must_use]
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Snapshot of delivered events.
    #[must_use]
    pub fn events(&self) -> Vec<DomainEvent> {
        self.events
            .lock()
            .map(|events| events.iter().map(|(_, e)| e.clone()).collect())
            .unwrap_or_default()
    }

    /// Topics events were delivered to, in delivery order.
    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        self.events
            .lock()
            .map(|events| events.iter().map(|(t, _)| t.clone()).collect())
            .unwrap_or_default()
    }

    /// Highest number of concurrent publishes observed.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` events were delivered or `timeout` elapses,
    /// then return what was delivered.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<DomainEvent> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            let events = self.events();
            if events.len() >= count {
                return events;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.events();
            }
        }
    }
}

impl EventSink for RecordingEventSink {
    fn publish<'a>(&'a self, topic: &'a str, event: &'a DomainEvent) -> PublishFuture<'a> {
        Box::pin(async move {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let recorded = self
                .events
                .lock()
                .map(|mut events| events.push((topic.to_string(), event.clone())))
                .map_err(|_| EventSinkError::Closed);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.notify.notify_waiters();

            recorded
        })
    }
}

/// Event sink that rejects every publish.
#[derive(Debug, Clone, Default)]
pub struct FailingEventSink {
    attempts: Arc<AtomicUsize>,
}

impl FailingEventSink {
    /// Create a failing sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of publish attempts made against this sink.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl EventSink for FailingEventSink {
    fn publish<'a>(&'a self, topic: &'a str, _event: &'a DomainEvent) -> PublishFuture<'a> {
        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(EventSinkError::PublishFailed {
                topic: topic.to_string(),
                reason: "broker unavailable".to_string(),
            })
        })
    }
}
