//! Event emitter delivery, backpressure and shutdown behaviour.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::Utc;
use portal_core::{DomainEvent, EventType, Role};
use portal_runtime::{EmitterConfig, EmitterError, EventEmitter};
use portal_testing::{FailingEventSink, RecordingEventSink};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn event(event_type: EventType, user_id: i64) -> DomainEvent {
    DomainEvent {
        event_type,
        user_id,
        email: format!("user{user_id}@example.com"),
        name: format!("User {user_id}"),
        role: Role::Student,
        timestamp: Utc::now(),
        ip_address: Some("203.0.113.7".to_string()),
        user_agent: None,
        correlation_id: None,
    }
}

fn config(queue_capacity: usize, max_in_flight: usize) -> EmitterConfig {
    EmitterConfig {
        topic: "user-auth-events".to_string(),
        queue_capacity,
        max_in_flight,
    }
}

#[tokio::test]
async fn delivers_events_to_configured_topic() {
    portal_testing::init_test_tracing();
    let sink = RecordingEventSink::new();
    let (emitter, handle) = EventEmitter::start(Arc::new(sink.clone()), config(16, 4));

    emitter.publish(event(EventType::UserRegister, 1));
    emitter.publish(event(EventType::UserLogin, 1));

    let delivered = sink.wait_for(2, Duration::from_secs(2)).await;
    assert_eq!(delivered.len(), 2);
    assert!(sink.topics().iter().all(|t| t == "user-auth-events"));

    handle.shutdown(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test]
async fn publish_returns_without_waiting_for_delivery() {
    let sink = RecordingEventSink::with_delay(Duration::from_millis(500));
    let (emitter, handle) = EventEmitter::start(Arc::new(sink.clone()), config(16, 4));

    let started = Instant::now();
    for id in 0..5 {
        emitter.publish(event(EventType::UserLogin, id));
    }
    assert!(started.elapsed() < Duration::from_millis(100));
    assert!(sink.events().is_empty());

    handle.shutdown(Duration::from_secs(5)).await.unwrap();
    assert_eq!(sink.events().len(), 5);
}

#[tokio::test]
async fn failed_delivery_is_attempted_once_and_absorbed() {
    let sink = FailingEventSink::new();
    let (emitter, handle) = EventEmitter::start(Arc::new(sink.clone()), config(16, 4));

    for id in 0..3 {
        emitter.publish(event(EventType::UserUpdate, id));
    }

    handle.shutdown(Duration::from_secs(1)).await.unwrap();
    assert_eq!(sink.attempts(), 3);
}

#[tokio::test]
async fn full_queue_drops_new_events() {
    let sink = RecordingEventSink::with_delay(Duration::from_millis(200));
    let (emitter, handle) = EventEmitter::start(Arc::new(sink.clone()), config(1, 1));

    for id in 0..10 {
        emitter.publish(event(EventType::UserLogin, id));
    }

    handle.shutdown(Duration::from_secs(5)).await.unwrap();
    let delivered = sink.events().len();
    assert!(delivered >= 1);
    assert!(delivered <= 3, "delivered {delivered} events through a queue of one");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_deliveries_never_exceed_limit() {
    let sink = RecordingEventSink::with_delay(Duration::from_millis(30));
    let (emitter, handle) = EventEmitter::start(Arc::new(sink.clone()), config(64, 2));

    for id in 0..12 {
        emitter.publish(event(EventType::UserLogin, id));
    }

    let delivered = sink.wait_for(12, Duration::from_secs(5)).await;
    assert_eq!(delivered.len(), 12);
    assert!(sink.peak_in_flight() <= 2);

    handle.shutdown(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test]
async fn shutdown_drains_queued_events_then_rejects_new_ones() {
    let sink = RecordingEventSink::with_delay(Duration::from_millis(10));
    let (emitter, handle) = EventEmitter::start(Arc::new(sink.clone()), config(16, 1));

    for id in 0..5 {
        emitter.publish(event(EventType::UserRegister, id));
    }
    handle.shutdown(Duration::from_secs(5)).await.unwrap();
    assert_eq!(sink.events().len(), 5);

    emitter.publish(event(EventType::UserRegister, 99));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(sink.events().len(), 5);
}

#[tokio::test]
async fn shutdown_gives_up_after_timeout() {
    let sink = RecordingEventSink::with_delay(Duration::from_secs(10));
    let (emitter, handle) = EventEmitter::start(Arc::new(sink.clone()), config(16, 1));

    emitter.publish(event(EventType::UserLogin, 1));
    tokio::task::yield_now().await;

    let err = handle.shutdown(Duration::from_millis(50)).await.unwrap_err();
    assert!(matches!(err, EmitterError::DrainTimeout(_)));
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn aborting_the_publishing_task_does_not_cancel_delivery() {
    let sink = RecordingEventSink::with_delay(Duration::from_millis(50));
    let (emitter, handle) = EventEmitter::start(Arc::new(sink.clone()), config(16, 4));

    let request = {
        let emitter = emitter.clone();
        tokio::spawn(async move {
            emitter.publish(event(EventType::UserLogin, 7));
            // Simulates a request still running when the client disconnects.
            tokio::time::sleep(Duration::from_secs(60)).await;
        })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;
    request.abort();

    let delivered = sink.wait_for(1, Duration::from_secs(2)).await;
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].user_id, 7);

    handle.shutdown(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sustained_load_keeps_delivering_in_order_of_arrival() {
    let sink = RecordingEventSink::with_delay(Duration::from_millis(2));
    let (emitter, handle) = EventEmitter::start(Arc::new(sink.clone()), config(256, 1));

    // Keep the queue non-empty for the whole burst.
    for id in 0..200 {
        emitter.publish(event(EventType::UserLogin, id));
        if id % 20 == 0 {
            tokio::task::yield_now().await;
        }
    }

    let delivered = sink.wait_for(200, Duration::from_secs(10)).await;
    assert_eq!(delivered.len(), 200);
    assert_eq!(sink.peak_in_flight(), 1);
    let ids: Vec<i64> = delivered.iter().map(|e| e.user_id).collect();
    assert_eq!(ids, (0..200).collect::<Vec<_>>());

    handle.shutdown(Duration::from_secs(1)).await.unwrap();
}
