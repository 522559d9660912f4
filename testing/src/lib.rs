//! # Student Portal Testing
//!
//! Test doubles for the capability traits in `portal-core`:
//!
//! - [`FixedClock`]: deterministic, manually advanced time
//! - [`InMemoryUserRepository`]: `HashMap`-backed repository with the same
//!   conflict and not-found semantics as the Postgres one
//! - [`RecordingEventSink`]: captures delivered events, optionally slowly
//! - [`FailingEventSink`]: rejects every publish
//!
//! ## Example
//!
//! ```ignore
//! use portal_testing::{InMemoryUserRepository, RecordingEventSink, test_clock};
//!
//! #[tokio::test]
//! async fn registration_emits_event() {
//!     let sink = RecordingEventSink::new();
//!     let service = build_service(InMemoryUserRepository::new(), sink.clone(), test_clock());
//!
//!     service.register(request, metadata).await.unwrap();
//!
//!     let events = sink.wait_for(1, Duration::from_secs(1)).await;
//!     assert_eq!(events[0].event_type, EventType::UserRegister);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod mocks;

pub use mocks::{
    FailingEventSink, FixedClock, InMemoryUserRepository, RecordingEventSink, test_clock,
};

/// Install a test-friendly tracing subscriber once per process.
///
/// Output is captured by the test harness and only shown for failing tests.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}
