//! # Student Portal Runtime
//!
//! Background machinery that outlives individual requests.
//!
//! ## Core Components
//!
//! - **Event Emitter**: accepts domain events from business operations without
//!   blocking them and delivers them to an [`EventSink`] on its own tasks
//! - **Metrics**: Prometheus recorder and metric descriptions
//!
//! ## Example
//!
//! ```ignore
//! use portal_runtime::{EmitterConfig, EventEmitter};
//!
//! let (emitter, handle) = EventEmitter::start(sink, EmitterConfig::default());
//!
//! // Request path: returns immediately, never fails.
//! emitter.publish(event);
//!
//! // Shutdown path: stop intake, drain what is queued.
//! handle.shutdown(Duration::from_secs(5)).await?;
//! ```
//!
//! [`EventSink`]: portal_core::EventSink

pub mod emitter;

/// Prometheus metrics for observability
pub mod metrics;

pub use emitter::{
    EmitterConfig, EmitterError, EmitterHandle, EventEmitter, MAX_IN_FLIGHT, MAX_QUEUE_CAPACITY,
};
