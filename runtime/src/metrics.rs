//! Prometheus metrics for observability and monitoring.
//!
//! This module provides metric collection for:
//! - Event emitter publish outcomes, drops and queue depth
//! - Authentication and authorization rejections
//!
//! # Example
//!
//! ```rust,no_run
//! use portal_runtime::metrics::MetricsRecorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let recorder = MetricsRecorder::install()?;
//!
//! // Serve `recorder.render()` from a `/metrics` route.
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Installed Prometheus recorder.
///
/// Rendering is cheap and safe from any thread; the HTTP layer exposes it as
/// a plain-text route.
#[derive(Clone)]
pub struct MetricsRecorder {
    handle: PrometheusHandle,
}

impl MetricsRecorder {
    /// Install the global Prometheus recorder and register metric descriptions.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Install`] if a global recorder is already
    /// installed, which happens when this is called twice in one process.
    pub fn install() -> Result<Self, MetricsError> {
        let handle = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?
            .install_recorder()
            .map_err(|e| MetricsError::Install(e.to_string()))?;

        register_metrics();
        tracing::info!("Prometheus metrics recorder installed");
        Ok(Self { handle })
    }

    /// Render current metrics in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl std::fmt::Debug for MetricsRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRecorder").finish_non_exhaustive()
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!(
        "portal_events_published_total",
        "Total number of domain events delivered to the broker"
    );
    describe_counter!(
        "portal_events_failed_total",
        "Total number of domain event deliveries that failed"
    );
    describe_counter!(
        "portal_events_dropped_total",
        "Total number of domain events dropped before delivery"
    );
    describe_gauge!(
        "portal_event_queue_depth",
        "Number of domain events waiting to be dispatched"
    );
    describe_histogram!(
        "portal_event_publish_duration_seconds",
        "Time taken to deliver a domain event"
    );
    describe_counter!(
        "portal_auth_rejections_total",
        "Total number of requests rejected by the authentication interceptor"
    );
    describe_counter!(
        "portal_authz_denials_total",
        "Total number of requests rejected by the authorization interceptor"
    );
}

/// Event emitter metrics recorder.
pub struct EmitterMetrics;

impl EmitterMetrics {
    /// Record a delivered event.
    pub fn record_published(duration: Duration) {
        counter!("portal_events_published_total").increment(1);
        histogram!("portal_event_publish_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a failed delivery.
    pub fn record_failed() {
        counter!("portal_events_failed_total").increment(1);
    }

    /// Record how many events are waiting in the queue.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_queue_depth(depth: usize) {
        gauge!("portal_event_queue_depth").set(depth as f64);
    }

    /// Record an event dropped before delivery.
    pub fn record_dropped(reason: &'static str) {
        counter!("portal_events_dropped_total", "reason" => reason).increment(1);
    }
}

/// Interceptor metrics recorder.
pub struct AuthMetrics;

impl AuthMetrics {
    /// Record a rejected credential. `reason` is kept server-side only.
    pub fn record_rejection(reason: &'static str) {
        counter!("portal_auth_rejections_total", "reason" => reason).increment(1);
    }

    /// Record an authorization denial.
    pub fn record_denial() {
        counter!("portal_authz_denials_total").increment(1);
    }
}
