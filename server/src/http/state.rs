//! Application state shared across all HTTP handlers.

use crate::service::UserService;
use portal_auth::CredentialAuthority;
use portal_core::UserRepository;
use portal_runtime::metrics::MetricsRecorder;
use std::sync::Arc;

/// Shared handler state. Cloned per request; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// User operations
    pub service: UserService,

    /// Verifies bearer credentials on protected routes
    pub authority: Arc<CredentialAuthority>,

    /// Used directly only by the readiness probe
    pub repository: Arc<dyn UserRepository>,

    /// Prometheus recorder backing `/metrics`, if one was installed
    pub metrics: Option<MetricsRecorder>,
}

impl AppState {
    /// Create application state.
    #[must_use]
    pub fn new(
        service: UserService,
        authority: Arc<CredentialAuthority>,
        repository: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            service,
            authority,
            repository,
            metrics: None,
        }
    }

    /// Serve `recorder` from `/metrics`.
    #[must_use]
    pub fn with_metrics(mut self, recorder: MetricsRecorder) -> Self {
        self.metrics = Some(recorder);
        self
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("metrics", &self.metrics.is_some())
            .finish_non_exhaustive()
    }
}
