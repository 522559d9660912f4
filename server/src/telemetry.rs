//! Tracing subscriber setup.

use crate::config::Environment;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "portal_server=info,portal_web=info,portal_runtime=info,portal_redpanda=info,tower_http=info,sqlx=warn";

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the default filter. Production emits JSON lines;
/// everything else gets the human-readable formatter.
pub fn init(environment: Environment) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match environment {
        Environment::Production => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init(),
        Environment::Development => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };

    if let Err(e) = installed {
        tracing::warn!(error = %e, "Tracing subscriber already installed");
    }
}
