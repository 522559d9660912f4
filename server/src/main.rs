//! Student portal identity service.
//!
//! # Usage
//!
//! ```bash
//! # Start Postgres and Redpanda
//! docker compose up -d
//!
//! JWT_SECRET=change-me cargo run --bin portal-server
//! ```

use anyhow::Context;
use portal_runtime::metrics::MetricsRecorder;
use portal_server::config::Environment;
use portal_server::{Application, Config, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is normal outside local development.
    let _ = dotenvy::dotenv();
    telemetry::init(Environment::from_env());

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(
        address = %config.server.bind_address(),
        brokers = %config.kafka.brokers,
        topic = %config.kafka.topic,
        "Configuration loaded"
    );

    let metrics = match MetricsRecorder::install() {
        Ok(recorder) => Some(recorder),
        Err(e) => {
            tracing::warn!(error = %e, "Metrics disabled");
            None
        }
    };

    let app = Application::build(config, metrics)
        .await
        .context("Failed to start application")?;
    app.run().await?;
    Ok(())
}
