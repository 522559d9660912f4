//! Application lifecycle: ordered startup and graceful shutdown.
//!
//! # Startup
//!
//! 1. Connect to Postgres and apply migrations
//! 2. Make sure the event topic exists on the broker
//! 3. Create the producer and start the event emitter
//! 4. Start the event consumer
//! 5. Bind the HTTP listener
//!
//! Any failure aborts startup before the listener is bound.
//!
//! # Shutdown
//!
//! On Ctrl+C or SIGTERM:
//! 1. The HTTP server stops accepting connections
//! 2. In-flight requests get the configured grace period, then the server
//!    task is aborted
//! 3. The event consumer is closed
//! 4. The emitter drains its queue and the producer is flushed
//! 5. The database pool is closed
//!
//! Every step logs its outcome; a failing step never blocks the next one.

use crate::config::Config;
use crate::http::{AppState, build_router};
use crate::service::UserService;
use portal_auth::{CredentialAuthority, SecretHasher};
use portal_core::environment::SystemClock;
use portal_core::{EventSinkError, UserRepository};
use portal_postgres::{PostgresError, PostgresUserRepository};
use portal_redpanda::{
    ConsumerError, EventConsumer, RedpandaEventSink, TopicError, TopicSpec, ensure_topics,
};
use portal_runtime::metrics::MetricsRecorder;
use portal_runtime::{EmitterHandle, EventEmitter};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

const TOPIC_SETUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that stop the application.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Database connection or migration failed.
    #[error("Database startup failed: {0}")]
    Database(#[from] PostgresError),

    /// The event topic could not be created or verified.
    #[error("Broker topic setup failed: {0}")]
    Topics(#[from] TopicError),

    /// The event producer could not be created.
    #[error("Event producer setup failed: {0}")]
    Producer(#[from] EventSinkError),

    /// The event consumer could not be started.
    #[error("Event consumer setup failed: {0}")]
    Consumer(#[from] ConsumerError),

    /// Binding the listener failed.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        /// Requested address
        address: String,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The HTTP server stopped on its own.
    #[error("HTTP server failed: {0}")]
    Server(String),
}

/// A fully started application, ready to serve.
pub struct Application {
    listener: TcpListener,
    router: axum::Router,
    repository: PostgresUserRepository,
    sink: RedpandaEventSink,
    emitter: EmitterHandle,
    consumer: EventConsumer,
    config: Arc<Config>,
}

impl Application {
    /// Start every dependency in order and bind the listener.
    ///
    /// # Errors
    ///
    /// Returns the first [`LifecycleError`] encountered; nothing is served
    /// in that case.
    pub async fn build(
        config: Config,
        metrics: Option<MetricsRecorder>,
    ) -> Result<Self, LifecycleError> {
        let config = Arc::new(config);

        info!("Connecting to database");
        let pool =
            portal_postgres::connect(&config.database.url, config.database.max_connections).await?;
        let repository = PostgresUserRepository::new(pool);
        repository.migrate().await?;

        info!(brokers = %config.kafka.brokers, topic = %config.kafka.topic, "Ensuring event topic");
        let spec = TopicSpec::new(config.kafka.topic.clone())
            .partitions(config.kafka.partitions)
            .replication(config.kafka.replication);
        ensure_topics(&config.kafka.brokers, &[spec], TOPIC_SETUP_TIMEOUT).await?;

        let sink = RedpandaEventSink::new(&config.kafka.brokers)?;
        let (emitter, emitter_handle) =
            EventEmitter::start(Arc::new(sink.clone()), config.emitter.clone());

        let clock = Arc::new(SystemClock);
        let authority = Arc::new(CredentialAuthority::new(&config.auth, clock.clone()));
        let repository_handle: Arc<dyn UserRepository> = Arc::new(repository.clone());
        let service = UserService::new(
            Arc::clone(&repository_handle),
            Arc::new(SecretHasher::new()),
            Arc::clone(&authority),
            emitter,
            clock,
        );

        let mut state = AppState::new(service, authority, repository_handle);
        if let Some(recorder) = metrics {
            state = state.with_metrics(recorder);
        }
        let router = build_router(state);

        let consumer = EventConsumer::start(
            &config.kafka.brokers,
            &config.kafka.consumer_group,
            &config.kafka.topic,
        )?;

        let address = config.server.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| LifecycleError::Bind { address, source })?;

        Ok(Self {
            listener,
            router,
            repository,
            sink,
            emitter: emitter_handle,
            consumer,
            config,
        })
    }

    /// Address the listener is bound to.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the socket has no local address.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until a shutdown signal, then shut everything down in order.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Server`] if the server stopped without a
    /// signal. Shutdown of the remaining components still runs.
    pub async fn run(self) -> Result<(), LifecycleError> {
        let Self {
            listener,
            router,
            repository,
            sink,
            emitter,
            consumer,
            config,
        } = self;
        let grace = config.server.shutdown_grace;

        if let Ok(address) = listener.local_addr() {
            info!(%address, "HTTP server listening");
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let mut server = tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                // Err means the sender is gone, which also means stop.
                let _ = stop_rx.wait_for(|stop| *stop).await;
            })
            .await
        });

        let early_exit = tokio::select! {
            () = shutdown_signal() => None,
            joined = &mut server => Some(joined),
        };

        let outcome = match early_exit {
            None => {
                info!("Shutdown signal received, stopping HTTP server");
                let _ = stop_tx.send(true);
                match tokio::time::timeout(grace, &mut server).await {
                    Ok(Ok(Ok(()))) => info!("HTTP server stopped gracefully"),
                    Ok(Ok(Err(e))) => warn!(error = %e, "HTTP server stopped with error"),
                    Ok(Err(e)) => warn!(error = %e, "HTTP server task failed"),
                    Err(_) => {
                        warn!(
                            grace_ms = grace.as_millis(),
                            "Grace period expired, aborting in-flight requests"
                        );
                        server.abort();
                    }
                }
                Ok(())
            }
            Some(joined) => {
                let reason = match joined {
                    Ok(Ok(())) => "server exited".to_string(),
                    Ok(Err(e)) => e.to_string(),
                    Err(e) => e.to_string(),
                };
                error!(reason = %reason, "HTTP server stopped unexpectedly");
                Err(LifecycleError::Server(reason))
            }
        };

        match consumer.close(grace).await {
            Ok(()) => info!("Event consumer closed"),
            Err(e) => warn!(error = %e, "Event consumer did not close cleanly"),
        }

        match emitter.shutdown(grace).await {
            Ok(()) => info!("Event emitter drained"),
            Err(e) => warn!(error = %e, "Event emitter did not drain cleanly"),
        }

        match sink.flush(grace).await {
            Ok(()) => info!("Event producer flushed"),
            Err(e) => warn!(error = %e, "Event producer flush failed"),
        }

        repository.close().await;
        info!("Database pool closed");

        info!("Shutdown complete");
        outcome
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("listener", &self.listener.local_addr().ok())
            .finish_non_exhaustive()
    }
}

/// Resolve on Ctrl+C or SIGTERM.
///
/// A signal handler that cannot be installed is logged and never fires; the
/// other one still does.
pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C signal"),
        () = terminate => info!("Received SIGTERM signal"),
    }
}
