//! Configuration management for the identity service.
//!
//! Loads configuration from environment variables (after `.env`, when
//! present) with defaults suitable for local development. The only required
//! variable is `JWT_SECRET`.

use portal_auth::AuthConfig;
use portal_auth::config::{AuthConfigError, DEFAULT_TTL};
use portal_core::USER_EVENTS_TOPIC;
use portal_runtime::EmitterConfig;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors that stop the service from starting.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `JWT_SECRET` is unset or empty.
    #[error("JWT_SECRET must be set to a non-empty value")]
    MissingSecret,

    /// The credential settings were rejected.
    #[error("Invalid auth configuration: {0}")]
    Auth(#[from] AuthConfigError),
}

/// Application configuration, built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct Config {
    /// `PostgreSQL` settings
    pub database: DatabaseConfig,
    /// HTTP server settings
    pub server: ServerConfig,
    /// Credential signing settings
    pub auth: AuthConfig,
    /// Kafka/Redpanda settings
    pub kafka: KafkaConfig,
    /// Event emitter tuning
    pub emitter: EmitterConfig,
}

/// `PostgreSQL` configuration.
#[derive(Clone)]
pub struct DatabaseConfig {
    /// Connection URL (may carry a password)
    pub url: String,
    /// Maximum pool size
    pub max_connections: u32,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Deployment environment; selects the log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Human-readable logs
    Development,
    /// JSON logs
    Production,
}

impl Environment {
    /// Read `APP_ENV`, defaulting to development.
    ///
    /// Available before the rest of the configuration so logging can be set
    /// up first.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var("APP_ENV").map_or(Self::Development, |value| Self::parse(&value))
    }

    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("production") {
            Self::Production
        } else {
            Self::Development
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Grace period for in-flight requests on shutdown
    pub shutdown_grace: Duration,
    /// Deployment environment
    pub environment: Environment,
}

impl ServerConfig {
    /// `host:port` to bind.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Kafka/Redpanda configuration.
#[derive(Debug, Clone)]
pub struct KafkaConfig {
    /// Broker addresses (comma-separated)
    pub brokers: String,
    /// Topic user events are published to and consumed from
    pub topic: String,
    /// Consumer group of the logging consumer
    pub consumer_group: String,
    /// Partition count used when creating the topic
    pub partitions: i32,
    /// Replication factor used when creating the topic
    pub replication: i32,
}

impl Config {
    /// Load `.env` (if any) and read the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSecret`] when `JWT_SECRET` is unset or
    /// empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!(error = %e, "No .env file loaded");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`Config::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_url = lookup("DATABASE_URL").unwrap_or_else(|| {
            format!(
                "postgres://{}:{}@{}:{}/{}?sslmode={}",
                var("DB_USER", "postgres"),
                var("DB_PASSWORD", "postgres"),
                var("DB_HOST", "localhost"),
                var("DB_PORT", "5432"),
                var("DB_NAME", "student_portal"),
                var("DB_SSLMODE", "disable"),
            )
        });

        let secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingSecret)?;
        let ttl = match lookup("JWT_EXPIRY") {
            None => DEFAULT_TTL,
            Some(raw) => parse_duration(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "Invalid JWT_EXPIRY, defaulting to 24h");
                DEFAULT_TTL
            }),
        };
        let topic = var("KAFKA_TOPIC", USER_EVENTS_TOPIC);

        Ok(Self {
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10),
            },
            server: ServerConfig {
                host: var("SERVER_HOST", "0.0.0.0"),
                port: parse_or(&lookup, "SERVER_PORT", 8080),
                shutdown_grace: Duration::from_secs(parse_or(&lookup, "SHUTDOWN_GRACE_SECS", 5)),
                environment: Environment::parse(&var("APP_ENV", "development")),
            },
            auth: AuthConfig::new(secret, ttl)?,
            kafka: KafkaConfig {
                brokers: var("KAFKA_BROKER", "localhost:9092"),
                topic: topic.clone(),
                consumer_group: var("KAFKA_CONSUMER_GROUP", "student-portal-group"),
                partitions: parse_or(&lookup, "KAFKA_TOPIC_PARTITIONS", 1),
                replication: parse_or(&lookup, "KAFKA_TOPIC_REPLICATION", 1),
            },
            emitter: EmitterConfig {
                topic,
                queue_capacity: parse_or(&lookup, "EVENT_QUEUE_CAPACITY", 1024),
                max_in_flight: parse_or(&lookup, "EVENT_MAX_IN_FLIGHT", 32),
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, default = %default, "Invalid value, using default");
            default
        }),
    }
}

/// Parse `"24h"`, `"90m"`, `"1h30m"`, `"7d"`, `"45s"` or plain seconds.
///
/// Returns `None` for anything unparseable or not strictly positive.
fn parse_duration(raw: &str) -> Option<chrono::Duration> {
    let raw = raw.trim();
    if let Ok(seconds) = raw.parse::<i64>() {
        return if seconds > 0 {
            chrono::Duration::try_seconds(seconds)
        } else {
            None
        };
    }

    let mut total = chrono::Duration::zero();
    let mut digits = String::new();
    for c in raw.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let amount: i64 = digits.parse().ok()?;
        digits.clear();
        let part = match c {
            's' => chrono::Duration::try_seconds(amount)?,
            'm' => chrono::Duration::try_minutes(amount)?,
            'h' => chrono::Duration::try_hours(amount)?,
            'd' => chrono::Duration::try_days(amount)?,
            _ => return None,
        };
        total = total.checked_add(&part)?;
    }

    (digits.is_empty() && total > chrono::Duration::zero()).then_some(total)
}
