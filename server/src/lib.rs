//! # Student Portal Server
//!
//! Wires the identity service together: configuration, the user service,
//! the HTTP API and the process lifecycle.
//!
//! ## Modules
//!
//! - [`config`]: environment-driven configuration
//! - [`telemetry`]: tracing subscriber setup
//! - [`models`]: request and response bodies
//! - [`service`]: user operations (register, login, profile, admin)
//! - [`api`]: axum handlers
//! - [`http`]: application state, health checks and the router
//! - [`lifecycle`]: ordered startup and shutdown

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod models;
pub mod service;
pub mod telemetry;

pub use config::{Config, ConfigError};
pub use http::{AppState, build_router};
pub use lifecycle::Application;
pub use service::UserService;
