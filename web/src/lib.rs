//! Axum integration for the student portal identity service.
//!
//! This crate holds the HTTP-facing pieces that do not depend on the
//! service's business logic:
//!
//! - [`middleware::protect`]: authentication then authorization on a router
//! - [`extractors`]: typed access to claims, client info and JSON bodies
//! - [`AppError`]: maps `ServiceError` to status codes and a JSON body
//! - [`correlate`]: `X-Correlation-ID` propagation into logs and events
//!
//! # Request Flow
//!
//! ```text
//! request ─▶ correlation ─▶ authenticate ─▶ authorize ─▶ handler ─▶ response
//!                             │ 401           │ 403
//!                             ▼               ▼
//!                          AppError        AppError
//! ```
//!
//! Public routes skip both interceptors; protected routes get them through
//! [`middleware::protect`].

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod middleware;

pub use error::AppError;
pub use extractors::{ApiJson, AuthenticatedUser, ClientInfo, ClientIp, CorrelationId, UserAgent};
pub use middleware::{CORRELATION_ID_HEADER, correlate, protect};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
