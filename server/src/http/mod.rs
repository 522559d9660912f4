//! HTTP server wiring.
//!
//! - [`state`]: shared handler state
//! - [`health`]: liveness, readiness and metrics endpoints
//! - [`routes`]: the router with its protection and middleware layers

pub mod health;
pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
