//! Axum middleware: correlation IDs and the authentication/authorization
//! interceptors.

mod auth;
mod correlation;

pub use auth::{authenticate, authorize, protect};
pub(crate) use correlation::inbound_id;
pub use correlation::{CORRELATION_ID_HEADER, correlate};
