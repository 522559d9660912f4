//! HTTP handlers for the user API.
//!
//! - [`auth`]: public registration and login
//! - [`users`]: the caller's own profile and admin user management
//! - [`pagination`]: `page`/`limit` query handling for listings

pub mod auth;
pub mod pagination;
pub mod users;
