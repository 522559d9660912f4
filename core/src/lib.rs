//! # Student Portal Core
//!
//! Domain types and capability traits shared by every crate in the
//! student portal identity service.
//!
//! The service is split along the lines of its collaborators:
//!
//! ```text
//! ┌──────────────┐    ┌────────────────────┐    ┌──────────────────┐
//! │ HTTP request │ ─▶ │ Authentication     │ ─▶ │ Authorization    │
//! └──────────────┘    │ (Claims)           │    │ (RoleSet)        │
//!                     └────────────────────┘    └────────┬─────────┘
//!                                                        │
//!                     ┌────────────────────┐    ┌────────▼─────────┐
//!                     │ EventSink          │ ◀─ │ UserRepository   │
//!                     │ (fire-and-forget)  │    │ (business op)    │
//!                     └────────────────────┘    └──────────────────┘
//! ```
//!
//! This crate holds only the *shapes*: [`role::Role`], [`claims::Claims`],
//! [`event::DomainEvent`], the [`repository::UserRepository`] and
//! [`event_sink::EventSink`] capability traits, the [`environment::Clock`]
//! abstraction and the externally visible [`error::ServiceError`] taxonomy.
//! Concrete implementations live in the `portal-auth`, `portal-postgres`,
//! `portal-redpanda` and `portal-testing` crates.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod claims;
pub mod error;
pub mod event;
pub mod event_sink;
pub mod repository;
pub mod role;

/// Environment traits injected into components at construction time.
///
/// Components never read the wall clock directly; they receive a [`Clock`]
/// so credential expiry can be tested deterministically.
///
/// [`Clock`]: environment::Clock
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use portal_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = clock.now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

pub use claims::Claims;
pub use error::ServiceError;
pub use event::{DomainEvent, EventType, RequestMetadata};
pub use event_sink::{EventSink, EventSinkError};
pub use repository::{NewUser, RepositoryError, User, UserRepository, UserResponse};
pub use role::{Role, RoleSet};

/// Topic carrying identity lifecycle events.
pub const USER_EVENTS_TOPIC: &str = "user-auth-events";
