//! Identity lifecycle domain events.
//!
//! A [`DomainEvent`] is created the moment a business operation (register,
//! login, profile update) completes successfully. It is immutable and is
//! handed to the event emitter, which delivers it on a best-effort basis.
//!
//! # Wire Format
//!
//! Events are published as JSON, keyed by the subject's email:
//!
//! ```json
//! {
//!   "event_type": "user_register",
//!   "user_id": 42,
//!   "email": "ada@example.com",
//!   "name": "Ada",
//!   "role": "student",
//!   "timestamp": "2025-01-01T00:00:00Z",
//!   "ip_address": "203.0.113.1",
//!   "user_agent": "curl/8.0",
//!   "correlation_id": "6f1c2a0e-8d0b-4a57-9a55-2f0c1b7e4d21"
//! }
//! ```
//!
//! `ip_address`, `user_agent` and `correlation_id` are omitted when unknown.
//! The correlation ID is the `X-Correlation-ID` of the request that produced
//! the event.

use crate::repository::User;
use crate::role::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of identity lifecycle change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A new identity record was created.
    UserRegister,
    /// A caller exchanged valid credentials for a token.
    UserLogin,
    /// An identity record was modified (by its owner or an admin).
    UserUpdate,
}

impl EventType {
    /// Stable string identifier used on the wire and in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UserRegister => "user_register",
            Self::UserLogin => "user_login",
            Self::UserUpdate => "user_update",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request metadata optionally attached to an event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMetadata {
    /// Client IP address, if known.
    pub ip_address: Option<String>,
    /// Client user agent, if known.
    pub user_agent: Option<String>,
    /// Correlation ID of the originating request, if known.
    pub correlation_id: Option<String>,
}

/// A fact about an identity lifecycle change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainEvent {
    /// What happened.
    pub event_type: EventType,
    /// Subject identity id.
    pub user_id: i64,
    /// Subject email (also the message key).
    pub email: String,
    /// Subject display name.
    pub name: String,
    /// Subject role.
    pub role: Role,
    /// When the business operation completed.
    pub timestamp: DateTime<Utc>,
    /// Client IP address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// Client user agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Correlation ID of the originating request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl DomainEvent {
    /// Build an event describing `user` at `timestamp`.
    #[must_use]
    pub fn for_user(
        event_type: EventType,
        user: &User,
        timestamp: DateTime<Utc>,
        metadata: RequestMetadata,
    ) -> Self {
        Self {
            event_type,
            user_id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            timestamp,
            ip_address: metadata.ip_address,
            user_agent: metadata.user_agent,
            correlation_id: metadata.correlation_id,
        }
    }

    /// Message key used for partitioning.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.email
    }
}
