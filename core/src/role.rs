//! Roles and route-scoped role sets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Role carried by every identity record and credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular portal user.
    Student,
    /// Administrator with access to user management.
    Admin,
}

impl Role {
    /// Wire representation used in credentials, events and the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Self::Student),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Immutable set of roles allowed on a route.
///
/// Built once when the router is composed and shared by every request
/// that hits the route.
///
/// # Examples
///
/// ```
/// use portal_core::role::{Role, RoleSet};
///
/// let admins = RoleSet::new([Role::Admin]);
/// assert!(admins.allows(Role::Admin));
/// assert!(!admins.allows(Role::Student));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleSet {
    student: bool,
    admin: bool,
}

impl RoleSet {
    /// Build a role set from the given roles.
    #[must_use]
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        roles.into_iter().fold(
            Self {
                student: false,
                admin: false,
            },
            |set, role| match role {
                Role::Student => Self {
                    student: true,
                    ..set
                },
                Role::Admin => Self { admin: true, ..set },
            },
        )
    }

    /// Set allowing every role.
    #[must_use]
    pub const fn any() -> Self {
        Self {
            student: true,
            admin: true,
        }
    }

    /// Whether `role` is a member of this set.
    #[must_use]
    pub const fn allows(&self, role: Role) -> bool {
        match role {
            Role::Student => self.student,
            Role::Admin => self.admin,
        }
    }
}
