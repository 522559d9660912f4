//! Request and response bodies for the user API.

use portal_core::UserResponse;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/auth/register`.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    /// Display name
    pub name: String,
    /// Login email
    pub email: String,
    /// Plaintext password, at least six characters
    pub password: String,
    /// `student` or `admin`
    pub role: String,
}

/// Body of `POST /api/auth/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    /// Login email
    pub email: String,
    /// Plaintext password
    pub password: String,
}

/// Response of a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    /// Bearer credential
    pub token: String,
    /// The authenticated user
    pub user: UserResponse,
}

/// Body of `PUT /api/profile`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileRequest {
    /// New display name
    pub name: Option<String>,
    /// New login email
    pub email: Option<String>,
}

/// Body of `PUT /api/users/:id`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    /// New display name
    pub name: Option<String>,
    /// New login email
    pub email: Option<String>,
    /// New role, `student` or `admin`
    pub role: Option<String>,
}

/// One page of a listing.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    /// Records on this page
    pub data: Vec<T>,
    /// 1-based page number
    pub page: i64,
    /// Page size
    pub limit: i64,
    /// Total number of records
    pub total_count: i64,
    /// Number of pages at this page size
    pub total_pages: i64,
}
