//! Profile and user management endpoints.
//!
//! Profile routes act on the caller's own record (student or admin):
//! - GET /api/profile
//! - PUT /api/profile
//!
//! Management routes are admin only:
//! - GET /api/users?page&limit
//! - GET /api/users/:id
//! - PUT /api/users/:id
//! - DELETE /api/users/:id

use super::pagination::{Page, PaginationQuery};
use crate::http::AppState;
use crate::models::{Paginated, UpdateProfileRequest, UpdateUserRequest};
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use portal_core::UserResponse;
use portal_web::{ApiJson, AuthenticatedUser, ClientInfo, WebResult};

/// The caller's own record.
///
/// # Errors
///
/// 404 if the account was deleted after the credential was issued.
pub async fn get_profile(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> WebResult<Json<UserResponse>> {
    Ok(Json(state.service.get(claims.user_id).await?))
}

/// Change the caller's name or email.
///
/// # Errors
///
/// 400 for invalid input, 404 for a deleted account, 409 if the email is
/// taken.
pub async fn update_profile(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ClientInfo(metadata): ClientInfo,
    ApiJson(request): ApiJson<UpdateProfileRequest>,
) -> WebResult<Json<UserResponse>> {
    let user = state
        .service
        .update_profile(claims.user_id, request, metadata)
        .await?;
    Ok(Json(user))
}

/// List users one page at a time.
///
/// # Errors
///
/// 500 if the repository fails.
pub async fn list_users(
    State(state): State<AppState>,
    query: Result<Query<PaginationQuery>, QueryRejection>,
) -> WebResult<Json<Paginated<UserResponse>>> {
    let Query(query) = query?;
    Ok(Json(state.service.list(Page::from(query)).await?))
}

/// Fetch one user.
///
/// # Errors
///
/// 400 for a non-numeric id, 404 if the user does not exist.
pub async fn get_user(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> WebResult<Json<UserResponse>> {
    let Path(id) = id?;
    Ok(Json(state.service.get(id).await?))
}

/// Change any user's name, email or role.
///
/// # Errors
///
/// 400 for invalid input, 404 if the user does not exist, 409 if the email
/// is taken.
pub async fn update_user(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    ClientInfo(metadata): ClientInfo,
    ApiJson(request): ApiJson<UpdateUserRequest>,
) -> WebResult<Json<UserResponse>> {
    let Path(id) = id?;
    Ok(Json(state.service.update_user(id, request, metadata).await?))
}

/// Delete a user.
///
/// # Errors
///
/// 400 for a non-numeric id, 404 if the user does not exist.
pub async fn delete_user(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> WebResult<StatusCode> {
    let Path(id) = id?;
    state.service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
