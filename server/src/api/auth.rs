//! Public authentication endpoints.
//!
//! - POST /api/auth/register - Create an account
//! - POST /api/auth/login - Exchange email and password for a bearer token

use crate::http::AppState;
use crate::models::{LoginRequest, LoginResponse, RegisterRequest};
use axum::{Json, extract::State, http::StatusCode};
use portal_core::{ServiceError, UserResponse};
use portal_web::{ApiJson, AppError, ClientInfo, WebResult};

/// Message returned for any failed login.
pub const INVALID_LOGIN: &str = "Invalid email or password";

/// Register a new account.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/auth/register \
///   -H "Content-Type: application/json" \
///   -d '{"name":"Ada","email":"ada@example.com","password":"engine42","role":"student"}'
/// ```
///
/// # Errors
///
/// 400 for invalid input, 409 if the email is taken.
pub async fn register(
    State(state): State<AppState>,
    ClientInfo(metadata): ClientInfo,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> WebResult<(StatusCode, Json<UserResponse>)> {
    let user = state.service.register(request, metadata).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Log in and receive a bearer token.
///
/// # Errors
///
/// 401 with [`INVALID_LOGIN`] for an unknown email or wrong password.
pub async fn login(
    State(state): State<AppState>,
    ClientInfo(metadata): ClientInfo,
    ApiJson(request): ApiJson<LoginRequest>,
) -> WebResult<Json<LoginResponse>> {
    let response = state
        .service
        .login(request, metadata)
        .await
        .map_err(|e| match e {
            ServiceError::Authentication => AppError::unauthorized_with(INVALID_LOGIN),
            other => AppError::from(other),
        })?;
    Ok(Json(response))
}
