//! Authentication and authorization interceptors.
//!
//! [`authenticate`] verifies the bearer credential and attaches its
//! [`Claims`] to the request. [`authorize`] checks the attached role against
//! a route's [`RoleSet`]. [`protect`] installs both on a router in the right
//! order.
//!
//! Every authentication failure renders the same 401 body. The precise
//! cause is logged at `warn` and counted in
//! `portal_auth_rejections_total{reason}`.
//!
//! # Example
//!
//! ```ignore
//! use portal_core::{Role, RoleSet};
//! use portal_web::middleware::protect;
//!
//! let admin = protect(
//!     Router::new().route("/api/users", get(list_users)),
//!     authority.clone(),
//!     RoleSet::new([Role::Admin]),
//! );
//! ```

use crate::error::AppError;
use crate::extractors::CorrelationId;
use axum::{
    Router,
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::{Next, from_fn_with_state},
    response::Response,
};
use portal_auth::CredentialAuthority;
use portal_core::{Claims, RoleSet};
use portal_runtime::metrics::AuthMetrics;
use std::sync::Arc;

const BEARER: &str = "Bearer";

/// Wrap `router` so every route requires a credential whose role is in
/// `roles`.
///
/// Authentication runs first; authorization only sees requests that carry
/// verified claims.
pub fn protect<S>(router: Router<S>, authority: Arc<CredentialAuthority>, roles: RoleSet) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    // Layers wrap outward: the last one added runs first.
    router
        .route_layer(from_fn_with_state(roles, authorize))
        .route_layer(from_fn_with_state(authority, authenticate))
}

/// Verify the `Authorization: Bearer <token>` header and attach the claims.
///
/// # Errors
///
/// Returns 401 for a missing, malformed or unverifiable credential, and 500
/// if claims are already present (a pipeline misconfiguration).
pub async fn authenticate(
    State(authority): State<Arc<CredentialAuthority>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let correlation_id = correlation_label(&request);

    if request.extensions().get::<Claims>().is_some() {
        tracing::error!(
            correlation_id = %correlation_id,
            path = %request.uri().path(),
            "Claims already present before authentication"
        );
        return Err(AppError::internal());
    }

    let token = bearer_token(request.headers()).map_err(|reason| {
        tracing::warn!(
            reason,
            correlation_id = %correlation_id,
            path = %request.uri().path(),
            "Rejected request without usable credential"
        );
        AuthMetrics::record_rejection(reason);
        AppError::unauthorized()
    })?;

    let claims = authority.verify(token).map_err(|e| {
        tracing::warn!(
            reason = e.reason(),
            error = %e,
            correlation_id = %correlation_id,
            path = %request.uri().path(),
            "Credential verification failed"
        );
        AuthMetrics::record_rejection(e.reason());
        AppError::unauthorized()
    })?;

    tracing::debug!(user_id = claims.user_id, role = %claims.role, "Authenticated request");
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Reject callers whose role is not in `roles`.
///
/// # Errors
///
/// Returns 403 for a role outside the set, and 401 when no claims are
/// attached (authentication did not run first).
pub async fn authorize(
    State(roles): State<RoleSet>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(claims) = request.extensions().get::<Claims>() else {
        tracing::error!(
            correlation_id = %correlation_label(&request),
            path = %request.uri().path(),
            "Authorization ran without authenticated claims"
        );
        return Err(AppError::unauthorized());
    };

    if !roles.allows(claims.role) {
        tracing::warn!(
            user_id = claims.user_id,
            role = %claims.role,
            correlation_id = %correlation_label(&request),
            path = %request.uri().path(),
            "Role not permitted on route"
        );
        AuthMetrics::record_denial();
        return Err(AppError::forbidden());
    }

    Ok(next.run(request).await)
}

/// Correlation ID for log fields; empty when `correlate` is not installed.
fn correlation_label(request: &Request) -> String {
    CorrelationId::attached(request.extensions()).map_or_else(String::new, |id| id.to_string())
}

/// Extract the token from an `Authorization` header.
///
/// The value must be exactly two whitespace-separated parts, the first being
/// the case-sensitive literal `Bearer`. The error is the rejection reason.
fn bearer_token(headers: &HeaderMap) -> Result<&str, &'static str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or("missing_header")?
        .to_str()
        .map_err(|_| "malformed_header")?;

    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(BEARER), Some(token), None) => Ok(token),
        _ => Err("malformed_header"),
    }
}
