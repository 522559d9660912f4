//! Custom Axum extractors.
//!
//! - [`AuthenticatedUser`]: the Claim attached by the authentication interceptor
//! - [`ApiJson`]: JSON body whose rejections render as `VALIDATION_ERROR`
//! - [`ClientInfo`]: client IP, user agent and correlation ID, ready to attach
//!   to an event
//! - [`CorrelationId`], [`ClientIp`], [`UserAgent`]: individual request facts
//!
//! # Examples
//!
//! ```ignore
//! use portal_web::extractors::{ApiJson, AuthenticatedUser, ClientInfo};
//!
//! async fn update_profile(
//!     State(service): State<UserService>,
//!     AuthenticatedUser(claims): AuthenticatedUser,
//!     ClientInfo(metadata): ClientInfo,
//!     ApiJson(body): ApiJson<UpdateProfile>,
//! ) -> Result<Json<UserResponse>, AppError> {
//!     Ok(Json(service.update_profile(claims.user_id, body, metadata).await?))
//! }
//! ```

use crate::error::AppError;
use crate::middleware::inbound_id;
use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequest, FromRequestParts},
    http::{Extensions, HeaderMap, header, request::Parts},
};
use portal_core::{Claims, RequestMetadata};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use uuid::Uuid;

/// Claims of the caller, placed in request extensions by
/// [`authenticate`](crate::middleware::authenticate).
///
/// A handler that takes this extractor on a route without the interceptor is
/// a composition bug: the request is rejected with 401 and the bug is logged.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Claims>() {
            Some(claims) => Ok(Self(claims.clone())),
            None => {
                tracing::error!(
                    uri = %parts.uri,
                    "Claims missing from request scope; authentication interceptor not installed"
                );
                Err(AppError::unauthorized())
            }
        }
    }
}

/// `axum::Json` with rejections mapped to [`AppError::validation`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Correlation ID for request tracing.
///
/// Prefers the ID stored by [`correlate`](crate::correlate), then the
/// `X-Correlation-ID` header, and generates a UUID v4 otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    /// The ID attached by [`correlate`](crate::correlate), if it ran.
    #[must_use]
    pub fn attached(extensions: &Extensions) -> Option<Self> {
        extensions.get::<Self>().copied()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::attached(&parts.extensions).unwrap_or_else(|| {
            Self(inbound_id(&parts.headers).unwrap_or_else(Uuid::new_v4))
        }))
    }
}

/// Client IP address.
///
/// # Priority
///
/// 1. `X-Forwarded-For` (first IP in the list)
/// 2. `X-Real-IP`
/// 3. Connection address (when the server is run with connect info)
/// 4. `127.0.0.1`
#[derive(Debug, Clone, Copy)]
pub struct ClientIp(pub IpAddr);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let connect_info = parts.extensions.get::<ConnectInfo<SocketAddr>>();
        Ok(Self(extract_client_ip(&parts.headers, connect_info)))
    }
}

fn extract_client_ip(headers: &HeaderMap, connect_info: Option<&ConnectInfo<SocketAddr>>) -> IpAddr {
    let forwarded = headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok());

    let real_ip = || {
        headers
            .get("X-Real-IP")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    };

    forwarded
        .or_else(real_ip)
        .or_else(|| connect_info.map(|ConnectInfo(addr)| addr.ip()))
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

/// `User-Agent` header, if present and valid UTF-8.
#[derive(Debug, Clone)]
pub struct UserAgent(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for UserAgent
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Self(user_agent))
    }
}

/// Client IP, user agent and correlation ID as event metadata.
#[derive(Debug, Clone)]
pub struct ClientInfo(pub RequestMetadata);

#[async_trait]
impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ClientIp(ip) = ClientIp::from_request_parts(parts, state).await?;
        let UserAgent(user_agent) = UserAgent::from_request_parts(parts, state).await?;
        let CorrelationId(correlation_id) = CorrelationId::from_request_parts(parts, state).await?;

        Ok(Self(RequestMetadata {
            ip_address: Some(ip.to_string()),
            user_agent,
            correlation_id: Some(correlation_id.to_string()),
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::Request;
    use crate::middleware::CORRELATION_ID_HEADER;
    use portal_core::Role;

    fn request_parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).expect("Valid request").into_parts().0
    }

    #[tokio::test]
    async fn correlation_id_from_header() {
        let uuid = Uuid::new_v4();
        let mut parts = request_parts(Request::builder().header(CORRELATION_ID_HEADER, uuid.to_string()));

        let correlation_id = CorrelationId::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(correlation_id.0, uuid);
    }

    #[tokio::test]
    async fn correlation_id_prefers_extension() {
        let from_layer = CorrelationId(Uuid::new_v4());
        let mut parts = request_parts(Request::builder().header(CORRELATION_ID_HEADER, Uuid::new_v4().to_string()));
        parts.extensions.insert(from_layer);

        let correlation_id = CorrelationId::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(correlation_id, from_layer);
    }

    #[tokio::test]
    async fn client_ip_from_x_forwarded_for() {
        let mut parts = request_parts(Request::builder().header("X-Forwarded-For", "203.0.113.1, 198.51.100.1"));

        let client_ip = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(client_ip.0.to_string(), "203.0.113.1");
    }

    #[tokio::test]
    async fn client_ip_from_x_real_ip() {
        let mut parts = request_parts(Request::builder().header("X-Real-IP", "198.51.100.42"));

        let client_ip = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(client_ip.0.to_string(), "198.51.100.42");
    }

    #[tokio::test]
    async fn client_ip_from_connect_info_then_localhost() {
        let mut with_conn = request_parts(Request::builder());
        with_conn
            .extensions
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 7], 51_000))));
        let client_ip = ClientIp::from_request_parts(&mut with_conn, &()).await.unwrap();
        assert_eq!(client_ip.0.to_string(), "192.0.2.7");

        let mut bare = request_parts(Request::builder());
        let client_ip = ClientIp::from_request_parts(&mut bare, &()).await.unwrap();
        assert_eq!(client_ip.0.to_string(), "127.0.0.1");
    }

    #[tokio::test]
    async fn client_info_collects_metadata() {
        let correlation = CorrelationId(Uuid::new_v4());
        let mut parts = request_parts(
            Request::builder()
                .header("X-Real-IP", "198.51.100.42")
                .header(header::USER_AGENT, "Mozilla/5.0 (Test)"),
        );
        parts.extensions.insert(correlation);

        let ClientInfo(metadata) = ClientInfo::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(metadata.ip_address.as_deref(), Some("198.51.100.42"));
        assert_eq!(metadata.user_agent.as_deref(), Some("Mozilla/5.0 (Test)"));
        assert_eq!(metadata.correlation_id, Some(correlation.to_string()));

        let mut bare = request_parts(Request::builder());
        let ClientInfo(metadata) = ClientInfo::from_request_parts(&mut bare, &()).await.unwrap();
        assert_eq!(metadata.user_agent, None);
    }

    #[tokio::test]
    async fn authenticated_user_reads_extension() {
        let claims = Claims {
            user_id: 3,
            email: "ada@example.com".to_string(),
            role: Role::Admin,
            iat: 1,
            exp: 2,
            iss: "student-portal-api".to_string(),
        };
        let mut parts = request_parts(Request::builder());
        parts.extensions.insert(claims.clone());

        let AuthenticatedUser(extracted) = AuthenticatedUser::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(extracted, claims);
    }

    #[tokio::test]
    async fn missing_claims_reject_as_unauthorized() {
        let mut parts = request_parts(Request::builder().uri("/api/profile"));

        let err = AuthenticatedUser::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
    }
}
