//! Correlation ID propagation.
//!
//! [`correlate`] runs outermost. It accepts a UUID from `X-Correlation-ID`
//! or mints a v4, stores it as a [`CorrelationId`] extension and echoes it on
//! the response, including 401/403 rejections produced further in.
//!
//! Downstream, the ID is picked up by the interceptors' rejection logs and by
//! [`ClientInfo`](crate::ClientInfo), which carries it into every domain
//! event a request produces.

use crate::extractors::CorrelationId;
use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

/// Header name for correlation ID.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Attach a [`CorrelationId`] to the request and echo it on the response.
///
/// Install with `axum::middleware::from_fn(correlate)`.
pub async fn correlate(mut request: Request, next: Next) -> Response {
    let correlation_id = CorrelationId(inbound_id(request.headers()).unwrap_or_else(Uuid::new_v4));
    request.extensions_mut().insert(correlation_id);

    let span = tracing::info_span!(
        "http_request",
        correlation_id = %correlation_id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&correlation_id.to_string()) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}

/// Caller-supplied ID. Anything that is not a UUID is ignored.
pub(crate) fn inbound_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::extractors::ClientInfo;
    use crate::middleware::protect;
    use axum::{Router, body::Body, middleware::from_fn, routing::get};
    use chrono::Duration;
    use portal_auth::{AuthConfig, CredentialAuthority};
    use portal_core::RoleSet;
    use portal_testing::test_clock;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/echo",
                get(|CorrelationId(id): CorrelationId| async move { id.to_string() }),
            )
            .route(
                "/client",
                get(|ClientInfo(metadata): ClientInfo| async move {
                    metadata.correlation_id.unwrap_or_default()
                }),
            )
            .layer(from_fn(correlate))
    }

    fn get_request(uri: &str, correlation_id: Option<&str>) -> Request {
        let mut builder = Request::builder().uri(uri);
        if let Some(id) = correlation_id {
            builder = builder.header(CORRELATION_ID_HEADER, id);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn response_id(response: &Response) -> String {
        response
            .headers()
            .get(CORRELATION_ID_HEADER)
            .expect("Correlation ID header should be present")
            .to_str()
            .unwrap()
            .to_string()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn minted_when_missing_and_seen_by_handler() {
        let response = app().oneshot(get_request("/echo", None)).await.unwrap();

        let header = response_id(&response);
        assert!(Uuid::parse_str(&header).is_ok());
        assert_eq!(body_text(response).await, header);
    }

    #[tokio::test]
    async fn caller_uuid_is_kept() {
        let id = Uuid::new_v4().to_string();

        let response = app().oneshot(get_request("/echo", Some(&id))).await.unwrap();
        assert_eq!(response_id(&response), id);
    }

    #[tokio::test]
    async fn non_uuid_header_is_replaced() {
        let response = app()
            .oneshot(get_request("/echo", Some("not-a-uuid")))
            .await
            .unwrap();

        let id = response_id(&response);
        assert!(Uuid::parse_str(&id).is_ok());
        assert_ne!(id, "not-a-uuid");
    }

    #[tokio::test]
    async fn client_info_carries_the_id_into_event_metadata() {
        let id = Uuid::new_v4().to_string();

        let response = app().oneshot(get_request("/client", Some(&id))).await.unwrap();
        assert_eq!(body_text(response).await, id);
    }

    #[tokio::test]
    async fn rejected_requests_still_echo_the_id() {
        let config = AuthConfig::new("correlation-test-secret", Duration::hours(1)).unwrap();
        let authority = Arc::new(CredentialAuthority::new(&config, Arc::new(test_clock())));
        let router = protect(
            Router::new().route("/private", get(|| async { "hidden" })),
            authority,
            RoleSet::any(),
        )
        .layer(from_fn(correlate));
        let id = Uuid::new_v4().to_string();

        let response = router
            .oneshot(get_request("/private", Some(&id)))
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);
        assert_eq!(response_id(&response), id);
    }
}
