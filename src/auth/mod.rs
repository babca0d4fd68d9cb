//! PSK-based write protection.
//!
//! Safe methods (GET, HEAD, OPTIONS) are always allowed so that content pages
//! and static assets stay public. Mutating requests must present the key when
//! one is configured. Comparison is constant-time.

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::errors::AppError;

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// PSK authentication layer function that takes the expected PSK as a parameter.
pub async fn psk_auth_layer(
    expected_psk: Option<String>,
    request: Request,
    next: Next,
) -> Response {
    // No PSK configured: writes are open (dev mode)
    let Some(expected) = expected_psk else {
        return next.run(request).await;
    };

    if request.method().is_safe() {
        return next.run(request).await;
    }

    match provided_key(&request) {
        Some(key) if constant_time_compare(&key, &expected) => next.run(request).await,
        Some(_) => {
            tracing::warn!("Rejected {} {}: invalid API key", request.method(), request.uri());
            AppError::Unauthorized("Invalid API key".to_string()).into_response()
        }
        None => {
            tracing::warn!("Rejected {} {}: missing API key", request.method(), request.uri());
            AppError::Unauthorized("Missing or invalid API key".to_string()).into_response()
        }
    }
}

/// Key from `x-api-key`, falling back to an `Authorization: Bearer` token.
fn provided_key(request: &Request) -> Option<String> {
    let headers = request.headers();
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        })
        .map(|s| s.to_string())
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Method, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    fn guarded(psk: Option<&str>) -> Router {
        let psk = psk.map(str::to_string);
        Router::new()
            .route("/thing", get(|| async { "read" }).post(|| async { "written" }))
            .layer(middleware::from_fn(move |req, next| {
                psk_auth_layer(psk.clone(), req, next)
            }))
    }

    fn request(method: Method, key: Option<(&str, &str)>) -> Request {
        let mut builder = axum::http::Request::builder()
            .method(method)
            .uri("/thing");
        if let Some((name, value)) = key {
            builder = builder.header(name, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("test-key-123", "test-key-123"));
        assert!(!constant_time_compare("test-key-123", "test-key-124"));
        assert!(!constant_time_compare("short", "much-longer-key"));
        assert!(constant_time_compare("", ""));
    }

    #[tokio::test]
    async fn test_reads_are_public() {
        let resp = guarded(Some("secret"))
            .oneshot(request(Method::GET, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_writes_need_key() {
        let resp = guarded(Some("secret"))
            .oneshot(request(Method::POST, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = guarded(Some("secret"))
            .oneshot(request(Method::POST, Some((API_KEY_HEADER, "wrong"))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = guarded(Some("secret"))
            .oneshot(request(Method::POST, Some((API_KEY_HEADER, "secret"))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = guarded(Some("secret"))
            .oneshot(request(Method::POST, Some(("authorization", "Bearer secret"))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_no_psk_allows_writes() {
        let resp = guarded(None)
            .oneshot(request(Method::POST, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
