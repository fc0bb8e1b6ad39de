//! Hardening layers for the HTTP surface
//!
//! [`HardenedRouter::with_hardening`] wraps any axum router with the
//! request limits and response headers of a [`TutorhubConfig`].

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::TutorhubConfig;

/// Extension trait applying the hardening layers to an axum `Router`.
///
/// # Example
///
/// ```ignore
/// use axum::{Router, routing::get};
/// use tutorhub::{HardenedRouter, TutorhubConfig};
///
/// let app = Router::new()
///     .route("/", get(|| async { "Hello" }))
///     .with_hardening(&TutorhubConfig::from_env());
/// ```
pub trait HardenedRouter {
    /// Layers from innermost to outermost:
    /// 1. Timeout
    /// 2. Request body limit
    /// 3. Security headers
    /// 4. CORS
    /// 5. TraceLayer
    fn with_hardening(self, config: &TutorhubConfig) -> Self;
}

impl<S> HardenedRouter for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_hardening(self, config: &TutorhubConfig) -> Self {
        let mut router = self
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                config.request_timeout,
            ))
            .layer(RequestBodyLimitLayer::new(config.max_request_size));

        if config.security_headers_enabled {
            router = router
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::CONTENT_SECURITY_POLICY,
                    HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
                ))
                // Credential responses must never be cached.
                .layer(SetResponseHeaderLayer::overriding(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-store"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::REFERRER_POLICY,
                    HeaderValue::from_static("no-referrer"),
                ));
        }

        if let Some(cors) = build_cors_layer(config) {
            router = router.layer(cors);
        }

        if config.tracing_enabled {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }
}

/// `None` keeps the API same-origin only
fn build_cors_layer(config: &TutorhubConfig) -> Option<CorsLayer> {
    if config.cors_is_restrictive() {
        return None;
    }

    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600));

    if config.cors_is_permissive() {
        Some(base.allow_origin(Any))
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();
        Some(base.allow_origin(origins))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::{get, post};
    use tower::ServiceExt;

    fn app(config: &TutorhubConfig) -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .route("/echo", post(|body: String| async move { body }))
            .with_hardening(config)
    }

    #[tokio::test]
    async fn test_security_headers() {
        let response = app(&TutorhubConfig::default())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers[header::CACHE_CONTROL], "no-store");
    }

    #[tokio::test]
    async fn test_headers_can_be_disabled() {
        let config = TutorhubConfig::builder().disable_security_headers().build();
        let response = app(&config)
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.headers().get(header::X_FRAME_OPTIONS).is_none());
    }

    #[tokio::test]
    async fn test_body_limit() {
        let config = TutorhubConfig::builder().max_request_size(16).build();
        let response = app(&config)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/echo")
                    .header(header::CONTENT_LENGTH, "64")
                    .body(Body::from("x".repeat(64)))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_permissive_cors() {
        let config = TutorhubConfig::builder().cors_origins(vec!["*"]).build();
        let response = app(&config)
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(header::ORIGIN, "https://app.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
