use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use personal_finance_api::config::Environment;
use personal_finance_api::{build_router, Settings};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;

fn settings(environment: Environment) -> Settings {
    Settings::load(environment, None).unwrap()
}

fn request(uri: &str) -> axum::http::request::Builder {
    Request::builder().uri(uri).header(header::HOST, "localhost")
}

#[tokio::test]
async fn test_production_redirects_plain_http() {
    let router = build_router(Arc::new(settings(Environment::Production)));
    let response = router
        .oneshot(request("/health/?full=1").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        response.headers()[header::LOCATION],
        "https://localhost/health/?full=1"
    );
}

#[tokio::test]
async fn test_production_ignores_forwarded_proto_from_untrusted_client() {
    let router = build_router(Arc::new(settings(Environment::Production)));
    let response = router
        .oneshot(
            request("/health/")
                .header("x-forwarded-proto", "https")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        response.headers()[header::LOCATION],
        "https://localhost/health/"
    );
    assert!(response
        .headers()
        .get(header::STRICT_TRANSPORT_SECURITY)
        .is_none());
}

#[tokio::test]
async fn test_production_sets_security_headers_behind_tls_proxy() {
    let mut settings = settings(Environment::Production);
    settings.security.trust_forwarded_proto = true;
    let router = build_router(Arc::new(settings));
    let response = router
        .oneshot(
            request("/health/")
                .header("x-forwarded-proto", "https")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers[header::STRICT_TRANSPORT_SECURITY],
        "max-age=31536000; includeSubDomains; preload"
    );
    assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers["x-xss-protection"], "1; mode=block");
}

#[tokio::test]
async fn test_development_has_no_hsts_and_allows_any_origin() {
    let router = build_router(Arc::new(settings(Environment::Development)));
    let response = router
        .oneshot(
            Request::builder()
                .uri("/health/")
                .header(header::HOST, "dev.internal:8000")
                .header(header::ORIGIN, "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::STRICT_TRANSPORT_SECURITY)
        .is_none());
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_disallowed_host_is_rejected() {
    let router = build_router(Arc::new(settings(Environment::Testing)));
    let response = router
        .oneshot(
            Request::builder()
                .uri("/health/")
                .header(header::HOST, "attacker.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["detail"], "Invalid host header.");
}

#[tokio::test]
async fn test_rotating_forwarded_for_does_not_escape_throttling() {
    let mut settings = settings(Environment::Development);
    settings.rate_limit.requests_per_minute = 1;
    settings.rate_limit.burst = 2;
    let router = build_router(Arc::new(settings));
    let peer: SocketAddr = "192.0.2.44:50123".parse().unwrap();

    let mut statuses = Vec::new();
    for i in 0..5 {
        let response = router
            .clone()
            .oneshot(
                request("/health/")
                    .header("x-forwarded-for", format!("10.9.9.{}", i))
                    .extension(ConnectInfo(peer))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        statuses.push(response.status());
    }

    assert_eq!(&statuses[..2], &[StatusCode::OK, StatusCode::OK]);
    assert!(statuses[2..]
        .iter()
        .all(|s| *s == StatusCode::TOO_MANY_REQUESTS));
}

#[tokio::test]
async fn test_rate_limit_throttles_per_client_behind_trusted_proxy() {
    let mut settings = settings(Environment::Development);
    settings.rate_limit.requests_per_minute = 1;
    settings.rate_limit.burst = 2;
    settings.security.trust_forwarded_for = true;
    let router = build_router(Arc::new(settings));

    for _ in 0..2 {
        let response = router
            .clone()
            .oneshot(
                request("/health/")
                    .header("x-forwarded-for", "203.0.113.7")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let throttled = router
        .clone()
        .oneshot(
            request("/health/")
                .header("x-forwarded-for", "203.0.113.7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(throttled.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(throttled.headers().contains_key(header::RETRY_AFTER));

    // 其他用戶端有自己的 bucket
    let other = router
        .oneshot(
            request("/health/")
                .header("x-forwarded-for", "198.51.100.1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(other.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_testing_overlay_never_throttles() {
    let router = build_router(Arc::new(settings(Environment::Testing)));
    for _ in 0..150 {
        let response = router
            .clone()
            .oneshot(request("/health/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
