use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use personal_finance_api::config::Environment;
use personal_finance_api::core::routes::MatchKind;
use personal_finance_api::domain::model::Component;
use personal_finance_api::{build_router, HealthVariant, RouteTable, Settings};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

async fn call(method: &str, uri: &str) -> (StatusCode, Value) {
    let settings = Arc::new(Settings::load(Environment::Testing, None).unwrap());
    let response = build_router(settings)
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[test]
fn test_every_placeholder_prefix_has_an_owner() {
    let table = RouteTable::standard(HealthVariant::Service);
    let expected = [
        ("/admin/", Component::Admin),
        ("/api/docs/", Component::ApiDocs),
        ("/api/redoc/", Component::ApiDocs),
        ("/api/schema/", Component::ApiSchema),
        ("/api/auth/token/", Component::Auth),
        ("/api/auth/refresh/", Component::TokenRefresh),
        ("/api/users/me/", Component::Users),
        ("/api/transactions/", Component::Transactions),
        ("/api/categories/", Component::Categories),
        ("/api/budgets/", Component::Budgets),
        ("/api/goals/", Component::Goals),
        ("/api/analytics/", Component::Analytics),
        ("/api/data/", Component::DataManagement),
    ];

    for (path, owner) in expected {
        let entry = table.resolve(path).unwrap();
        assert_eq!(entry.owner, owner, "path {}", path);
    }
    assert_eq!(
        table.entries().iter().filter(|e| e.kind == MatchKind::Exact).count(),
        2
    );
}

#[tokio::test]
async fn test_placeholder_route_answers_501_with_owner() {
    let (status, body) = call("GET", "/api/transactions/42/").await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body["detail"], "Not implemented.");
    assert_eq!(body["owner"], "transactions");
    assert_eq!(body["prefix"], "/api/transactions/");
}

#[tokio::test]
async fn test_token_refresh_is_post_only() {
    let (status, body) = call("POST", "/api/auth/refresh/").await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body["owner"], "token_refresh");

    let (status, body) = call("GET", "/api/auth/refresh/").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["detail"], "Method \"GET\" not allowed.");
}

#[tokio::test]
async fn test_unmatched_path_is_json_404() {
    let (status, body) = call("GET", "/api/unknown/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Not found.");
}

#[tokio::test]
async fn test_schema_endpoint_serves_openapi_document() {
    let (status, body) = call("GET", "/api/schema/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["openapi"], "3.0.3");
    assert_eq!(body["info"]["title"], "Personal Finance Tracker API");
    assert!(body["paths"]["/health/"]["get"].is_object());
}
