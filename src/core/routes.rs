use crate::core::health::HealthVariant;
use crate::domain::model::Component;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Prefix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodRule {
    Any,
    GetOnly,
    PostOnly,
}

impl MethodRule {
    pub fn allows(&self, method: &Method) -> bool {
        match self {
            MethodRule::Any => true,
            MethodRule::GetOnly => method == Method::GET,
            MethodRule::PostOnly => method == Method::POST,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteEntry {
    pub pattern: &'static str,
    pub kind: MatchKind,
    pub methods: MethodRule,
    pub owner: Component,
}

impl RouteEntry {
    const fn new(
        pattern: &'static str,
        kind: MatchKind,
        methods: MethodRule,
        owner: Component,
    ) -> Self {
        Self {
            pattern,
            kind,
            methods,
            owner,
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self.kind {
            MatchKind::Exact => path == self.pattern,
            MatchKind::Prefix => {
                path.starts_with(self.pattern)
                    || path == self.pattern.trim_end_matches('/')
            }
        }
    }
}

/// 靜態路由表：(方法, 路徑樣式) → 擁有者
#[derive(Debug, Clone)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
    health: HealthVariant,
}

const PLACEHOLDER_ROUTES: [RouteEntry; 13] = [
    RouteEntry::new("/admin/", MatchKind::Prefix, MethodRule::Any, Component::Admin),
    RouteEntry::new("/api/docs/", MatchKind::Prefix, MethodRule::GetOnly, Component::ApiDocs),
    RouteEntry::new("/api/redoc/", MatchKind::Prefix, MethodRule::GetOnly, Component::ApiDocs),
    RouteEntry::new("/api/schema/", MatchKind::Prefix, MethodRule::GetOnly, Component::ApiSchema),
    RouteEntry::new("/api/auth/refresh/", MatchKind::Exact, MethodRule::PostOnly, Component::TokenRefresh),
    RouteEntry::new("/api/auth/", MatchKind::Prefix, MethodRule::Any, Component::Auth),
    RouteEntry::new("/api/users/", MatchKind::Prefix, MethodRule::Any, Component::Users),
    RouteEntry::new("/api/transactions/", MatchKind::Prefix, MethodRule::Any, Component::Transactions),
    RouteEntry::new("/api/categories/", MatchKind::Prefix, MethodRule::Any, Component::Categories),
    RouteEntry::new("/api/budgets/", MatchKind::Prefix, MethodRule::Any, Component::Budgets),
    RouteEntry::new("/api/goals/", MatchKind::Prefix, MethodRule::Any, Component::Goals),
    RouteEntry::new("/api/analytics/", MatchKind::Prefix, MethodRule::Any, Component::Analytics),
    RouteEntry::new("/api/data/", MatchKind::Prefix, MethodRule::Any, Component::DataManagement),
];

impl RouteTable {
    pub fn standard(health: HealthVariant) -> Self {
        let mut entries = vec![RouteEntry::new(
            health.path(),
            MatchKind::Exact,
            MethodRule::GetOnly,
            Component::Health,
        )];
        entries.extend(PLACEHOLDER_ROUTES.iter().cloned());
        Self { entries, health }
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn health_variant(&self) -> HealthVariant {
        self.health
    }

    /// 精確比對優先，其次取最長的前綴
    pub fn resolve(&self, path: &str) -> Option<&RouteEntry> {
        self.entries
            .iter()
            .filter(|e| e.matches(path))
            .max_by_key(|e| (e.kind == MatchKind::Exact, e.pattern.len()))
    }

    /// 以路由表產生 OpenAPI 文件；只列出已實作的路徑
    pub fn openapi_document(&self) -> serde_json::Value {
        let health = self.health.payload();
        let mut paths = serde_json::Map::new();
        paths.insert(
            self.health.path().to_string(),
            json!({
                "get": {
                    "summary": "Health check for load balancers and monitoring",
                    "operationId": "health_check",
                    "security": [],
                    "responses": {
                        "200": {
                            "description": "Service is alive",
                            "content": {
                                "application/json": { "example": health }
                            }
                        }
                    }
                }
            }),
        );

        json!({
            "openapi": "3.0.3",
            "info": {
                "title": "Personal Finance Tracker API",
                "version": "v1",
                "description": "API for managing personal finances",
                "contact": { "email": "contact@financetracker.local" },
                "license": { "name": "BSD License" }
            },
            "paths": paths,
        })
    }
}

fn detail(status: StatusCode, body: serde_json::Value) -> Response {
    (status, Json(body)).into_response()
}

pub fn not_found() -> Response {
    detail(StatusCode::NOT_FOUND, json!({"detail": "Not found."}))
}

pub fn method_not_allowed(method: &Method, allowed: MethodRule) -> Response {
    let mut response = detail(
        StatusCode::METHOD_NOT_ALLOWED,
        json!({"detail": format!("Method \"{}\" not allowed.", method)}),
    );
    let allow = match allowed {
        MethodRule::Any => None,
        MethodRule::GetOnly => Some("GET"),
        MethodRule::PostOnly => Some("POST"),
    };
    if let Some(allow) = allow {
        response
            .headers_mut()
            .insert(header::ALLOW, HeaderValue::from_static(allow));
    }
    response
}

/// 佔位路由：回報擁有者，實際行為由尚未實作的子服務決定
pub fn not_implemented(entry: &RouteEntry) -> Response {
    detail(
        StatusCode::NOT_IMPLEMENTED,
        json!({
            "detail": "Not implemented.",
            "owner": entry.owner,
            "prefix": entry.pattern,
        }),
    )
}
