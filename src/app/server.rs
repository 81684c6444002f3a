use crate::app::rate_limit::RateLimiter;
use crate::config::settings::{CorsPolicy, Settings};
use crate::core::routes::{method_not_allowed, not_found, not_implemented, RouteTable};
use crate::domain::model::Component;
use crate::utils::error::Result;
use crate::utils::validation::validate_socket_addr;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{
        header::{self, HeaderName, HeaderValue},
        uri::Scheme,
        Method, StatusCode, Uri,
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub routes: Arc<RouteTable>,
    pub limiter: Option<Arc<RateLimiter>>,
}

impl AppState {
    pub fn new(settings: Arc<Settings>) -> Self {
        let routes = RouteTable::standard(settings.health.variant);
        let limiter = RateLimiter::from_settings(&settings.rate_limit).map(Arc::new);
        Self {
            settings,
            routes: Arc::new(routes),
            limiter,
        }
    }
}

/// 組出完整服務：健康檢查、路由表、以及依設定啟用的中介層
pub fn build_router(settings: Arc<Settings>) -> Router {
    let state = AppState::new(settings);
    let cors = cors_layer(&state.settings.cors);

    // 後加的 layer 先執行：host → https 導向 → 安全標頭 → CORS → 限流 → 路由
    let mut router = state
        .routes
        .health_variant()
        .router::<AppState>()
        .fallback(dispatch)
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    if let Some(cors) = cors {
        router = router.layer(cors);
    }

    router
        .layer(middleware::from_fn_with_state(
            state.clone(),
            apply_security_headers,
        ))
        .layer(middleware::from_fn_with_state(state.clone(), redirect_to_https))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            enforce_allowed_hosts,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn dispatch(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    let path = uri.path();
    match state.routes.resolve(path) {
        None => not_found(),
        Some(entry) if !entry.methods.allows(&method) => method_not_allowed(&method, entry.methods),
        Some(entry) if !entry.owner.is_implemented() => {
            tracing::debug!(owner = %entry.owner, %path, "placeholder route hit");
            not_implemented(entry)
        }
        Some(entry) => match entry.owner {
            Component::ApiSchema => Json(state.routes.openapi_document()).into_response(),
            Component::Health => Json(state.routes.health_variant().payload()).into_response(),
            _ => not_implemented(entry),
        },
    }
}

fn cors_layer(policy: &CorsPolicy) -> Option<CorsLayer> {
    match policy {
        CorsPolicy::AllowAll => Some(CorsLayer::permissive()),
        CorsPolicy::AllowList(origins) if origins.is_empty() => None,
        CorsPolicy::AllowList(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|o| match HeaderValue::from_str(o) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!("⚠️ Ignoring invalid CORS origin: {}", o);
                        None
                    }
                })
                .collect();
            Some(
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
        }
    }
}

/// Host 標頭（或 URI authority）去掉 port 之後的小寫主機名
fn request_host(req: &Request) -> Option<String> {
    req.headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| req.uri().authority().map(|a| a.as_str().to_string()))
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    host.split(':').next().unwrap_or(host)
}

pub fn host_allowed(allowed_hosts: &[String], host: &str) -> bool {
    let host = strip_port(host).trim_end_matches('.').to_ascii_lowercase();
    allowed_hosts.iter().any(|pattern| {
        let pattern = pattern.to_ascii_lowercase();
        if pattern == "*" {
            true
        } else if let Some(domain) = pattern.strip_prefix('.') {
            // ".example.com" 同時允許本身與所有子網域
            host == domain || host.ends_with(&pattern)
        } else {
            host == pattern
        }
    })
}

fn is_secure(req: &Request, trust_forwarded_proto: bool) -> bool {
    if req.uri().scheme() == Some(&Scheme::HTTPS) {
        return true;
    }
    trust_forwarded_proto
        && req
            .headers()
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"))
}

/// 限流用的用戶端識別；`X-Forwarded-For` 只在設定信任時採用
fn client_key(req: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        if let Some(forwarded) = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
        {
            let forwarded = forwarded.trim();
            if !forwarded.is_empty() {
                return forwarded.to_string();
            }
        }
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "anonymous".to_string())
}

async fn enforce_allowed_hosts(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if state.settings.allows_any_host() {
        return next.run(req).await;
    }

    match request_host(&req) {
        Some(host) if !host_allowed(&state.settings.server.allowed_hosts, &host) => {
            tracing::warn!("⚠️ Rejected request with disallowed host: {}", host);
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"detail": "Invalid host header."})),
            )
                .into_response()
        }
        _ => next.run(req).await,
    }
}

async fn redirect_to_https(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let security = &state.settings.security;
    if !security.ssl_redirect || is_secure(&req, security.trust_forwarded_proto) {
        return next.run(req).await;
    }

    let Some(host) = request_host(&req) else {
        return next.run(req).await;
    };
    let path = req
        .uri()
        .path_and_query()
        .map(|p| p.as_str())
        .unwrap_or("/");
    let location = format!("https://{}{}", host, path);

    match HeaderValue::from_str(&location) {
        Ok(value) => (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, value)]).into_response(),
        Err(_) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Invalid host header."})),
        )
            .into_response(),
    }
}

async fn apply_security_headers(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let security = &state.settings.security;
    let secure = is_secure(&req, security.trust_forwarded_proto);
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    if let Some(value) = security.frame_options.header_value() {
        headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static(value));
    }
    if security.content_type_nosniff {
        headers.insert(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        );
    }
    if security.browser_xss_filter {
        headers.insert(
            HeaderName::from_static("x-xss-protection"),
            HeaderValue::from_static("1; mode=block"),
        );
    }
    // HSTS 只在 https 回應上送出
    if let (true, Some(hsts)) = (secure, security.hsts) {
        if let Ok(value) = HeaderValue::from_str(&hsts.header_value()) {
            headers.insert(header::STRICT_TRANSPORT_SECURITY, value);
        }
    }

    response
}

async fn rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if let Some(limiter) = &state.limiter {
        let client = client_key(&req, state.settings.security.trust_forwarded_for);
        if let Err(wait) = limiter.try_acquire(&client) {
            tracing::warn!(%client, ?wait, "⏳ Request throttled");
            let retry_after = wait.as_secs().max(1).to_string();
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({"detail": "Request was throttled."})),
            )
                .into_response();
            if let Ok(value) = HeaderValue::from_str(&retry_after) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
            return response;
        }
    }
    next.run(req).await
}

/// 綁定位址並提供服務，直到 `shutdown` 完成
pub async fn serve_router<F>(router: Router, bind_addr: &str, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = validate_socket_addr("server.bind_addr", bind_addr)?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("🚀 Listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

pub async fn serve<F>(settings: Arc<Settings>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tracing::info!(
        environment = %settings.environment,
        health = settings.health.variant.path(),
        rate_limited = settings.rate_limit.enabled,
        "Starting {} {}",
        settings.service.name,
        settings.service.version
    );
    let bind_addr = settings.server.bind_addr.clone();
    serve_router(build_router(settings), &bind_addr, shutdown).await
}

/// Ctrl+C 或 SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn from_peer(peer: &str, forwarded_for: &str) -> Request {
        let mut req = Request::builder()
            .uri("/health/")
            .header("x-forwarded-for", forwarded_for)
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
        req
    }

    fn hosts(list: &[&str]) -> Vec<String> {
        list.iter().map(|h| h.to_string()).collect()
    }

    #[test]
    fn test_host_allowed() {
        let allowed = hosts(&["localhost", ".finance.example"]);
        assert!(host_allowed(&allowed, "localhost"));
        assert!(host_allowed(&allowed, "LOCALHOST:8000"));
        assert!(host_allowed(&allowed, "finance.example"));
        assert!(host_allowed(&allowed, "api.finance.example"));
        assert!(!host_allowed(&allowed, "evilfinance.example"));
        assert!(!host_allowed(&allowed, "example.org"));
        assert!(host_allowed(&hosts(&["*"]), "anything"));
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("localhost:8000"), "localhost");
        assert_eq!(strip_port("[::1]:8000"), "[::1]");
        assert_eq!(strip_port("example.com"), "example.com");
    }

    #[test]
    fn test_client_key_ignores_forwarded_for_unless_trusted() {
        let req = from_peer("192.0.2.10:51000", "10.9.9.1, 172.16.0.1");
        assert_eq!(client_key(&req, false), "192.0.2.10");
        assert_eq!(client_key(&req, true), "10.9.9.1");
    }

    #[test]
    fn test_forwarded_proto_needs_trust() {
        let req = Request::builder()
            .uri("/health/")
            .header("x-forwarded-proto", "https")
            .body(Body::empty())
            .unwrap();
        assert!(!is_secure(&req, false));
        assert!(is_secure(&req, true));
    }
}
