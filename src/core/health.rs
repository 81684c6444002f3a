use crate::core::routes::{method_not_allowed, MethodRule};
use crate::domain::model::{HealthState, HealthStatus};
use crate::utils::error::{ApiError, Result};
use axum::{http::Method, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const DETAILED_SERVICE_NAME: &str = "Personal Finance Tracker API";
pub const DETAILED_VERSION: &str = "1.0.0";
pub const SERVICE_IDENTIFIER: &str = "personal-finance-api";

/// 健康檢查的回應格式；各格式的欄位集合固定，下游可能依賴確切的 key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthVariant {
    /// `GET /health` → `{"status":"ok"}`
    Minimal,
    /// `GET /health/` → status, service, version
    Detailed,
    /// `GET /health/` → status, service
    Service,
}

impl HealthVariant {
    pub fn path(&self) -> &'static str {
        match self {
            HealthVariant::Minimal => "/health",
            HealthVariant::Detailed | HealthVariant::Service => "/health/",
        }
    }

    pub fn payload(&self) -> HealthStatus {
        match self {
            HealthVariant::Minimal => HealthStatus {
                status: HealthState::Ok,
                service: None,
                version: None,
            },
            HealthVariant::Detailed => HealthStatus {
                status: HealthState::Healthy,
                service: Some(DETAILED_SERVICE_NAME.to_string()),
                version: Some(DETAILED_VERSION.to_string()),
            },
            HealthVariant::Service => HealthStatus {
                status: HealthState::Ok,
                service: Some(SERVICE_IDENTIFIER.to_string()),
                version: None,
            },
        }
    }

    /// 只掛健康檢查路徑的 router；非 GET（包含 HEAD）回 405
    pub fn router<S>(self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        // axum 的 `get` 預設也回應 HEAD，需明確擋下
        Router::new().route(
            self.path(),
            get(move || health(self))
                .head(|| async { method_not_allowed(&Method::HEAD, MethodRule::GetOnly) })
                .fallback(|method: Method| async move {
                    method_not_allowed(&method, MethodRule::GetOnly)
                }),
        )
    }
}

impl FromStr for HealthVariant {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" => Ok(HealthVariant::Minimal),
            "detailed" => Ok(HealthVariant::Detailed),
            "service" => Ok(HealthVariant::Service),
            other => Err(ApiError::InvalidConfigValueError {
                field: "health.variant".to_string(),
                value: other.to_string(),
                reason: "Expected minimal, detailed or service".to_string(),
            }),
        }
    }
}

pub async fn health(variant: HealthVariant) -> impl IntoResponse {
    tracing::trace!(?variant, "health check");
    Json(variant.payload())
}
