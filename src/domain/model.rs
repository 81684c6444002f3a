use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Ok,
    Healthy,
}

/// 健康檢查回應；未設定的欄位不會出現在 JSON 中
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: HealthState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// 路由與排程工作的擁有者
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Health,
    Admin,
    ApiDocs,
    ApiSchema,
    TokenRefresh,
    Auth,
    Users,
    Transactions,
    Categories,
    Budgets,
    Goals,
    Analytics,
    DataManagement,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Health => "health",
            Component::Admin => "admin",
            Component::ApiDocs => "api_docs",
            Component::ApiSchema => "api_schema",
            Component::TokenRefresh => "token_refresh",
            Component::Auth => "auth",
            Component::Users => "users",
            Component::Transactions => "transactions",
            Component::Categories => "categories",
            Component::Budgets => "budgets",
            Component::Goals => "goals",
            Component::Analytics => "analytics",
            Component::DataManagement => "data_management",
        }
    }

    /// 是否由本服務實作（其餘皆為佔位）
    pub fn is_implemented(&self) -> bool {
        matches!(self, Component::Health | Component::ApiSchema)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 工作處理器回傳的結果
#[derive(Debug, Clone, Default)]
pub struct JobReport {
    pub message: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    Succeeded,
    Failed { reason: String },
}

/// 單次工作執行紀錄
#[derive(Debug, Clone, Serialize)]
pub struct JobRun {
    pub job_name: String,
    pub run_id: String,
    pub scheduled_for: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
    pub status: JobStatus,
    pub message: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl JobRun {
    pub fn succeeded(&self) -> bool {
        self.status == JobStatus::Succeeded
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}
