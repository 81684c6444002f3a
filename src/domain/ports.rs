use crate::domain::model::JobReport;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// 傳給工作處理器的執行資訊
#[derive(Debug, Clone)]
pub struct JobContext {
    pub job_name: String,
    pub run_id: String,
    pub scheduled_for: DateTime<Utc>,
}

impl JobContext {
    pub fn new(job_name: &str, scheduled_for: DateTime<Utc>) -> Self {
        Self {
            job_name: job_name.to_string(),
            run_id: format!("{}-{}", job_name, scheduled_for.format("%Y%m%dT%H%M%SZ")),
            scheduled_for,
        }
    }
}

/// 排程工作實際執行的動作
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn run(&self, context: &JobContext) -> Result<JobReport>;
}
