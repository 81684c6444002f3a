use crate::core::schedule::Trigger;
use crate::domain::model::{Component, JobReport, JobRun, JobStatus};
use crate::domain::ports::{JobContext, JobHandler};
use crate::utils::error::{ApiError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

pub const PROCESS_RECURRING_TRANSACTIONS: &str = "process_recurring_transactions";
pub const CHECK_BUDGET_ALERTS: &str = "check_budget_alerts";

/// 排程宣告：名稱與觸發條件，與實際執行的動作分開
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleDeclaration {
    pub name: String,
    pub owner: Component,
    pub trigger: Trigger,
    pub description: String,
}

/// 佔位動作：業務邏輯尚未接上，直接回報成功
#[derive(Debug, Clone, Copy, Default)]
pub struct StubJob;

#[async_trait]
impl JobHandler for StubJob {
    async fn run(&self, context: &JobContext) -> Result<JobReport> {
        tracing::info!(
            job = %context.job_name,
            run_id = %context.run_id,
            "⏭️ No handler wired for job, stub completed"
        );
        Ok(JobReport {
            message: "stub: no business logic attached".to_string(),
            metadata: HashMap::new(),
        })
    }
}

pub struct ScheduledJob {
    pub declaration: ScheduleDeclaration,
    handler: Arc<dyn JobHandler>,
}

/// 排程工作表，負責宣告查詢與單次執行
pub struct JobTable {
    jobs: Vec<ScheduledJob>,
}

impl JobTable {
    pub fn new() -> Self {
        Self { jobs: Vec::new() }
    }

    /// 內建的兩個排程工作，動作皆為 `StubJob`
    pub fn standard() -> Result<Self> {
        let mut table = Self::new();
        table.declare(
            ScheduleDeclaration {
                name: PROCESS_RECURRING_TRANSACTIONS.to_string(),
                owner: Component::Transactions,
                trigger: Trigger::daily_at(0, 0)?,
                description: "Materialise recurring transactions that fall due".to_string(),
            },
            Arc::new(StubJob),
        )?;
        table.declare(
            ScheduleDeclaration {
                name: CHECK_BUDGET_ALERTS.to_string(),
                owner: Component::Budgets,
                trigger: Trigger::every_hours(6)?,
                description: "Notify users whose spending crossed a budget threshold".to_string(),
            },
            Arc::new(StubJob),
        )?;
        Ok(table)
    }

    pub fn declare(
        &mut self,
        declaration: ScheduleDeclaration,
        handler: Arc<dyn JobHandler>,
    ) -> Result<()> {
        if self.get(&declaration.name).is_some() {
            return Err(ApiError::InvalidConfigValueError {
                field: "jobs".to_string(),
                value: declaration.name,
                reason: "Job is already declared".to_string(),
            });
        }
        self.jobs.push(ScheduledJob {
            declaration,
            handler,
        });
        Ok(())
    }

    /// 替換工作的動作，觸發條件不變
    pub fn register_handler(&mut self, name: &str, handler: Arc<dyn JobHandler>) -> Result<()> {
        let job = self
            .jobs
            .iter_mut()
            .find(|j| j.declaration.name == name)
            .ok_or_else(|| ApiError::UnknownJob {
                name: name.to_string(),
            })?;
        job.handler = handler;
        Ok(())
    }

    pub fn declarations(&self) -> impl Iterator<Item = &ScheduleDeclaration> {
        self.jobs.iter().map(|j| &j.declaration)
    }

    pub fn get(&self, name: &str) -> Option<&ScheduleDeclaration> {
        self.declarations().find(|d| d.name == name)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// 最近一次觸發時間，以及該時間要執行的所有工作
    pub fn next_fire(&self, after: DateTime<Utc>) -> Option<(DateTime<Utc>, Vec<String>)> {
        let fire_at = self
            .declarations()
            .map(|d| d.trigger.next_after(after))
            .min()?;
        let names = self
            .declarations()
            .filter(|d| d.trigger.next_after(after) == fire_at)
            .map(|d| d.name.clone())
            .collect();
        Some((fire_at, names))
    }

    /// 在 (previous, now] 區間內應觸發的工作
    pub fn due_between(&self, previous: DateTime<Utc>, now: DateTime<Utc>) -> Vec<String> {
        self.declarations()
            .filter(|d| d.trigger.next_after(previous) <= now)
            .map(|d| d.name.clone())
            .collect()
    }

    /// 執行一次工作；動作失敗會記錄在 `JobRun.status`，未知名稱則回傳錯誤
    pub async fn execute(&self, name: &str, scheduled_for: DateTime<Utc>) -> Result<JobRun> {
        let job = self
            .jobs
            .iter()
            .find(|j| j.declaration.name == name)
            .ok_or_else(|| ApiError::UnknownJob {
                name: name.to_string(),
            })?;

        let context = JobContext::new(name, scheduled_for);
        let started_at = Utc::now();
        let start_time = Instant::now();

        tracing::info!(job = %name, run_id = %context.run_id, "▶️ Running job");
        let outcome = job.handler.run(&context).await;
        let duration = start_time.elapsed();

        let run = match outcome {
            Ok(report) => {
                tracing::info!(job = %name, ?duration, "✅ Job completed: {}", report.message);
                JobRun {
                    job_name: name.to_string(),
                    run_id: context.run_id,
                    scheduled_for,
                    started_at,
                    duration,
                    status: JobStatus::Succeeded,
                    message: report.message,
                    metadata: report.metadata,
                }
            }
            Err(e) => {
                tracing::error!(job = %name, ?duration, "❌ Job failed: {}", e);
                JobRun {
                    job_name: name.to_string(),
                    run_id: context.run_id,
                    scheduled_for,
                    started_at,
                    duration,
                    status: JobStatus::Failed {
                        reason: e.to_string(),
                    },
                    message: e.user_friendly_message(),
                    metadata: HashMap::new(),
                }
            }
        };

        Ok(run)
    }

    /// 執行摘要
    pub fn execution_summary(runs: &[JobRun]) -> HashMap<String, serde_json::Value> {
        let mut summary = HashMap::new();

        let succeeded = runs.iter().filter(|r| r.succeeded()).count();
        let total_duration: std::time::Duration = runs.iter().map(|r| r.duration).sum();

        summary.insert("total_runs".to_string(), serde_json::Value::Number(runs.len().into()));
        summary.insert("succeeded".to_string(), serde_json::Value::Number(succeeded.into()));
        summary.insert(
            "failed".to_string(),
            serde_json::Value::Number((runs.len() - succeeded).into()),
        );
        summary.insert(
            "total_duration_ms".to_string(),
            serde_json::Value::Number((total_duration.as_millis() as u64).into()),
        );

        let job_names: Vec<serde_json::Value> = runs
            .iter()
            .map(|r| serde_json::Value::String(r.job_name.clone()))
            .collect();
        summary.insert("executed_jobs".to_string(), serde_json::Value::Array(job_names));

        summary
    }
}

impl Default for JobTable {
    fn default() -> Self {
        Self::new()
    }
}
