use crate::config::settings::TaskSettings;
use crate::core::jobs::JobTable;
use crate::domain::model::{JobRun, JobStatus};
use crate::utils::error::{ApiError, Result};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// 派送結果：同步模式直接拿到 `JobRun`，否則是背景任務
pub enum Dispatched {
    Completed(JobRun),
    Deferred(JoinHandle<Result<JobRun>>),
}

impl Dispatched {
    /// 等待背景任務結束
    pub async fn wait(self) -> Result<JobRun> {
        match self {
            Dispatched::Completed(run) => Ok(run),
            Dispatched::Deferred(handle) => handle.await.map_err(|e| ApiError::JobFailed {
                job: "background task".to_string(),
                details: e.to_string(),
            })?,
        }
    }
}

#[derive(Clone)]
pub struct JobDispatcher {
    table: Arc<JobTable>,
    tasks: TaskSettings,
}

impl JobDispatcher {
    pub fn new(table: Arc<JobTable>, tasks: TaskSettings) -> Self {
        Self { table, tasks }
    }

    pub fn table(&self) -> &JobTable {
        &self.table
    }

    pub async fn dispatch(&self, name: &str, scheduled_for: DateTime<Utc>) -> Result<Dispatched> {
        if self.table.get(name).is_none() {
            return Err(ApiError::UnknownJob {
                name: name.to_string(),
            });
        }

        if self.tasks.always_eager {
            let run = self.table.execute(name, scheduled_for).await?;
            if self.tasks.eager_propagates {
                if let JobStatus::Failed { reason } = &run.status {
                    return Err(ApiError::JobFailed {
                        job: run.job_name.clone(),
                        details: reason.clone(),
                    });
                }
            }
            return Ok(Dispatched::Completed(run));
        }

        tracing::debug!(job = %name, broker = %self.tasks.broker_url, "Queueing job");
        let table = Arc::clone(&self.table);
        let name = name.to_string();
        let handle = tokio::spawn(async move { table.execute(&name, scheduled_for).await });
        Ok(Dispatched::Deferred(handle))
    }
}

/// 依觸發條件循環派送工作，直到收到關閉訊號
pub struct Scheduler {
    dispatcher: JobDispatcher,
}

impl Scheduler {
    pub fn new(dispatcher: JobDispatcher) -> Self {
        Self { dispatcher }
    }

    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!(
            jobs = self.dispatcher.table().len(),
            "⏰ Scheduler started"
        );

        let mut last_fired: Option<DateTime<Utc>> = None;

        loop {
            let now = Utc::now();
            // 時鐘倒退或睡眠提早結束時，不重複派送已觸發過的時段
            let after = last_fired.map_or(now, |last| last.max(now));
            let Some((fire_at, names)) = self.dispatcher.table().next_fire(after) else {
                tracing::warn!("⚠️ No jobs declared, scheduler idle");
                shutdown.as_mut().await;
                break;
            };

            let wait = (fire_at - now).to_std().unwrap_or_default();
            tracing::debug!(next = %fire_at, ?names, "Waiting for next trigger");

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(wait) => {}
            }

            last_fired = Some(fire_at);
            for name in names {
                match self.dispatcher.dispatch(&name, fire_at).await {
                    Ok(Dispatched::Completed(run)) if !run.succeeded() => {
                        tracing::warn!(job = %name, "⚠️ Job run recorded as failed");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(
                            job = %name,
                            "❌ Dispatch failed: {} (Category: {:?}, Severity: {:?})",
                            e,
                            e.category(),
                            e.severity()
                        );
                    }
                }
            }
        }

        tracing::info!("Scheduler stopped");
        Ok(())
    }
}
