use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::models::{RunReport, RunSummary};
use crate::runner::BatchRunner;
use crate::utils::error::{AppError, Result};
use crate::watchlist::load_watchlist;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInfo {
    pub id: Option<Uuid>,
    pub cron_expression: Option<String>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub last_run: Option<DateTime<Utc>>,
    pub run_count: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub skipped_count: u64,
    pub last_error: Option<String>,
    pub last_summary: Option<RunSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum JobStatus {
    Idle,
    Active,
    Stopped,
}

#[derive(Debug)]
pub enum TickOutcome {
    Completed(RunReport),
    /// The previous batch was still running.
    Skipped,
    Failed(String),
}

/// Re-runs the whole watch list on a cron schedule. The CSV is read again
/// on every tick so edits take effect without a restart.
pub struct BatchScheduler {
    scheduler: JobScheduler,
    runner: Arc<BatchRunner>,
    input: PathBuf,
    job: Arc<RwLock<JobInfo>>,
    running: Arc<Mutex<()>>,
    job_timeout: Duration,
}

impl BatchScheduler {
    pub async fn new(runner: Arc<BatchRunner>, input: PathBuf, config: &SchedulerConfig) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler,
            runner,
            input,
            job: Arc::new(RwLock::new(JobInfo {
                id: None,
                cron_expression: None,
                status: JobStatus::Idle,
                created_at: Utc::now(),
                last_run: None,
                run_count: 0,
                success_count: 0,
                error_count: 0,
                skipped_count: 0,
                last_error: None,
                last_summary: None,
            })),
            running: Arc::new(Mutex::new(())),
            job_timeout: Duration::from_secs(config.job_timeout_secs),
        })
    }

    pub async fn start(&mut self, cron_expression: &str) -> Result<Uuid> {
        let runner = Arc::clone(&self.runner);
        let input = self.input.clone();
        let job_info = Arc::clone(&self.job);
        let running = Arc::clone(&self.running);
        let job_timeout = self.job_timeout;

        let job = Job::new_async(cron_expression, move |_uuid, _l| {
            let runner = Arc::clone(&runner);
            let input = input.clone();
            let job_info = Arc::clone(&job_info);
            let running = Arc::clone(&running);

            Box::pin(async move {
                Self::execute_tick(runner, input, job_info, running, job_timeout).await;
            })
        })?;

        let id = self.scheduler.add(job).await?;
        self.scheduler.start().await?;

        {
            let mut info = self.job.write().await;
            info.id = Some(id);
            info.cron_expression = Some(cron_expression.to_string());
            info.status = JobStatus::Active;
        }

        tracing::info!("Batch scheduled with interval: {}", cron_expression);
        Ok(id)
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.scheduler.shutdown().await?;
        self.job.write().await.status = JobStatus::Stopped;
        tracing::info!("Batch scheduler shutdown");
        Ok(())
    }

    /// Run one batch immediately, outside of the schedule.
    pub async fn run_now(&self) -> TickOutcome {
        Self::execute_tick(
            Arc::clone(&self.runner),
            self.input.clone(),
            Arc::clone(&self.job),
            Arc::clone(&self.running),
            self.job_timeout,
        )
        .await
    }

    pub async fn job_info(&self) -> JobInfo {
        self.job.read().await.clone()
    }

    async fn execute_tick(
        runner: Arc<BatchRunner>,
        input: PathBuf,
        job_info: Arc<RwLock<JobInfo>>,
        running: Arc<Mutex<()>>,
        job_timeout: Duration,
    ) -> TickOutcome {
        let Ok(_guard) = running.try_lock() else {
            tracing::warn!("Previous batch still running, skipping this tick");
            job_info.write().await.skipped_count += 1;
            return TickOutcome::Skipped;
        };

        {
            let mut info = job_info.write().await;
            info.run_count += 1;
            info.last_run = Some(Utc::now());
        }

        tracing::debug!("Starting scheduled batch from {}", input.display());

        let batch = async {
            let watchlist = load_watchlist(&input)?;
            Ok::<_, AppError>(runner.run_batch(&watchlist.entries).await)
        };

        let outcome = match tokio::time::timeout(job_timeout, batch).await {
            Ok(Ok(report)) => TickOutcome::Completed(report),
            Ok(Err(e)) => TickOutcome::Failed(e.to_string()),
            Err(_) => TickOutcome::Failed(format!("batch timed out after {:?}", job_timeout)),
        };

        let mut info = job_info.write().await;
        match &outcome {
            TickOutcome::Completed(report) => {
                info.success_count += 1;
                info.last_error = None;
                info.last_summary = Some(report.summary.clone());
            }
            TickOutcome::Failed(error) => {
                tracing::error!("Scheduled batch failed: {}", error);
                info.error_count += 1;
                info.last_error = Some(error.clone());
            }
            TickOutcome::Skipped => {}
        }

        outcome
    }
}
