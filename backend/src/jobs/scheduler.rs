// Job Scheduler - runs background automation maintenance on a cron schedule

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler as TokioScheduler, JobSchedulerError};
use tracing::{error, info};
use uuid::Uuid;

use super::StaleExecutionJob;
use crate::automation::ExecutionStore;

const MAX_EXECUTION_LOGS: usize = 100;

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Scheduler error: {0}")]
    SchedulerError(#[from] JobSchedulerError),
    #[error("Job execution error: {0}")]
    ExecutionError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type JobResult<T> = Result<T, JobError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub stale_check_interval_minutes: u32,
    /// Age after which a running execution is failed
    pub stale_execution_minutes: i64,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            stale_check_interval_minutes: 5,
            stale_execution_minutes: 60,
        }
    }
}

impl JobConfig {
    pub fn stale_check_cron(&self) -> JobResult<String> {
        match self.stale_check_interval_minutes {
            0 => Err(JobError::ConfigError("stale check interval must be at least one minute".to_string())),
            minutes if minutes >= 60 => Ok("0 0 * * * *".to_string()),
            minutes => Ok(format!("0 */{} * * * *", minutes)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobExecutionLog {
    pub id: Uuid,
    pub job_name: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub status: JobStatus,
    pub items_processed: u64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Completed,
    Failed,
}

pub struct JobScheduler {
    scheduler: TokioScheduler,
    store: Arc<dyn ExecutionStore>,
    config: JobConfig,
    execution_logs: Arc<RwLock<Vec<JobExecutionLog>>>,
}

impl JobScheduler {
    pub async fn new(store: Arc<dyn ExecutionStore>, config: JobConfig) -> JobResult<Self> {
        let scheduler = TokioScheduler::new().await?;

        Ok(Self {
            scheduler,
            store,
            config,
            execution_logs: Arc::new(RwLock::new(Vec::new())),
        })
    }

    /// Sweep once immediately, then register the recurring jobs and start.
    pub async fn start(&self) -> JobResult<()> {
        info!("Starting background job scheduler");

        let job = StaleExecutionJob::new(self.store.clone(), self.config.stale_execution_minutes);
        run_stale_sweep(&job, &self.execution_logs).await;

        self.schedule_stale_sweep().await?;
        self.scheduler.start().await?;

        info!("Background job scheduler started successfully");
        Ok(())
    }

    pub async fn shutdown(&mut self) -> JobResult<()> {
        info!("Shutting down background job scheduler");
        self.scheduler.shutdown().await?;
        Ok(())
    }

    pub async fn execution_logs(&self) -> Vec<JobExecutionLog> {
        self.execution_logs.read().await.clone()
    }

    async fn schedule_stale_sweep(&self) -> JobResult<()> {
        let cron_expr = self.config.stale_check_cron()?;
        let store = self.store.clone();
        let max_age = self.config.stale_execution_minutes;
        let logs = self.execution_logs.clone();

        let job = Job::new_async(cron_expr.as_str(), move |_uuid, _lock| {
            let job = StaleExecutionJob::new(store.clone(), max_age);
            let logs = logs.clone();
            Box::pin(async move {
                run_stale_sweep(&job, &logs).await;
            })
        })?;

        self.scheduler.add(job).await?;
        info!(
            "Scheduled stale execution sweep every {} minutes",
            self.config.stale_check_interval_minutes
        );
        Ok(())
    }
}

async fn run_stale_sweep(job: &StaleExecutionJob, logs: &RwLock<Vec<JobExecutionLog>>) {
    let started_at = Utc::now();
    info!("Running stale execution sweep");

    let (status, items_processed, error) = match job.run().await {
        Ok(result) => (JobStatus::Completed, result.executions_failed, None),
        Err(e) => {
            error!("Stale execution sweep failed: {}", e);
            (JobStatus::Failed, 0, Some(e.to_string()))
        }
    };

    let mut logs = logs.write().await;
    logs.push(JobExecutionLog {
        id: Uuid::new_v4(),
        job_name: "Stale Execution Sweep".to_string(),
        started_at,
        completed_at: Utc::now(),
        status,
        items_processed,
        error,
    });
    if logs.len() > MAX_EXECUTION_LOGS {
        logs.remove(0);
    }
}
