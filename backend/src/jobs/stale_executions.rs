use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use super::scheduler::{JobError, JobResult};
use crate::automation::ExecutionStore;

pub const ABANDONED_MESSAGE: &str = "execution abandoned before reaching a terminal state";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleSweepResult {
    pub executions_failed: u64,
}

/// Marks `running` executions older than `max_age_minutes` as failed so a
/// crashed process never leaves history stuck mid-run.
pub struct StaleExecutionJob {
    store: Arc<dyn ExecutionStore>,
    max_age_minutes: i64,
}

impl StaleExecutionJob {
    pub fn new(store: Arc<dyn ExecutionStore>, max_age_minutes: i64) -> Self {
        Self { store, max_age_minutes }
    }

    pub async fn run(&self) -> JobResult<StaleSweepResult> {
        if self.max_age_minutes <= 0 {
            return Err(JobError::ConfigError(format!(
                "stale execution age must be positive, got {} minutes",
                self.max_age_minutes
            )));
        }

        let cutoff = Utc::now() - Duration::minutes(self.max_age_minutes);
        let executions_failed = self
            .store
            .fail_stale_executions(cutoff, ABANDONED_MESSAGE)
            .await
            .map_err(|e| JobError::ExecutionError(e.to_string()))?;

        if executions_failed > 0 {
            warn!("Failed {} executions started before {}", executions_failed, cutoff);
        } else {
            info!("No stale executions found");
        }

        Ok(StaleSweepResult { executions_failed })
    }
}
