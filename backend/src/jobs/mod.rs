// Background jobs
//
// Scheduled with tokio-cron-scheduler. The only job today reconciles workflow
// executions that never reached a terminal state.

pub mod scheduler;
pub mod stale_executions;

pub use scheduler::{JobConfig, JobError, JobResult, JobScheduler};
pub use stale_executions::{StaleExecutionJob, StaleSweepResult};
