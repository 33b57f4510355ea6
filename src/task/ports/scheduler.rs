//! Scheduler port for durable, cancelable suspension wake-ups.

use crate::task::domain::{SuspensionJobId, TaskId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result type for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// A pending wake-up for a suspended task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuspensionJob {
    /// Job handle.
    pub id: SuspensionJobId,
    /// Task to resume.
    pub task_id: TaskId,
    /// Instant at which the task should be resumed.
    pub wake_at: DateTime<Utc>,
    /// Number of times the job has been claimed, including the current claim.
    pub deliveries: u32,
}

/// Durable timer contract.
///
/// The job store, not process memory, is authoritative: jobs survive
/// restarts and are delivered at least once. Delivery uses a peek-lock
/// protocol: [`SuspensionScheduler::claim_due`] leases due jobs, the caller
/// handles them and then calls [`SuspensionScheduler::acknowledge`]. A job
/// whose lease expires without acknowledgement becomes claimable again.
#[async_trait]
pub trait SuspensionScheduler: Send + Sync {
    /// Durably records that `task_id` must be resumed at `wake_at`.
    async fn schedule(
        &self,
        task_id: TaskId,
        wake_at: DateTime<Utc>,
    ) -> SchedulerResult<SuspensionJobId>;

    /// Cancels a pending job. Cancelling an unknown job is not an error.
    ///
    /// Cancellation is best-effort: a job already claimed by a worker may
    /// still fire.
    async fn cancel(&self, job: SuspensionJobId) -> SchedulerResult<()>;

    /// Leases up to `limit` jobs due at `now` for `lease`.
    ///
    /// Each claim increments the job's delivery count.
    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        lease: Duration,
        limit: usize,
    ) -> SchedulerResult<Vec<SuspensionJob>>;

    /// Removes a handled job. Acknowledging an unknown job is not an error.
    async fn acknowledge(&self, job: SuspensionJobId) -> SchedulerResult<()>;
}

/// Errors returned by scheduler implementations.
#[derive(Debug, Clone, Error)]
pub enum SchedulerError {
    /// The lease duration cannot be represented.
    #[error("invalid lease duration: {0:?}")]
    InvalidLease(Duration),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl SchedulerError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
