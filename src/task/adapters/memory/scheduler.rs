//! In-memory suspension scheduler.
//!
//! Jobs live only as long as the process, so this adapter does not satisfy
//! the durability requirement on its own. It implements the same peek-lock
//! protocol as the `PostgreSQL` adapter and is used by tests and by
//! embedders that persist jobs elsewhere.

use crate::task::{
    domain::{SuspensionJobId, TaskId},
    ports::{SchedulerError, SchedulerResult, SuspensionJob, SuspensionScheduler},
};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Thread-safe in-memory implementation of [`SuspensionScheduler`].
#[derive(Debug, Clone, Default)]
pub struct InMemorySuspensionScheduler {
    jobs: Arc<Mutex<HashMap<SuspensionJobId, ScheduledEntry>>>,
}

#[derive(Debug, Clone, Copy)]
struct ScheduledEntry {
    job: SuspensionJob,
    leased_until: Option<DateTime<Utc>>,
}

impl InMemorySuspensionScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all pending jobs ordered by wake instant.
    #[must_use]
    pub fn pending(&self) -> Vec<SuspensionJob> {
        let mut jobs: Vec<SuspensionJob> = self
            .jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|entry| entry.job)
            .collect();
        jobs.sort_by_key(|job| job.wake_at);
        jobs
    }

    /// Returns the pending job for a task, if any.
    #[must_use]
    pub fn pending_for(&self, task_id: TaskId) -> Option<SuspensionJob> {
        self.pending().into_iter().find(|job| job.task_id == task_id)
    }
}

fn poisoned(err: impl std::fmt::Display) -> SchedulerError {
    SchedulerError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl SuspensionScheduler for InMemorySuspensionScheduler {
    async fn schedule(
        &self,
        task_id: TaskId,
        wake_at: DateTime<Utc>,
    ) -> SchedulerResult<SuspensionJobId> {
        let job = SuspensionJob {
            id: SuspensionJobId::new(),
            task_id,
            wake_at,
            deliveries: 0,
        };
        let mut jobs = self.jobs.lock().map_err(poisoned)?;
        jobs.insert(
            job.id,
            ScheduledEntry {
                job,
                leased_until: None,
            },
        );
        Ok(job.id)
    }

    async fn cancel(&self, job: SuspensionJobId) -> SchedulerResult<()> {
        let mut jobs = self.jobs.lock().map_err(poisoned)?;
        jobs.remove(&job);
        Ok(())
    }

    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        lease: Duration,
        limit: usize,
    ) -> SchedulerResult<Vec<SuspensionJob>> {
        let lease_delta =
            TimeDelta::from_std(lease).map_err(|_| SchedulerError::InvalidLease(lease))?;
        let leased_until = now
            .checked_add_signed(lease_delta)
            .ok_or(SchedulerError::InvalidLease(lease))?;

        let mut jobs = self.jobs.lock().map_err(poisoned)?;
        let mut due: Vec<&mut ScheduledEntry> = jobs
            .values_mut()
            .filter(|entry| {
                entry.job.wake_at <= now && entry.leased_until.is_none_or(|until| until <= now)
            })
            .collect();
        due.sort_by_key(|entry| entry.job.wake_at);

        Ok(due
            .into_iter()
            .take(limit)
            .map(|entry| {
                entry.leased_until = Some(leased_until);
                entry.job.deliveries = entry.job.deliveries.saturating_add(1);
                entry.job
            })
            .collect())
    }

    async fn acknowledge(&self, job: SuspensionJobId) -> SchedulerResult<()> {
        self.cancel(job).await
    }
}
