//! `PostgreSQL` suspension scheduler backed by the `suspension_jobs` table.

use super::{
    TaskPgPool,
    models::{NewSuspensionJobRow, SuspensionJobRow},
    schema::suspension_jobs,
};
use crate::task::{
    domain::{SuspensionJobId, TaskId},
    ports::{SchedulerError, SchedulerResult, SuspensionJob, SuspensionScheduler},
};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Timestamptz};
use mockable::{Clock, DefaultClock};
use std::sync::Arc;
use std::time::Duration;

/// Leases due jobs atomically; concurrent workers skip rows locked by others.
const CLAIM_DUE_SQL: &str = concat!(
    "UPDATE suspension_jobs SET leased_until = $2, deliveries = deliveries + 1 ",
    "WHERE id IN (",
    "SELECT id FROM suspension_jobs ",
    "WHERE wake_at <= $1 AND (leased_until IS NULL OR leased_until <= $1) ",
    "ORDER BY wake_at LIMIT $3 FOR UPDATE SKIP LOCKED) ",
    "RETURNING id, task_id, wake_at, leased_until, deliveries, created_at",
);

/// `PostgreSQL`-backed implementation of [`SuspensionScheduler`].
#[derive(Clone)]
pub struct PostgresSuspensionScheduler<C: Clock + Send + Sync = DefaultClock> {
    pool: TaskPgPool,
    clock: Arc<C>,
}

impl PostgresSuspensionScheduler {
    /// Creates a scheduler using the system clock for registration times.
    #[must_use]
    pub fn new(pool: TaskPgPool) -> Self {
        Self::with_clock(pool, Arc::new(DefaultClock))
    }
}

impl<C: Clock + Send + Sync> PostgresSuspensionScheduler<C> {
    /// Creates a scheduler with an explicit clock.
    #[must_use]
    pub const fn with_clock(pool: TaskPgPool, clock: Arc<C>) -> Self {
        Self { pool, clock }
    }

    async fn run_blocking<F, T>(&self, f: F) -> SchedulerResult<T>
    where
        F: FnOnce(&mut PgConnection) -> SchedulerResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(SchedulerError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(SchedulerError::persistence)?
    }
}

#[async_trait]
impl<C: Clock + Send + Sync + 'static> SuspensionScheduler for PostgresSuspensionScheduler<C> {
    async fn schedule(
        &self,
        task_id: TaskId,
        wake_at: DateTime<Utc>,
    ) -> SchedulerResult<SuspensionJobId> {
        let job_id = SuspensionJobId::new();
        let new_row = NewSuspensionJobRow {
            id: job_id.into_inner(),
            task_id: task_id.into_inner(),
            wake_at,
            created_at: self.clock.utc(),
        };

        self.run_blocking(move |connection| {
            diesel::insert_into(suspension_jobs::table)
                .values(&new_row)
                .execute(connection)
                .map_err(SchedulerError::persistence)?;
            Ok(job_id)
        })
        .await
    }

    async fn cancel(&self, job: SuspensionJobId) -> SchedulerResult<()> {
        self.run_blocking(move |connection| delete_job(connection, job)).await
    }

    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        lease: Duration,
        limit: usize,
    ) -> SchedulerResult<Vec<SuspensionJob>> {
        let leased_until = TimeDelta::from_std(lease)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .ok_or(SchedulerError::InvalidLease(lease))?;
        let row_limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.run_blocking(move |connection| {
            let rows = diesel::sql_query(CLAIM_DUE_SQL)
                .bind::<Timestamptz, _>(now)
                .bind::<Timestamptz, _>(leased_until)
                .bind::<BigInt, _>(row_limit)
                .load::<SuspensionJobRow>(connection)
                .map_err(SchedulerError::persistence)?;
            let mut jobs: Vec<SuspensionJob> = rows.into_iter().map(row_to_job).collect();
            jobs.sort_by_key(|job| job.wake_at);
            Ok(jobs)
        })
        .await
    }

    async fn acknowledge(&self, job: SuspensionJobId) -> SchedulerResult<()> {
        self.run_blocking(move |connection| delete_job(connection, job)).await
    }
}

fn delete_job(connection: &mut PgConnection, job: SuspensionJobId) -> SchedulerResult<()> {
    diesel::delete(suspension_jobs::table.filter(suspension_jobs::id.eq(job.into_inner())))
        .execute(connection)
        .map_err(SchedulerError::persistence)?;
    Ok(())
}

fn row_to_job(row: SuspensionJobRow) -> SuspensionJob {
    SuspensionJob {
        id: SuspensionJobId::from_uuid(row.id),
        task_id: TaskId::from_uuid(row.task_id),
        wake_at: row.wake_at,
        deliveries: row.deliveries.unsigned_abs(),
    }
}
