//! Background worker that resumes suspended tasks when their wake-up is due.

use super::{
    LifecycleEngine, LifecycleError, LifecycleErrorKind, LifecycleResult, SuspensionWorkerConfig,
};
use crate::task::{
    domain::RejectionReason,
    ports::{SuspensionJob, SuspensionScheduler, TaskStore},
};
use mockable::Clock;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Counts of what a single poll did with the jobs it claimed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Jobs leased by this poll.
    pub claimed: usize,
    /// Jobs that resumed their task.
    pub resumed: usize,
    /// Jobs acknowledged without effect because the task had moved on.
    pub dropped: usize,
    /// Jobs left leased for redelivery after a transient failure.
    pub deferred: usize,
}

enum JobOutcome {
    Resumed,
    Dropped,
    Deferred,
}

/// Polls the scheduler for due jobs and fires scheduled resumes.
///
/// Jobs are only acknowledged once the resume committed or can never
/// succeed. Conflicts and backend failures leave the job leased so it is
/// redelivered after the lease expires.
pub struct SuspensionWorker<S, J, C>
where
    S: TaskStore,
    J: SuspensionScheduler,
    C: Clock + Send + Sync,
{
    engine: LifecycleEngine<S, J, C>,
    config: SuspensionWorkerConfig,
}

impl<S, J, C> Clone for SuspensionWorker<S, J, C>
where
    S: TaskStore,
    J: SuspensionScheduler,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            config: self.config,
        }
    }
}

impl<S, J, C> SuspensionWorker<S, J, C>
where
    S: TaskStore,
    J: SuspensionScheduler,
    C: Clock + Send + Sync,
{
    /// Creates a worker driving the given engine.
    #[must_use]
    pub const fn new(engine: LifecycleEngine<S, J, C>, config: SuspensionWorkerConfig) -> Self {
        Self { engine, config }
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &SuspensionWorkerConfig {
        &self.config
    }

    /// Claims due jobs once and processes them in wake-time order.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Scheduler`] when jobs cannot be claimed.
    /// Failures for individual jobs are logged and reported in the
    /// [`PollReport`].
    pub async fn run_once(&self) -> LifecycleResult<PollReport> {
        let jobs = self
            .engine
            .scheduler()
            .claim_due(self.engine.now(), self.config.lease, self.config.batch_size)
            .await?;

        let mut report = PollReport {
            claimed: jobs.len(),
            ..PollReport::default()
        };
        for job in jobs {
            match self.process(&job).await {
                JobOutcome::Resumed => report.resumed += 1,
                JobOutcome::Dropped => report.dropped += 1,
                JobOutcome::Deferred => report.deferred += 1,
            }
        }
        Ok(report)
    }

    /// Polls until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: &CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            poll_interval_ms = self.config.poll_interval.as_millis(),
            lease_ms = self.config.lease.as_millis(),
            batch_size = self.config.batch_size,
            "suspension worker started"
        );

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => match self.run_once().await {
                    Ok(report) if report.claimed > 0 => debug!(
                        claimed = report.claimed,
                        resumed = report.resumed,
                        dropped = report.dropped,
                        deferred = report.deferred,
                        "suspension poll finished"
                    ),
                    Ok(_) => {}
                    Err(err) => warn!(error = %err, "suspension poll failed"),
                },
            }
        }
        info!("suspension worker stopped");
    }

    async fn process(&self, job: &SuspensionJob) -> JobOutcome {
        let outcome = match self.engine.fire_scheduled_resume(job.task_id, job.id).await {
            Ok(task) => {
                info!(
                    task_id = %job.task_id,
                    job_id = %job.id,
                    status = %task.status(),
                    "suspended task resumed"
                );
                JobOutcome::Resumed
            }
            Err(err) if awaiting_commit(job, &err) => {
                debug!(
                    task_id = %job.task_id,
                    job_id = %job.id,
                    reason = %err,
                    "suspension wake-up fired before its transition committed"
                );
                return JobOutcome::Deferred;
            }
            Err(err) if is_permanent(&err) => {
                debug!(
                    task_id = %job.task_id,
                    job_id = %job.id,
                    reason = %err,
                    "dropping late suspension wake-up"
                );
                JobOutcome::Dropped
            }
            Err(err) => {
                warn!(
                    task_id = %job.task_id,
                    job_id = %job.id,
                    error = %err,
                    "scheduled resume deferred"
                );
                return JobOutcome::Deferred;
            }
        };

        if let Err(err) = self.engine.scheduler().acknowledge(job.id).await {
            warn!(job_id = %job.id, error = %err, "failed to acknowledge suspension job");
        }
        outcome
    }
}

/// A job is scheduled before the suspending transition commits, so its
/// first delivery can find the task still active. The lease is left to
/// expire and the job is dropped only if the task is still active on
/// redelivery.
const fn awaiting_commit(job: &SuspensionJob, err: &LifecycleError) -> bool {
    job.deliveries <= 1
        && matches!(err.rejection(), Some(RejectionReason::ActionNotAllowed))
}

const fn is_permanent(err: &LifecycleError) -> bool {
    matches!(
        err.kind(),
        LifecycleErrorKind::InvalidTransition
            | LifecycleErrorKind::NotFound
            | LifecycleErrorKind::Forbidden
            | LifecycleErrorKind::InvalidRequest
    )
}
