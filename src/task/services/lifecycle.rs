//! Lifecycle engine orchestrating task creation and transitions.

use crate::task::{
    domain::{
        ActionKind, Actor, GroupId, Initiator, NewTaskInstance, ProcessRef, RejectionReason,
        SchedulerEffect, SuspensionJobId, TaskDomainError, TaskId, TaskInstance, TaskMetadata,
        TaskStatus, TerminateReason, TransitionContext, TransitionOutcome, UserId,
    },
    ports::{SchedulerError, SuspensionScheduler, TaskStore, TaskStoreError},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Request payload for creating a task on behalf of the process engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateTaskRequest {
    task_name: String,
    potential_users: Vec<String>,
    potential_groups: Vec<String>,
    admin_users: Vec<String>,
    admin_groups: Vec<String>,
    inputs: Map<String, Value>,
    metadata: TaskMetadata,
    process_ref: Option<ProcessRef>,
}

impl CreateTaskRequest {
    /// Creates a request with a display label and no assignment.
    #[must_use]
    pub fn new(task_name: impl Into<String>) -> Self {
        Self {
            task_name: task_name.into(),
            ..Self::default()
        }
    }

    /// Sets potential users.
    #[must_use]
    pub fn with_potential_users<I, U>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<String>,
    {
        self.potential_users = users.into_iter().map(Into::into).collect();
        self
    }

    /// Sets potential groups.
    #[must_use]
    pub fn with_potential_groups<I, G>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<String>,
    {
        self.potential_groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Sets administrative users.
    #[must_use]
    pub fn with_admin_users<I, U>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<String>,
    {
        self.admin_users = users.into_iter().map(Into::into).collect();
        self
    }

    /// Sets administrative groups.
    #[must_use]
    pub fn with_admin_groups<I, G>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: Into<String>,
    {
        self.admin_groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// Sets initial inputs.
    #[must_use]
    pub fn with_inputs(mut self, inputs: Map<String, Value>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Sets initial metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: TaskMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Sets the owning process reference.
    #[must_use]
    pub fn with_process_ref(mut self, process_ref: ProcessRef) -> Self {
        self.process_ref = Some(process_ref);
        self
    }

    fn into_new_instance(self) -> Result<NewTaskInstance, TaskDomainError> {
        Ok(NewTaskInstance {
            task_name: self.task_name,
            potential_users: identities(self.potential_users, UserId::new)?,
            potential_groups: identities(self.potential_groups, GroupId::new)?,
            admin_users: identities(self.admin_users, UserId::new)?,
            admin_groups: identities(self.admin_groups, GroupId::new)?,
            inputs: self.inputs,
            metadata: self.metadata,
            process_ref: self.process_ref,
        })
    }
}

fn identities<T: Ord>(
    raw: Vec<String>,
    parse: impl Fn(String) -> Result<T, TaskDomainError>,
) -> Result<BTreeSet<T>, TaskDomainError> {
    raw.into_iter().map(parse).collect()
}

/// A transition request from an authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    task_id: TaskId,
    action: ActionKind,
    actor: Actor,
    payload: Map<String, Value>,
}

impl TransitionRequest {
    /// Creates a request with an empty payload.
    #[must_use]
    pub fn new(task_id: TaskId, action: ActionKind, actor: Actor) -> Self {
        Self {
            task_id,
            action,
            actor,
            payload: Map::new(),
        }
    }

    /// Replaces the payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = payload;
        self
    }

    /// Adds a single payload entry.
    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }
}

/// Task state returned to the caller after a successful transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionResponse {
    /// Task identifier.
    pub task_id: TaskId,
    /// Status after the transition.
    pub status: TaskStatus,
    /// Termination reason, once terminal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminate_reason: Option<TerminateReason>,
    /// Actual owner, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_owner: Option<UserId>,
    /// Potential users.
    pub potential_users: BTreeSet<UserId>,
    /// Outputs.
    pub outputs: Map<String, Value>,
    /// Metadata.
    pub metadata: TaskMetadata,
    /// Version committed by the transition.
    pub version: u64,
}

impl From<&TaskInstance> for TransitionResponse {
    fn from(task: &TaskInstance) -> Self {
        Self {
            task_id: task.id(),
            status: task.status(),
            terminate_reason: task.terminate_reason(),
            actual_owner: task.actual_owner().cloned(),
            potential_users: task.potential_users().clone(),
            outputs: task.outputs().clone(),
            metadata: task.metadata().clone(),
            version: task.version(),
        }
    }
}

/// Service-level errors for lifecycle operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The action is not defined for the current status, or a guard failed.
    #[error("cannot {action} task {task_id} in status {status}: {reason}")]
    InvalidTransition {
        /// Task the transition targeted.
        task_id: TaskId,
        /// Requested action.
        action: ActionKind,
        /// Status at the time of the request.
        status: TaskStatus,
        /// Why the transition was rejected.
        reason: RejectionReason,
    },
    /// The initiator is not permitted to perform the action.
    #[error("{initiator} may not {action} task {task_id}")]
    Forbidden {
        /// Task the transition targeted.
        task_id: TaskId,
        /// Requested action.
        action: ActionKind,
        /// Rendered initiator identity.
        initiator: String,
    },
    /// Another transition committed first; reload and retry.
    #[error("task {0} was modified concurrently")]
    Conflict(TaskId),
    /// No task exists with the given identifier.
    #[error("task {0} not found")]
    NotFound(TaskId),
    /// A creation request carried unusable data.
    #[error("invalid task request: {0}")]
    InvalidRequest(#[source] TaskDomainError),
    /// The task store is unavailable or failed.
    #[error(transparent)]
    Store(#[from] TaskStoreError),
    /// The suspension scheduler is unavailable or failed.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

impl From<TaskDomainError> for LifecycleError {
    fn from(err: TaskDomainError) -> Self {
        match err {
            TaskDomainError::InvalidTransition {
                task_id,
                action,
                status,
                reason,
            } => Self::InvalidTransition {
                task_id,
                action,
                status,
                reason,
            },
            TaskDomainError::Forbidden {
                task_id,
                action,
                initiator,
            } => Self::Forbidden {
                task_id,
                action,
                initiator,
            },
            TaskDomainError::EmptyIdentity => Self::InvalidRequest(err),
        }
    }
}

/// Coarse classification of [`LifecycleError`] for external callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleErrorKind {
    /// Action not defined for the status, or a guard failed.
    InvalidTransition,
    /// The actor failed authorization.
    Forbidden,
    /// The optimistic write lost a race.
    Conflict,
    /// Unknown task.
    NotFound,
    /// Malformed request data outside of a transition.
    InvalidRequest,
    /// A backing store could not be reached.
    Unavailable,
}

impl LifecycleError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> LifecycleErrorKind {
        match self {
            Self::InvalidTransition { .. } => LifecycleErrorKind::InvalidTransition,
            Self::Forbidden { .. } => LifecycleErrorKind::Forbidden,
            Self::InvalidRequest(_) => LifecycleErrorKind::InvalidRequest,
            Self::Conflict(_) => LifecycleErrorKind::Conflict,
            Self::NotFound(_) => LifecycleErrorKind::NotFound,
            Self::Store(_) | Self::Scheduler(_) => LifecycleErrorKind::Unavailable,
        }
    }

    /// Returns `true` for outcomes the caller can act on locally.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self.kind(), LifecycleErrorKind::Unavailable)
    }

    /// Returns the rejection reason of an invalid transition.
    #[must_use]
    pub const fn rejection(&self) -> Option<&RejectionReason> {
        match self {
            Self::InvalidTransition { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Orchestrates task transitions against a store and a suspension scheduler.
///
/// Every transition loads the task fresh, evaluates authorization and the
/// transition table against that snapshot and commits with a single
/// compare-and-swap. A lost race is reported as
/// [`LifecycleError::Conflict`]; the engine never retries on its own since
/// the outcome may differ against the newer state.
pub struct LifecycleEngine<S, J, C>
where
    S: TaskStore,
    J: SuspensionScheduler,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    scheduler: Arc<J>,
    clock: Arc<C>,
}

impl<S, J, C> Clone for LifecycleEngine<S, J, C>
where
    S: TaskStore,
    J: SuspensionScheduler,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            scheduler: Arc::clone(&self.scheduler),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S, J, C> LifecycleEngine<S, J, C>
where
    S: TaskStore,
    J: SuspensionScheduler,
    C: Clock + Send + Sync,
{
    /// Creates a new lifecycle engine.
    #[must_use]
    pub const fn new(store: Arc<S>, scheduler: Arc<J>, clock: Arc<C>) -> Self {
        Self {
            store,
            scheduler,
            clock,
        }
    }

    /// Creates and stores a task with its computed initial status.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidRequest`] when an identity is blank and
    /// [`LifecycleError::Store`] when persistence fails.
    pub async fn create(&self, request: CreateTaskRequest) -> LifecycleResult<TaskInstance> {
        let task = TaskInstance::create(request.into_new_instance()?, &*self.clock);
        self.store.insert(&task).await?;
        info!(
            task_id = %task.id(),
            task_name = task.task_name(),
            status = %task.status(),
            "human task created"
        );
        Ok(task)
    }

    /// Loads the latest committed state of a task.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] for unknown tasks and
    /// [`LifecycleError::Store`] when persistence fails.
    pub async fn get(&self, task_id: TaskId) -> LifecycleResult<TaskInstance> {
        self.store
            .load(task_id)
            .await?
            .ok_or(LifecycleError::NotFound(task_id))
    }

    /// Applies a caller-requested transition.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] for unknown tasks,
    /// [`LifecycleError::InvalidTransition`] or [`LifecycleError::Forbidden`]
    /// when the transition is rejected, [`LifecycleError::Conflict`] when a
    /// concurrent transition committed first, and store or scheduler failures.
    pub async fn apply(&self, request: TransitionRequest) -> LifecycleResult<TransitionResponse> {
        let TransitionRequest {
            task_id,
            action,
            actor,
            payload,
        } = request;
        let task = self
            .commit(task_id, action, &Initiator::User(actor), &payload)
            .await?;
        Ok(TransitionResponse::from(&task))
    }

    /// Resumes a task on behalf of a fired scheduler job.
    ///
    /// A job that fires after the task already left `Suspended`, or that no
    /// longer matches the task's recorded job, yields an invalid transition.
    ///
    /// # Errors
    ///
    /// Same as [`LifecycleEngine::apply`].
    pub async fn fire_scheduled_resume(
        &self,
        task_id: TaskId,
        job: SuspensionJobId,
    ) -> LifecycleResult<TaskInstance> {
        self.commit(
            task_id,
            ActionKind::Resume,
            &Initiator::Scheduler { job },
            &Map::new(),
        )
        .await
    }

    pub(crate) fn scheduler(&self) -> &J {
        &self.scheduler
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }

    async fn commit(
        &self,
        task_id: TaskId,
        action: ActionKind,
        initiator: &Initiator,
        payload: &Map<String, Value>,
    ) -> LifecycleResult<TaskInstance> {
        let current = self.get(task_id).await?;
        let context = TransitionContext {
            action,
            initiator,
            payload,
            now: self.clock.utc(),
        };
        let TransitionOutcome {
            instance: mut next,
            effect,
        } = current.apply(&context)?;

        let scheduled = if let SchedulerEffect::Schedule { wake_at } = effect {
            let job = self.scheduler.schedule(task_id, wake_at).await?;
            next.record_suspension_job(job);
            info!(task_id = %task_id, job_id = %job, %wake_at, "suspension wake-up scheduled");
            Some(job)
        } else {
            None
        };

        if !self.store.compare_and_swap(current.version(), &next).await? {
            if let Some(job) = scheduled {
                self.cancel_best_effort(task_id, job).await;
            }
            debug!(
                task_id = %task_id,
                %action,
                version = current.version(),
                "transition lost race"
            );
            return Err(LifecycleError::Conflict(task_id));
        }

        if let SchedulerEffect::Cancel { job } = effect {
            // A fired job is acknowledged by the worker that claimed it.
            if !matches!(initiator, Initiator::Scheduler { job: fired } if *fired == job) {
                self.cancel_best_effort(task_id, job).await;
            }
        }
        debug!(
            task_id = %task_id,
            %action,
            %initiator,
            from = %current.status(),
            to = %next.status(),
            version = next.version(),
            "transition committed"
        );
        Ok(next)
    }

    async fn cancel_best_effort(&self, task_id: TaskId, job: SuspensionJobId) {
        if let Err(err) = self.scheduler.cancel(job).await {
            warn!(
                task_id = %task_id,
                job_id = %job,
                error = %err,
                "failed to cancel suspension job"
            );
        }
    }
}
