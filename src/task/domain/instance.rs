//! Task instance aggregate root and its transition table.

use super::{
    ActionKind, AuthorizationResolver, FAILURE_MESSAGE, GroupId, Initiator, RejectionReason,
    SuspendUntil, SuspensionJobId, TaskDomainError, TaskId, TaskMetadata, TaskStatus,
    TerminateReason, TransitionAction, UserId,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Back-reference to the process that owns the task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRef {
    /// Process definition identifier.
    pub process_id: String,
    /// Process instance identifier.
    pub process_instance_id: String,
    /// Process definition version.
    pub process_version: String,
}

/// Assignment and payload for a task about to be created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTaskInstance {
    /// Display label.
    pub task_name: String,
    /// Users eligible to claim the task.
    pub potential_users: BTreeSet<UserId>,
    /// Groups eligible to claim the task.
    pub potential_groups: BTreeSet<GroupId>,
    /// Users with administrative rights.
    pub admin_users: BTreeSet<UserId>,
    /// Groups with administrative rights.
    pub admin_groups: BTreeSet<GroupId>,
    /// Initial inputs.
    pub inputs: Map<String, Value>,
    /// Initial metadata.
    pub metadata: TaskMetadata,
    /// Owning process, if any.
    pub process_ref: Option<ProcessRef>,
}

/// Human task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInstance {
    id: TaskId,
    task_name: String,
    status: TaskStatus,
    previous_active_status: Option<TaskStatus>,
    actual_owner: Option<UserId>,
    potential_users: BTreeSet<UserId>,
    potential_groups: BTreeSet<GroupId>,
    admin_users: BTreeSet<UserId>,
    admin_groups: BTreeSet<GroupId>,
    inputs: Map<String, Value>,
    outputs: Map<String, Value>,
    metadata: TaskMetadata,
    process_ref: Option<ProcessRef>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskInstance {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted display label.
    pub task_name: String,
    /// Persisted lifecycle status.
    pub status: TaskStatus,
    /// Status held before suspension, if suspended.
    pub previous_active_status: Option<TaskStatus>,
    /// Persisted actual owner.
    pub actual_owner: Option<UserId>,
    /// Persisted potential users.
    pub potential_users: BTreeSet<UserId>,
    /// Persisted potential groups.
    pub potential_groups: BTreeSet<GroupId>,
    /// Persisted administrative users.
    pub admin_users: BTreeSet<UserId>,
    /// Persisted administrative groups.
    pub admin_groups: BTreeSet<GroupId>,
    /// Persisted inputs.
    pub inputs: Map<String, Value>,
    /// Persisted outputs.
    pub outputs: Map<String, Value>,
    /// Persisted metadata.
    pub metadata: TaskMetadata,
    /// Persisted process back-reference.
    pub process_ref: Option<ProcessRef>,
    /// Persisted optimistic-concurrency version.
    pub version: u64,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest transition timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Inputs to a single transition attempt.
#[derive(Debug, Clone, Copy)]
pub struct TransitionContext<'a> {
    /// Requested action.
    pub action: ActionKind,
    /// Who is asking.
    pub initiator: &'a Initiator,
    /// Raw request payload.
    pub payload: &'a Map<String, Value>,
    /// Current instant, used to resolve relative wake times.
    pub now: DateTime<Utc>,
}

/// Scheduler work the caller must perform for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerEffect {
    /// Nothing to schedule or cancel.
    None,
    /// Register a wake-up job before committing the suspension.
    Schedule {
        /// Absolute wake instant.
        wake_at: DateTime<Utc>,
    },
    /// Cancel the job that would have resumed the task.
    Cancel {
        /// Job to cancel.
        job: SuspensionJobId,
    },
}

/// Result of applying a transition to an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    /// The instance after the transition, with its version bumped.
    pub instance: TaskInstance,
    /// Scheduler work implied by the transition.
    pub effect: SchedulerEffect,
}

impl TaskInstance {
    /// Creates a task, deriving its initial status from the assignment.
    ///
    /// A single potential user with no potential groups yields a `Reserved`
    /// task owned by that user; an empty assignment yields a `Created` task
    /// awaiting nomination; anything else yields a `Ready` task.
    #[must_use]
    pub fn create(new: NewTaskInstance, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        let (status, actual_owner) =
            initial_assignment(&new.potential_users, &new.potential_groups);

        Self {
            id: TaskId::new(),
            task_name: new.task_name,
            status,
            previous_active_status: None,
            actual_owner,
            potential_users: new.potential_users,
            potential_groups: new.potential_groups,
            admin_users: new.admin_users,
            admin_groups: new.admin_groups,
            inputs: new.inputs,
            outputs: Map::new(),
            metadata: new.metadata,
            process_ref: new.process_ref,
            version: 1,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskInstance) -> Self {
        Self {
            id: data.id,
            task_name: data.task_name,
            status: data.status,
            previous_active_status: data.previous_active_status,
            actual_owner: data.actual_owner,
            potential_users: data.potential_users,
            potential_groups: data.potential_groups,
            admin_users: data.admin_users,
            admin_groups: data.admin_groups,
            inputs: data.inputs,
            outputs: data.outputs,
            metadata: data.metadata,
            process_ref: data.process_ref,
            version: data.version,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the display label.
    #[must_use]
    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the status held before suspension; set only while suspended.
    #[must_use]
    pub const fn previous_active_status(&self) -> Option<TaskStatus> {
        self.previous_active_status
    }

    /// Returns the termination reason once the task is terminal.
    #[must_use]
    pub const fn terminate_reason(&self) -> Option<TerminateReason> {
        self.status.terminate_reason()
    }

    /// Returns the actual owner, if any.
    #[must_use]
    pub const fn actual_owner(&self) -> Option<&UserId> {
        self.actual_owner.as_ref()
    }

    /// Returns the potential users.
    #[must_use]
    pub const fn potential_users(&self) -> &BTreeSet<UserId> {
        &self.potential_users
    }

    /// Returns the potential groups.
    #[must_use]
    pub const fn potential_groups(&self) -> &BTreeSet<GroupId> {
        &self.potential_groups
    }

    /// Returns the administrative users.
    #[must_use]
    pub const fn admin_users(&self) -> &BTreeSet<UserId> {
        &self.admin_users
    }

    /// Returns the administrative groups.
    #[must_use]
    pub const fn admin_groups(&self) -> &BTreeSet<GroupId> {
        &self.admin_groups
    }

    /// Returns the inputs.
    #[must_use]
    pub const fn inputs(&self) -> &Map<String, Value> {
        &self.inputs
    }

    /// Returns the outputs.
    #[must_use]
    pub const fn outputs(&self) -> &Map<String, Value> {
        &self.outputs
    }

    /// Returns the metadata.
    #[must_use]
    pub const fn metadata(&self) -> &TaskMetadata {
        &self.metadata
    }

    /// Returns the owning process reference, if any.
    #[must_use]
    pub const fn process_ref(&self) -> Option<&ProcessRef> {
        self.process_ref.as_ref()
    }

    /// Returns the optimistic-concurrency version.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest transition timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Applies a transition without mutating `self`.
    ///
    /// Checks run in a fixed order: the action must be listed for the
    /// current status, the initiator must be authorized, and finally the
    /// payload and action-specific guards must hold.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidTransition`] for status mismatches
    /// and guard failures, and [`TaskDomainError::Forbidden`] when the
    /// initiator fails authorization.
    pub fn apply(
        &self,
        context: &TransitionContext<'_>,
    ) -> Result<TransitionOutcome, TaskDomainError> {
        let kind = context.action;
        if !kind.is_allowed_from(self.status) {
            return Err(self.rejected(kind, RejectionReason::ActionNotAllowed));
        }
        if !AuthorizationResolver::authorize(self, context.initiator, kind) {
            return Err(TaskDomainError::Forbidden {
                task_id: self.id,
                action: kind,
                initiator: context.initiator.to_string(),
            });
        }

        let action = TransitionAction::decode(kind, context.payload)
            .map_err(|reason| self.rejected(kind, reason))?;
        let mut next = self.clone();
        let effect = next
            .execute(action, context)
            .map_err(|reason| self.rejected(kind, reason))?;
        next.version += 1;
        next.updated_at = context.now;

        Ok(TransitionOutcome {
            instance: next,
            effect,
        })
    }

    /// Records the scheduler job registered for the current suspension.
    pub(crate) fn record_suspension_job(&mut self, job: SuspensionJobId) {
        self.metadata.suspended_task_job_id = Some(job);
    }

    fn execute(
        &mut self,
        action: TransitionAction,
        context: &TransitionContext<'_>,
    ) -> Result<SchedulerEffect, RejectionReason> {
        match action {
            TransitionAction::Claim => {
                self.actual_owner = context.initiator.actor().map(|actor| actor.user().clone());
                self.status = TaskStatus::Reserved;
            }
            TransitionAction::Start => self.status = TaskStatus::InProgress,
            TransitionAction::Stop => self.status = TaskStatus::Reserved,
            TransitionAction::Release => {
                self.actual_owner = None;
                self.status = TaskStatus::Ready;
            }
            TransitionAction::Complete { outputs } => {
                self.outputs.extend(outputs);
                self.status = TaskStatus::Completed;
            }
            TransitionAction::Fail { outputs, message } => {
                self.outputs.extend(outputs);
                if let Some(text) = message {
                    self.outputs.insert(FAILURE_MESSAGE.to_owned(), Value::String(text));
                }
                self.status = TaskStatus::Failed;
            }
            TransitionAction::Fault => self.status = TaskStatus::Error,
            TransitionAction::Skip => {
                if !self.metadata.skippable {
                    return Err(RejectionReason::NotSkippable);
                }
                self.status = TaskStatus::Obsolete;
            }
            TransitionAction::Exit => self.status = TaskStatus::Exited,
            TransitionAction::Delegate { user } => {
                self.potential_users.insert(user.clone());
                self.actual_owner = Some(user);
                self.status = TaskStatus::Reserved;
            }
            TransitionAction::Forward { users } => {
                self.potential_users.extend(users);
                if let Some(actor) = context.initiator.actor() {
                    self.potential_users.remove(actor.user());
                }
                self.actual_owner = None;
                self.status = TaskStatus::Ready;
            }
            TransitionAction::Nominate { users } => {
                self.potential_users = users;
                self.status = TaskStatus::Ready;
            }
            TransitionAction::Suspend { until } => return self.suspend(until, context.now),
            TransitionAction::Resume => return self.resume(context.initiator),
            TransitionAction::Update { inputs } => self.inputs.extend(inputs),
        }
        Ok(SchedulerEffect::None)
    }

    fn suspend(
        &mut self,
        until: Option<SuspendUntil>,
        now: DateTime<Utc>,
    ) -> Result<SchedulerEffect, RejectionReason> {
        let wake_at = until.map(|value| value.resolve(now)).transpose()?;
        self.previous_active_status = Some(self.status);
        self.status = TaskStatus::Suspended;
        self.metadata.clear_suspension();
        self.metadata.suspend_until = wake_at;
        Ok(wake_at.map_or(SchedulerEffect::None, |instant| SchedulerEffect::Schedule {
            wake_at: instant,
        }))
    }

    fn resume(&mut self, initiator: &Initiator) -> Result<SchedulerEffect, RejectionReason> {
        let pending_job = self.metadata.suspended_task_job_id;
        if matches!(initiator, Initiator::Scheduler { job } if pending_job != Some(*job)) {
            return Err(RejectionReason::StaleScheduledResume);
        }
        let previous = self
            .previous_active_status
            .take()
            .ok_or(RejectionReason::ActionNotAllowed)?;
        self.status = previous;
        self.metadata.clear_suspension();
        Ok(pending_job.map_or(SchedulerEffect::None, |job| SchedulerEffect::Cancel { job }))
    }

    fn rejected(&self, action: ActionKind, reason: RejectionReason) -> TaskDomainError {
        TaskDomainError::InvalidTransition {
            task_id: self.id,
            action,
            status: self.status,
            reason,
        }
    }
}

fn initial_assignment(
    users: &BTreeSet<UserId>,
    groups: &BTreeSet<GroupId>,
) -> (TaskStatus, Option<UserId>) {
    if !groups.is_empty() {
        return (TaskStatus::Ready, None);
    }
    let mut iter = users.iter();
    match (iter.next(), iter.next()) {
        (None, _) => (TaskStatus::Created, None),
        (Some(only), None) => (TaskStatus::Reserved, Some(only.clone())),
        (Some(_), Some(_)) => (TaskStatus::Ready, None),
    }
}
