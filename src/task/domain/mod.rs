//! Domain model for human task lifecycle management.
//!
//! The domain owns the task instance aggregate, the transition table, the
//! authorization guard and suspend-until resolution. It performs no I/O:
//! persistence and timer registration are described as
//! [`SchedulerEffect`] values and carried out by the services layer.

mod action;
mod actor;
mod authorization;
mod error;
mod ids;
mod instance;
mod metadata;
mod status;
mod suspend_until;

pub use action::{
    ActionKind, DELEGATED_USER, FAILURE_MESSAGE, FORWARDED_USERS, NOMINATED_USERS, SUSPEND_UNTIL,
    TransitionAction,
};
pub use actor::{Actor, Initiator};
pub use authorization::AuthorizationResolver;
pub use error::{ParseActionKindError, ParseTaskStatusError, RejectionReason, TaskDomainError};
pub use ids::{GroupId, SuspensionJobId, TaskId, UserId};
pub use instance::{
    NewTaskInstance, PersistedTaskInstance, ProcessRef, SchedulerEffect, TaskInstance,
    TransitionContext, TransitionOutcome,
};
pub use metadata::TaskMetadata;
pub use status::{TaskStatus, TerminateReason};
pub use suspend_until::SuspendUntil;
