//! Error types for task domain validation and transitions.

use super::{ActionKind, TaskId, TaskStatus};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors returned while constructing domain values or applying transitions.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// A user or group identity is blank.
    #[error("identity must not be empty")]
    EmptyIdentity,

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
}

/// Reason attached to [`TaskDomainError::InvalidTransition`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RejectionReason {
    /// The action is not listed for the current status.
    #[error("action not allowed from this status")]
    ActionNotAllowed,

    /// `skip` was requested on a task that is not skippable.
    #[error("task is not skippable")]
    NotSkippable,

    /// A payload key required by the action is absent.
    #[error("missing payload key {0}")]
    MissingPayload(&'static str),

    /// A payload key has the wrong shape.
    #[error("malformed payload key {key}: {message}")]
    MalformedPayload {
        /// Offending payload key.
        key: &'static str,
        /// Description of the expected shape.
        message: String,
    },

    /// `SUSPEND_UNTIL` is neither an ISO-8601 duration nor a timestamp.
    #[error("unparsable suspend-until value '{0}'")]
    InvalidSuspendUntil(String),

    /// `SUSPEND_UNTIL` resolved to an instant that is not in the future.
    #[error("suspend-until instant {0} is not in the future")]
    SuspendUntilNotInFuture(DateTime<Utc>),

    /// A scheduler job fired for a suspension it no longer owns.
    #[error("scheduled resume does not match the current suspension")]
    StaleScheduledResume,
}

/// Error returned while parsing task statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);

/// Error returned while parsing an action name from a request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task action: {0}")]
pub struct ParseActionKindError(pub String);
