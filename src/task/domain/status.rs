//! Lifecycle status and termination reason types.

use super::ParseTaskStatusError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Human task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Awaiting nomination of potential owners by an administrator.
    Created,
    /// Offered to potential owners, not yet claimed.
    Ready,
    /// Claimed by a single actual owner.
    Reserved,
    /// Work has started.
    InProgress,
    /// Temporarily parked; the prior active status is remembered.
    Suspended,
    /// Finished successfully.
    Completed,
    /// Finished with a business failure.
    Failed,
    /// Finished with a system fault.
    Error,
    /// Terminated by an administrator.
    Exited,
    /// Skipped and no longer needed.
    Obsolete,
}

impl TaskStatus {
    /// Every status, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Created,
        Self::Ready,
        Self::Reserved,
        Self::InProgress,
        Self::Suspended,
        Self::Completed,
        Self::Failed,
        Self::Error,
        Self::Exited,
        Self::Obsolete,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Ready => "ready",
            Self::Reserved => "reserved",
            Self::InProgress => "in_progress",
            Self::Suspended => "suspended",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Error => "error",
            Self::Exited => "exited",
            Self::Obsolete => "obsolete",
        }
    }

    /// Returns `true` when no transition may leave this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Error | Self::Exited | Self::Obsolete
        )
    }

    /// Returns `true` for the statuses a task may be suspended from.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Ready | Self::Reserved | Self::InProgress)
    }

    /// Returns the termination reason reported for terminal statuses.
    #[must_use]
    pub const fn terminate_reason(self) -> Option<TerminateReason> {
        match self {
            Self::Completed => Some(TerminateReason::Completed),
            Self::Failed => Some(TerminateReason::Failed),
            Self::Error => Some(TerminateReason::Error),
            Self::Exited => Some(TerminateReason::Exited),
            Self::Obsolete => Some(TerminateReason::Obsolete),
            Self::Created | Self::Ready | Self::Reserved | Self::InProgress | Self::Suspended => {
                None
            }
        }
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, ParseTaskStatusError> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseTaskStatusError(value.to_owned()))
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason reported when a task reaches a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminateReason {
    /// The owner completed the task.
    Completed,
    /// The owner reported a business failure.
    Failed,
    /// The owner reported a fault.
    Error,
    /// An administrator exited the task.
    Exited,
    /// The task was skipped.
    Obsolete,
}

impl TerminateReason {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Error => "ERROR",
            Self::Exited => "EXITED",
            Self::Obsolete => "OBSOLETE",
        }
    }
}

impl fmt::Display for TerminateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
