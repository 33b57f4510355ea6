//! Task metadata carried alongside the lifecycle state.

use super::SuspensionJobId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata map with the keys the lifecycle engine interprets.
///
/// Keys not recognised by the engine are preserved verbatim in
/// [`TaskMetadata::extra`] so that process-level annotations survive
/// every transition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMetadata {
    /// Whether `skip` is permitted.
    #[serde(rename = "Skippable", default)]
    pub skippable: bool,
    /// Scheduler job that will resume the task, while suspended with a wake time.
    #[serde(
        rename = "SuspendedTaskJobId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub suspended_task_job_id: Option<SuspensionJobId>,
    /// Absolute wake instant, while suspended with a wake time.
    #[serde(rename = "SuspendUntil", default, skip_serializing_if = "Option::is_none")]
    pub suspend_until: Option<DateTime<Utc>>,
    /// Uninterpreted metadata.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskMetadata {
    /// Creates metadata with the given skippable flag.
    #[must_use]
    pub fn skippable(skippable: bool) -> Self {
        Self {
            skippable,
            ..Self::default()
        }
    }

    /// Adds an uninterpreted entry.
    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub(crate) fn clear_suspension(&mut self) {
        self.suspended_task_job_id = None;
        self.suspend_until = None;
    }
}
