//! Store port for task persistence with optimistic concurrency control.

use crate::task::domain::{TaskId, TaskInstance};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for task store operations.
pub type TaskStoreResult<T> = Result<T, TaskStoreError>;

/// Task persistence contract.
///
/// Each stored instance carries a version counter. Writers load an
/// instance, compute its successor in memory and commit it with
/// [`TaskStore::compare_and_swap`]; at most one writer wins per
/// `(task, version)` pair.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Stores a newly created task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::DuplicateTask`] when the task ID already
    /// exists.
    async fn insert(&self, task: &TaskInstance) -> TaskStoreResult<()>;

    /// Loads the latest committed version of a task.
    ///
    /// Returns `None` when the task does not exist.
    async fn load(&self, id: TaskId) -> TaskStoreResult<Option<TaskInstance>>;

    /// Replaces the stored task if its version still equals
    /// `expected_version`.
    ///
    /// Returns `false`, leaving storage untouched, when another writer
    /// committed first or the task no longer exists.
    async fn compare_and_swap(
        &self,
        expected_version: u64,
        task: &TaskInstance,
    ) -> TaskStoreResult<bool>;
}

/// Errors returned by task store implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskStoreError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
