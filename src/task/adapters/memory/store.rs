//! In-memory task store for tests and embedded use.

use crate::task::{
    domain::{TaskId, TaskInstance},
    ports::{TaskStore, TaskStoreError, TaskStoreResult},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Thread-safe in-memory implementation of [`TaskStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    tasks: Arc<RwLock<HashMap<TaskId, TaskInstance>>>,
}

impl InMemoryTaskStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if no tasks are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned(err: impl std::fmt::Display) -> TaskStoreError {
    TaskStoreError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert(&self, task: &TaskInstance) -> TaskStoreResult<()> {
        let mut tasks = self.tasks.write().map_err(poisoned)?;
        if tasks.contains_key(&task.id()) {
            return Err(TaskStoreError::DuplicateTask(task.id()));
        }
        tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn load(&self, id: TaskId) -> TaskStoreResult<Option<TaskInstance>> {
        let tasks = self.tasks.read().map_err(poisoned)?;
        Ok(tasks.get(&id).cloned())
    }

    async fn compare_and_swap(
        &self,
        expected_version: u64,
        task: &TaskInstance,
    ) -> TaskStoreResult<bool> {
        let mut tasks = self.tasks.write().map_err(poisoned)?;
        let Some(current) = tasks.get_mut(&task.id()) else {
            return Ok(false);
        };
        if current.version() != expected_version {
            return Ok(false);
        }
        *current = task.clone();
        Ok(true)
    }
}
