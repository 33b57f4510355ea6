//! `PostgreSQL` task store with version-checked updates.

use super::{
    TaskPgPool,
    models::{NewTaskInstanceRow, TaskInstanceChangeset, TaskInstanceRow},
    schema::task_instances,
};
use crate::task::{
    domain::{PersistedTaskInstance, TaskId, TaskInstance, TaskStatus, UserId},
    ports::{TaskStore, TaskStoreError, TaskStoreResult},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// `PostgreSQL`-backed task store.
#[derive(Debug, Clone)]
pub struct PostgresTaskStore {
    pool: TaskPgPool,
}

impl PostgresTaskStore {
    /// Creates a new store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> TaskStoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> TaskStoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(TaskStoreError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(TaskStoreError::persistence)?
    }
}

#[async_trait]
impl TaskStore for PostgresTaskStore {
    async fn insert(&self, task: &TaskInstance) -> TaskStoreResult<()> {
        let task_id = task.id();
        let new_row = NewTaskInstanceRow {
            id: task_id.into_inner(),
            task_name: task.task_name().to_owned(),
            state: to_changeset(task)?,
            created_at: task.created_at(),
        };

        self.run_blocking(move |connection| {
            diesel::insert_into(task_instances::table)
                .values(&new_row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        TaskStoreError::DuplicateTask(task_id)
                    }
                    _ => TaskStoreError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn load(&self, id: TaskId) -> TaskStoreResult<Option<TaskInstance>> {
        self.run_blocking(move |connection| {
            let row = task_instances::table
                .filter(task_instances::id.eq(id.into_inner()))
                .select(TaskInstanceRow::as_select())
                .first::<TaskInstanceRow>(connection)
                .optional()
                .map_err(TaskStoreError::persistence)?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn compare_and_swap(
        &self,
        expected_version: u64,
        task: &TaskInstance,
    ) -> TaskStoreResult<bool> {
        let task_id = task.id().into_inner();
        let expected = i64::try_from(expected_version).map_err(TaskStoreError::persistence)?;
        let changeset = to_changeset(task)?;

        self.run_blocking(move |connection| {
            let updated = diesel::update(
                task_instances::table
                    .filter(task_instances::id.eq(task_id))
                    .filter(task_instances::version.eq(expected)),
            )
            .set(&changeset)
            .execute(connection)
            .map_err(TaskStoreError::persistence)?;
            Ok(updated == 1)
        })
        .await
    }
}

pub(super) fn to_changeset(task: &TaskInstance) -> TaskStoreResult<TaskInstanceChangeset> {
    Ok(TaskInstanceChangeset {
        status: task.status().as_str().to_owned(),
        previous_active_status: task
            .previous_active_status()
            .map(|status| status.as_str().to_owned()),
        actual_owner: task.actual_owner().map(|owner| owner.as_str().to_owned()),
        potential_users: to_json(task.potential_users())?,
        potential_groups: to_json(task.potential_groups())?,
        admin_users: to_json(task.admin_users())?,
        admin_groups: to_json(task.admin_groups())?,
        inputs: to_json(task.inputs())?,
        outputs: to_json(task.outputs())?,
        metadata: to_json(task.metadata())?,
        process_ref: task.process_ref().map(to_json).transpose()?,
        version: i64::try_from(task.version()).map_err(TaskStoreError::persistence)?,
        updated_at: task.updated_at(),
    })
}

pub(super) fn row_to_task(row: TaskInstanceRow) -> TaskStoreResult<TaskInstance> {
    let status = parse_status(&row.status)?;
    let previous_active_status = row
        .previous_active_status
        .as_deref()
        .map(parse_status)
        .transpose()?;
    let actual_owner = row
        .actual_owner
        .map(UserId::new)
        .transpose()
        .map_err(TaskStoreError::persistence)?;

    let data = PersistedTaskInstance {
        id: TaskId::from_uuid(row.id),
        task_name: row.task_name,
        status,
        previous_active_status,
        actual_owner,
        potential_users: from_json(row.potential_users)?,
        potential_groups: from_json(row.potential_groups)?,
        admin_users: from_json(row.admin_users)?,
        admin_groups: from_json(row.admin_groups)?,
        inputs: from_json(row.inputs)?,
        outputs: from_json(row.outputs)?,
        metadata: from_json(row.metadata)?,
        process_ref: row.process_ref.map(from_json).transpose()?,
        version: u64::try_from(row.version).map_err(TaskStoreError::persistence)?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    };
    Ok(TaskInstance::from_persisted(data))
}

fn parse_status(raw: &str) -> TaskStoreResult<TaskStatus> {
    TaskStatus::try_from(raw).map_err(TaskStoreError::persistence)
}

fn to_json(value: &impl serde::Serialize) -> TaskStoreResult<Value> {
    serde_json::to_value(value).map_err(TaskStoreError::persistence)
}

fn from_json<T: DeserializeOwned>(value: Value) -> TaskStoreResult<T> {
    serde_json::from_value(value).map_err(TaskStoreError::persistence)
}
