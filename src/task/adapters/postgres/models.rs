//! Diesel row models for task persistence.

use super::schema::{suspension_jobs, task_instances};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for task instance records.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = task_instances)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskInstanceRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Display label.
    pub task_name: String,
    /// Lifecycle status.
    pub status: String,
    /// Status held before suspension.
    pub previous_active_status: Option<String>,
    /// Actual owner.
    pub actual_owner: Option<String>,
    /// Potential users JSON array.
    pub potential_users: Value,
    /// Potential groups JSON array.
    pub potential_groups: Value,
    /// Administrative users JSON array.
    pub admin_users: Value,
    /// Administrative groups JSON array.
    pub admin_groups: Value,
    /// Input map.
    pub inputs: Value,
    /// Output map.
    pub outputs: Value,
    /// Metadata map.
    pub metadata: Value,
    /// Process back-reference.
    pub process_ref: Option<Value>,
    /// Optimistic-concurrency version.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest transition timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert model for task instance records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = task_instances)]
pub struct NewTaskInstanceRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Display label.
    pub task_name: String,
    /// Mutable columns shared with updates.
    #[diesel(embed)]
    pub state: TaskInstanceChangeset,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Columns rewritten by a compare-and-swap update.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = task_instances)]
#[diesel(treat_none_as_null = true)]
pub struct TaskInstanceChangeset {
    /// Lifecycle status.
    pub status: String,
    /// Status held before suspension.
    pub previous_active_status: Option<String>,
    /// Actual owner.
    pub actual_owner: Option<String>,
    /// Potential users JSON array.
    pub potential_users: Value,
    /// Potential groups JSON array.
    pub potential_groups: Value,
    /// Administrative users JSON array.
    pub admin_users: Value,
    /// Administrative groups JSON array.
    pub admin_groups: Value,
    /// Input map.
    pub inputs: Value,
    /// Output map.
    pub outputs: Value,
    /// Metadata map.
    pub metadata: Value,
    /// Process back-reference.
    pub process_ref: Option<Value>,
    /// New optimistic-concurrency version.
    pub version: i64,
    /// Latest transition timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Query result row for suspension jobs.
#[derive(Debug, Clone, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = suspension_jobs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SuspensionJobRow {
    /// Job identifier.
    #[diesel(sql_type = diesel::sql_types::Uuid)]
    pub id: uuid::Uuid,
    /// Task to resume.
    #[diesel(sql_type = diesel::sql_types::Uuid)]
    pub task_id: uuid::Uuid,
    /// Wake instant.
    #[diesel(sql_type = diesel::sql_types::Timestamptz)]
    pub wake_at: DateTime<Utc>,
    /// Lease expiry.
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Timestamptz>)]
    pub leased_until: Option<DateTime<Utc>>,
    /// Number of claims so far.
    #[diesel(sql_type = diesel::sql_types::Integer)]
    pub deliveries: i32,
    /// Registration timestamp.
    #[diesel(sql_type = diesel::sql_types::Timestamptz)]
    pub created_at: DateTime<Utc>,
}

/// Insert model for suspension jobs.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = suspension_jobs)]
pub struct NewSuspensionJobRow {
    /// Job identifier.
    pub id: uuid::Uuid,
    /// Task to resume.
    pub task_id: uuid::Uuid,
    /// Wake instant.
    pub wake_at: DateTime<Utc>,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
}
