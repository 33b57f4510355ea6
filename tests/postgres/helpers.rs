//! Shared helpers for `PostgreSQL` integration tests.

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use human_task::task::{
    adapters::postgres::TaskPgPool,
    domain::{
        ActionKind, Actor, Initiator, NewTaskInstance, TaskInstance, TransitionContext, UserId,
    },
};
use mockable::DefaultClock;
use pg_embedded_setup_unpriv::TestCluster;
use serde_json::Map;
use tokio::runtime::Runtime;

/// Boxed error used by fallible setup helpers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// SQL creating the task table.
const CREATE_TASK_INSTANCES_SQL: &str =
    include_str!("../../migrations/2026-10-19-000000_create_task_instances/up.sql");

/// SQL creating the suspension job table.
const CREATE_SUSPENSION_JOBS_SQL: &str =
    include_str!("../../migrations/2026-10-19-000001_create_suspension_jobs/up.sql");

/// Template database name for pre-migrated schema.
const TEMPLATE_DB: &str = "human_task_test_template";

/// Creates a multi-threaded runtime so blocking adapter calls can overlap.
pub fn test_runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to create test runtime")
}

/// Ensures the template database exists with the schema applied.
pub fn ensure_template(cluster: &TestCluster) -> Result<(), BoxError> {
    cluster
        .ensure_template_exists(TEMPLATE_DB, |db_name| {
            let url = cluster.connection().database_url(db_name);
            let mut conn = PgConnection::establish(&url).map_err(|e| eyre::eyre!("{e}"))?;
            conn.batch_execute(CREATE_TASK_INSTANCES_SQL)
                .map_err(|e| eyre::eyre!("task schema: {e}"))?;
            conn.batch_execute(CREATE_SUSPENSION_JOBS_SQL)
                .map_err(|e| eyre::eyre!("job schema: {e}"))?;
            Ok(())
        })
        .map_err(|e| Box::new(e) as BoxError)?;
    Ok(())
}

/// Creates a test database from the template and returns a pool for it.
pub fn setup_pool(
    cluster: &TestCluster,
    db_name: &str,
    max_size: u32,
) -> Result<TaskPgPool, BoxError> {
    cluster
        .create_database_from_template(db_name, TEMPLATE_DB)
        .map_err(|e| Box::new(e) as BoxError)?;
    let url = cluster.connection().database_url(db_name);
    let manager = ConnectionManager::<PgConnection>::new(url);
    Pool::builder()
        .max_size(max_size)
        .build(manager)
        .map_err(|e| Box::new(e) as BoxError)
}

/// Guard that drops the test database even if the test panics.
///
/// Declare it before the pool so the pool's connections close first.
pub struct CleanupGuard<'a> {
    cluster: &'a TestCluster,
    db_name: String,
}

impl<'a> CleanupGuard<'a> {
    pub const fn new(cluster: &'a TestCluster, db_name: String) -> Self {
        Self { cluster, db_name }
    }
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.cluster.drop_database(self.db_name.as_str()) {
            eprintln!("Warning: failed to drop test database {}: {e}", self.db_name);
        }
    }
}

/// Builds a user identity.
pub fn user(name: &str) -> UserId {
    UserId::new(name).expect("valid user id")
}

/// Builds a ready task offered to john and dave.
pub fn ready_task(name: &str) -> TaskInstance {
    let new = NewTaskInstance {
        task_name: name.to_owned(),
        potential_users: [user("john"), user("dave")].into(),
        ..NewTaskInstance::default()
    };
    TaskInstance::create(new, &DefaultClock)
}

/// Applies a payload-free action as `who`, panicking if it is rejected.
pub fn step(task: &TaskInstance, who: &str, action: ActionKind) -> TaskInstance {
    let initiator = Initiator::User(Actor::new(user(who)));
    task.apply(&TransitionContext {
        action,
        initiator: &initiator,
        payload: &Map::new(),
        now: chrono::Utc::now(),
    })
    .expect("transition should be allowed")
    .instance
}
