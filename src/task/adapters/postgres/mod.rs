//! `PostgreSQL` adapters for task persistence and suspension scheduling.

mod models;
mod scheduler;
mod schema;
mod store;

pub use scheduler::PostgresSuspensionScheduler;
pub use store::PostgresTaskStore;

use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};

/// `PostgreSQL` connection pool type shared by the task adapters.
pub type TaskPgPool = Pool<ConnectionManager<PgConnection>>;
