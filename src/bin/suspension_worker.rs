//! Runs the suspension worker against a `PostgreSQL` database.
//!
//! Usage:
//!
//! ```text
//! DATABASE_URL=postgres://... suspension_worker
//! ```
//!
//! The worker polls the `suspension_jobs` table and resumes tasks whose
//! suspension deadline has passed. Polling is tuned through
//! `HUMAN_TASK_POLL_INTERVAL_MS`, `HUMAN_TASK_LEASE_MS` and
//! `HUMAN_TASK_BATCH_SIZE`; the connection pool size through
//! `HUMAN_TASK_DB_POOL_SIZE`. Log output honours `RUST_LOG` and defaults to
//! `info`. The process stops cleanly on Ctrl-C.

use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use human_task::task::adapters::postgres::{
    PostgresSuspensionScheduler, PostgresTaskStore, TaskPgPool,
};
use human_task::task::services::{
    ConfigError, LifecycleEngine, SuspensionWorker, SuspensionWorkerConfig,
};
use mockable::DefaultClock;
use std::env;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Builder;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const DATABASE_URL_ENV: &str = "DATABASE_URL";
const POOL_SIZE_ENV: &str = "HUMAN_TASK_DB_POOL_SIZE";
const DEFAULT_POOL_SIZE: u32 = 4;

/// Boxed error type for the main result.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that stop the worker before it starts polling.
#[derive(Debug, Error)]
enum StartupError {
    #[error("{DATABASE_URL_ENV} must be set")]
    MissingDatabaseUrl,
    #[error("invalid value '{0}' for {POOL_SIZE_ENV}")]
    InvalidPoolSize(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build connection pool: {0}")]
    Pool(#[source] diesel::r2d2::PoolError),
    #[error("runtime init failed: {0}")]
    RuntimeInit(#[source] std::io::Error),
}

fn main() -> Result<(), BoxError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    run().map_err(|err| {
        tracing::error!(error = %err, "suspension worker failed to start");
        err.into()
    })
}

fn run() -> Result<(), StartupError> {
    let config = SuspensionWorkerConfig::from_env()?;
    let pool = build_pool()?;
    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(StartupError::RuntimeInit)?;

    let engine = LifecycleEngine::new(
        Arc::new(PostgresTaskStore::new(pool.clone())),
        Arc::new(PostgresSuspensionScheduler::new(pool)),
        Arc::new(DefaultClock),
    );
    let worker = SuspensionWorker::new(engine, config);
    let shutdown = CancellationToken::new();

    runtime.block_on(async {
        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => signal_token.cancel(),
                Err(err) => tracing::warn!(error = %err, "failed to listen for shutdown signal"),
            }
        });
        worker.run(&shutdown).await;
    });
    Ok(())
}

fn build_pool() -> Result<TaskPgPool, StartupError> {
    let url = env::var(DATABASE_URL_ENV).map_err(|_| StartupError::MissingDatabaseUrl)?;
    let size = match env::var(POOL_SIZE_ENV) {
        Ok(raw) => match raw.trim().parse::<u32>() {
            Ok(value) if value > 0 => value,
            _ => return Err(StartupError::InvalidPoolSize(raw)),
        },
        Err(_) => DEFAULT_POOL_SIZE,
    };

    Pool::builder()
        .max_size(size)
        .build(ConnectionManager::<PgConnection>::new(url))
        .map_err(StartupError::Pool)
}
