//! Application services for human task lifecycle orchestration.

mod config;
mod lifecycle;
mod suspension;

pub use config::{BATCH_SIZE_ENV, ConfigError, LEASE_ENV, POLL_INTERVAL_ENV, SuspensionWorkerConfig};
pub use lifecycle::{
    CreateTaskRequest, LifecycleEngine, LifecycleError, LifecycleErrorKind, LifecycleResult,
    TransitionRequest, TransitionResponse,
};
pub use suspension::{PollReport, SuspensionWorker};
