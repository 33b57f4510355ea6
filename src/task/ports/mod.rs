//! Port contracts for human task lifecycle management.
//!
//! Ports define infrastructure-agnostic interfaces used by task services.

pub mod scheduler;
pub mod store;

pub use scheduler::{SchedulerError, SchedulerResult, SuspensionJob, SuspensionScheduler};
pub use store::{TaskStore, TaskStoreError, TaskStoreResult};
