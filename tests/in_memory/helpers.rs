//! Shared test helpers for in-memory lifecycle integration tests.

use crate::test_helpers::clock::ManualClock;
use human_task::task::{
    adapters::memory::{InMemorySuspensionScheduler, InMemoryTaskStore},
    domain::{Actor, GroupId, UserId},
    services::{LifecycleEngine, SuspensionWorker, SuspensionWorkerConfig},
};
use rstest::fixture;
use std::sync::Arc;

/// Engine type wired to in-memory adapters and a settable clock.
pub type MemoryEngine =
    LifecycleEngine<InMemoryTaskStore, InMemorySuspensionScheduler, ManualClock>;

/// Everything a lifecycle test needs to drive and inspect the system.
pub struct Lifecycle {
    pub engine: MemoryEngine,
    pub worker: SuspensionWorker<InMemoryTaskStore, InMemorySuspensionScheduler, ManualClock>,
    pub scheduler: Arc<InMemorySuspensionScheduler>,
    pub clock: Arc<ManualClock>,
}

/// Provides a fresh engine, worker and clock for each test.
#[fixture]
pub fn lifecycle() -> Lifecycle {
    let scheduler = Arc::new(InMemorySuspensionScheduler::new());
    let clock = Arc::new(ManualClock::new());
    let engine = LifecycleEngine::new(
        Arc::new(InMemoryTaskStore::new()),
        Arc::clone(&scheduler),
        Arc::clone(&clock),
    );
    let worker = SuspensionWorker::new(engine.clone(), SuspensionWorkerConfig::fast());
    Lifecycle {
        engine,
        worker,
        scheduler,
        clock,
    }
}

/// Builds an actor with no group memberships.
///
/// # Panics
///
/// Panics if `name` is blank.
pub fn actor(name: &str) -> Actor {
    Actor::new(UserId::new(name).expect("valid user id"))
}

/// Builds an actor belonging to `groups`.
///
/// # Panics
///
/// Panics if any identity is blank.
pub fn member(name: &str, groups: &[&str]) -> Actor {
    actor(name).with_groups(
        groups
            .iter()
            .map(|group| GroupId::new(*group).expect("valid group id")),
    )
}
