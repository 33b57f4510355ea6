//! In-memory adapters for task persistence and suspension scheduling.

mod scheduler;
mod store;

pub use scheduler::InMemorySuspensionScheduler;
pub use store::InMemoryTaskStore;
