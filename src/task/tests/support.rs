//! Shared fixtures for task unit tests.

use crate::task::{
    domain::{
        Actor, GroupId, NewTaskInstance, SuspensionJobId, TaskId, TaskInstance, TaskMetadata,
        UserId,
    },
    ports::{
        SchedulerResult, SuspensionJob, SuspensionScheduler, TaskStore, TaskStoreResult,
    },
};
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;
use std::sync::Mutex;
use std::time::Duration;

/// Clock whose current instant only moves when a test advances it.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, delta: TimeDelta) {
        let mut guard = self.now.lock().expect("clock lock");
        *guard += delta;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::starting_at(epoch())
    }
}

impl Clock for ManualClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock")
    }
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0)
        .single()
        .expect("valid fixed instant")
}

pub fn user(name: &str) -> UserId {
    UserId::new(name).expect("valid user id")
}

pub fn group(name: &str) -> GroupId {
    GroupId::new(name).expect("valid group id")
}

pub fn actor(name: &str) -> Actor {
    Actor::new(user(name))
}

/// Ready task offered to john and dave, administered by `admin`.
pub fn ready_task(clock: &impl Clock) -> TaskInstance {
    let new = NewTaskInstance {
        task_name: "Approve invoice".to_owned(),
        potential_users: [user("john"), user("dave")].into(),
        admin_users: [user("admin")].into(),
        metadata: TaskMetadata::skippable(true),
        ..NewTaskInstance::default()
    };
    TaskInstance::create(new, clock)
}

/// Task with no potential owners, awaiting nomination.
pub fn created_task(clock: &impl Clock) -> TaskInstance {
    let new = NewTaskInstance {
        task_name: "Review contract".to_owned(),
        admin_users: [user("admin")].into(),
        admin_groups: [group("managers")].into(),
        ..NewTaskInstance::default()
    };
    TaskInstance::create(new, clock)
}

mockall::mock! {
    pub Store {}

    #[async_trait::async_trait]
    impl TaskStore for Store {
        async fn insert(&self, task: &TaskInstance) -> TaskStoreResult<()>;
        async fn load(&self, id: TaskId) -> TaskStoreResult<Option<TaskInstance>>;
        async fn compare_and_swap(
            &self,
            expected_version: u64,
            task: &TaskInstance,
        ) -> TaskStoreResult<bool>;
    }
}

mockall::mock! {
    pub Scheduler {}

    #[async_trait::async_trait]
    impl SuspensionScheduler for Scheduler {
        async fn schedule(
            &self,
            task_id: TaskId,
            wake_at: DateTime<Utc>,
        ) -> SchedulerResult<SuspensionJobId>;
        async fn cancel(&self, job: SuspensionJobId) -> SchedulerResult<()>;
        async fn claim_due(
            &self,
            now: DateTime<Utc>,
            lease: Duration,
            limit: usize,
        ) -> SchedulerResult<Vec<SuspensionJob>>;
        async fn acknowledge(&self, job: SuspensionJobId) -> SchedulerResult<()>;
    }
}
