//! Suspension scheduler tests against a real database.

use crate::postgres::helpers::{
    CleanupGuard, ensure_template, ready_task, setup_pool, test_runtime,
};
use chrono::{TimeDelta, Utc};
use human_task::task::{
    adapters::postgres::{PostgresSuspensionScheduler, PostgresTaskStore},
    domain::{SuspensionJobId, TaskId},
    ports::{SuspensionJob, SuspensionScheduler, TaskStore},
};
use pg_embedded_setup_unpriv::TestCluster;
use pg_embedded_setup_unpriv::test_support::shared_test_cluster;
use rstest::rstest;
use std::collections::HashSet;
use std::time::Duration;
use tokio::runtime::Runtime;

const LEASE: Duration = Duration::from_secs(30);

/// Stores a task so jobs can reference it.
fn stored_task(rt: &Runtime, store: &PostgresTaskStore) -> TaskId {
    let task = ready_task("Call customer");
    rt.block_on(store.insert(&task)).expect("insert task");
    task.id()
}

fn ids(jobs: &[SuspensionJob]) -> Vec<SuspensionJobId> {
    jobs.iter().map(|job| job.id).collect()
}

#[rstest]
fn job_is_leased_then_redelivered_until_acknowledged(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_jobs_lease_{}", uuid::Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let pool = setup_pool(shared_test_cluster, &db_name, 1).expect("pool setup");
    let store = PostgresTaskStore::new(pool.clone());
    let scheduler = PostgresSuspensionScheduler::new(pool);
    let rt = test_runtime();
    let task_id = stored_task(&rt, &store);
    let wake_at = Utc::now();
    let job_id = rt
        .block_on(scheduler.schedule(task_id, wake_at))
        .expect("schedule");

    let early = rt
        .block_on(scheduler.claim_due(wake_at - TimeDelta::seconds(1), LEASE, 10))
        .expect("early claim");
    let first = rt
        .block_on(scheduler.claim_due(wake_at, LEASE, 10))
        .expect("first claim");
    let during_lease = rt
        .block_on(scheduler.claim_due(wake_at + TimeDelta::seconds(10), LEASE, 10))
        .expect("claim during lease");
    let after_lease = rt
        .block_on(scheduler.claim_due(wake_at + TimeDelta::seconds(31), LEASE, 10))
        .expect("claim after lease");

    assert!(early.is_empty());
    assert_eq!(first.len(), 1);
    let job = first.first().expect("claimed job");
    assert_eq!((job.id, job.task_id, job.deliveries), (job_id, task_id, 1));
    assert!(during_lease.is_empty());
    assert_eq!(
        after_lease
            .iter()
            .map(|redelivered| (redelivered.id, redelivered.deliveries))
            .collect::<Vec<_>>(),
        vec![(job_id, 2)]
    );

    rt.block_on(scheduler.acknowledge(job_id))
        .expect("acknowledge");
    let after_ack = rt
        .block_on(scheduler.claim_due(wake_at + TimeDelta::hours(1), LEASE, 10))
        .expect("claim after acknowledge");
    assert!(after_ack.is_empty());
}

#[rstest]
fn cancelled_job_is_never_claimed(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_jobs_cancel_{}", uuid::Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let pool = setup_pool(shared_test_cluster, &db_name, 1).expect("pool setup");
    let store = PostgresTaskStore::new(pool.clone());
    let scheduler = PostgresSuspensionScheduler::new(pool);
    let rt = test_runtime();
    let task_id = stored_task(&rt, &store);
    let wake_at = Utc::now();
    let job_id = rt
        .block_on(scheduler.schedule(task_id, wake_at))
        .expect("schedule");

    rt.block_on(scheduler.cancel(job_id)).expect("cancel");
    rt.block_on(scheduler.cancel(SuspensionJobId::new()))
        .expect("cancelling an unknown job is not an error");
    let claimed = rt
        .block_on(scheduler.claim_due(wake_at + TimeDelta::minutes(1), LEASE, 10))
        .expect("claim");

    assert!(claimed.is_empty());
}

#[rstest]
fn claims_respect_batch_limit_and_wake_order(shared_test_cluster: &'static TestCluster) {
    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_jobs_order_{}", uuid::Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let pool = setup_pool(shared_test_cluster, &db_name, 1).expect("pool setup");
    let store = PostgresTaskStore::new(pool.clone());
    let scheduler = PostgresSuspensionScheduler::new(pool);
    let rt = test_runtime();
    let task_id = stored_task(&rt, &store);
    let now = Utc::now();
    let latest = rt
        .block_on(scheduler.schedule(task_id, now - TimeDelta::seconds(1)))
        .expect("schedule latest");
    let earliest = rt
        .block_on(scheduler.schedule(task_id, now - TimeDelta::seconds(3)))
        .expect("schedule earliest");
    let middle = rt
        .block_on(scheduler.schedule(task_id, now - TimeDelta::seconds(2)))
        .expect("schedule middle");

    let batch = rt
        .block_on(scheduler.claim_due(now, LEASE, 2))
        .expect("first batch");
    let rest = rt
        .block_on(scheduler.claim_due(now, LEASE, 2))
        .expect("second batch");

    assert_eq!(ids(&batch), vec![earliest, middle]);
    assert_eq!(ids(&rest), vec![latest]);
}

#[rstest]
fn concurrent_claims_never_share_a_job(shared_test_cluster: &'static TestCluster) {
    const JOBS: usize = 20;

    ensure_template(shared_test_cluster).expect("template setup");
    let db_name = format!("test_jobs_contention_{}", uuid::Uuid::new_v4());
    let _guard = CleanupGuard::new(shared_test_cluster, db_name.clone());
    let pool = setup_pool(shared_test_cluster, &db_name, 4).expect("pool setup");
    let store = PostgresTaskStore::new(pool.clone());
    let first_worker = PostgresSuspensionScheduler::new(pool.clone());
    let second_worker = PostgresSuspensionScheduler::new(pool);
    let rt = test_runtime();
    let task_id = stored_task(&rt, &store);
    let now = Utc::now();
    for _ in 0..JOBS {
        rt.block_on(first_worker.schedule(task_id, now - TimeDelta::seconds(1)))
            .expect("schedule");
    }

    let (first_claim, second_claim) = rt.block_on(async {
        tokio::join!(
            first_worker.claim_due(now, LEASE, JOBS),
            second_worker.claim_due(now, LEASE, JOBS),
        )
    });

    let left_ids: HashSet<SuspensionJobId> =
        ids(&first_claim.expect("first claim")).into_iter().collect();
    let right_ids: HashSet<SuspensionJobId> =
        ids(&second_claim.expect("second claim")).into_iter().collect();
    assert!(left_ids.is_disjoint(&right_ids));
    assert_eq!(left_ids.len() + right_ids.len(), JOBS);
}
