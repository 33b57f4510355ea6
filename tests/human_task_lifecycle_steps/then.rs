//! Then steps for human task lifecycle BDD scenarios.

use super::world::{LifecycleWorld, run_async};
use human_task::task::{domain::TaskStatus, services::LifecycleErrorKind};
use rstest_bdd_macros::then;

fn last_error_kind(world: &LifecycleWorld) -> Result<LifecycleErrorKind, eyre::Report> {
    match world.last_result.as_ref() {
        Some(Err(err)) => Ok(err.kind()),
        Some(Ok(response)) => Err(eyre::eyre!(
            "expected the last action to fail, task is {}",
            response.status
        )),
        None => Err(eyre::eyre!("no action was performed")),
    }
}

#[then(r#"the task status is "{status}""#)]
fn task_status_is(world: &LifecycleWorld, status: String) -> Result<(), eyre::Report> {
    let expected = TaskStatus::try_from(status.as_str())?;
    let task = run_async(world.engine.get(world.task_id()?))?;

    eyre::ensure!(
        task.status() == expected,
        "expected status {expected}, found {}",
        task.status()
    );
    Ok(())
}

#[then(r#"the task is owned by "{user}""#)]
fn task_is_owned_by(world: &LifecycleWorld, user: String) -> Result<(), eyre::Report> {
    let task = run_async(world.engine.get(world.task_id()?))?;
    let owner = task.actual_owner().map(|owner| owner.as_str().to_owned());

    eyre::ensure!(owner.as_deref() == Some(user.as_str()), "unexpected owner {owner:?}");
    Ok(())
}

#[then("the last action is rejected as an invalid transition")]
fn rejected_as_invalid(world: &LifecycleWorld) -> Result<(), eyre::Report> {
    let kind = last_error_kind(world)?;
    eyre::ensure!(kind == LifecycleErrorKind::InvalidTransition, "unexpected error kind {kind:?}");
    Ok(())
}

#[then("the last action is forbidden")]
fn rejected_as_forbidden(world: &LifecycleWorld) -> Result<(), eyre::Report> {
    let kind = last_error_kind(world)?;
    eyre::ensure!(kind == LifecycleErrorKind::Forbidden, "unexpected error kind {kind:?}");
    Ok(())
}

#[then("no wake-up is pending")]
fn no_wake_up_pending(world: &LifecycleWorld) -> Result<(), eyre::Report> {
    let pending = world.scheduler.pending();
    eyre::ensure!(pending.is_empty(), "unexpected pending jobs {pending:?}");
    Ok(())
}
