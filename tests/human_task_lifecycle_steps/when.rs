//! When steps for human task lifecycle BDD scenarios.

use super::world::{LifecycleWorld, run_async};
use chrono::TimeDelta;
use eyre::WrapErr;
use human_task::task::{
    domain::{ActionKind, Actor, NOMINATED_USERS, SUSPEND_UNTIL, UserId},
    services::TransitionRequest,
};
use rstest_bdd_macros::when;
use serde_json::json;

fn actor(name: &str) -> Result<Actor, eyre::Report> {
    Ok(Actor::new(UserId::new(name)?))
}

fn submit(world: &mut LifecycleWorld, request: TransitionRequest) {
    world.last_result = Some(run_async(world.engine.apply(request)));
}

#[when(r#""{user}" performs "{action}""#)]
fn performs(world: &mut LifecycleWorld, user: String, action: String) -> Result<(), eyre::Report> {
    let kind = ActionKind::try_from(action.as_str())?;
    let request = TransitionRequest::new(world.task_id()?, kind, actor(&user)?);
    submit(world, request);
    Ok(())
}

#[when(r#""{user}" suspends the task until "{until}""#)]
fn suspends_until(
    world: &mut LifecycleWorld,
    user: String,
    until: String,
) -> Result<(), eyre::Report> {
    let request = TransitionRequest::new(world.task_id()?, ActionKind::Suspend, actor(&user)?)
        .with_entry(SUSPEND_UNTIL, until);
    submit(world, request);
    Ok(())
}

#[when(r#""{user}" nominates "{nominee}""#)]
fn nominates(
    world: &mut LifecycleWorld,
    user: String,
    nominee: String,
) -> Result<(), eyre::Report> {
    let request = TransitionRequest::new(world.task_id()?, ActionKind::Nominate, actor(&user)?)
        .with_entry(NOMINATED_USERS, json!([nominee]));
    submit(world, request);
    Ok(())
}

#[when("{seconds:i64} seconds pass and the suspension worker polls")]
fn time_passes_and_worker_polls(
    world: &mut LifecycleWorld,
    seconds: i64,
) -> Result<(), eyre::Report> {
    world.clock.advance(TimeDelta::seconds(seconds));
    run_async(world.worker.run_once()).wrap_err("poll suspension jobs")?;
    Ok(())
}
