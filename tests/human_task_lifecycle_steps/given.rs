//! Given steps for human task lifecycle BDD scenarios.

use super::world::{LifecycleWorld, run_async};
use eyre::WrapErr;
use human_task::task::services::CreateTaskRequest;
use rstest_bdd_macros::given;

#[given(r#"a task offered to "{first}" and "{second}""#)]
fn task_offered_to(
    world: &mut LifecycleWorld,
    first: String,
    second: String,
) -> Result<(), eyre::Report> {
    let request = CreateTaskRequest::new("Approve invoice")
        .with_potential_users([first, second])
        .with_admin_users(["admin"]);
    let task = run_async(world.engine.create(request)).wrap_err("create offered task")?;
    world.task_id = Some(task.id());
    Ok(())
}

#[given(r#"an unassigned task administered by "{admin}""#)]
fn unassigned_task(world: &mut LifecycleWorld, admin: String) -> Result<(), eyre::Report> {
    let request = CreateTaskRequest::new("Review contract").with_admin_users([admin]);
    let task = run_async(world.engine.create(request)).wrap_err("create unassigned task")?;
    world.task_id = Some(task.id());
    Ok(())
}
