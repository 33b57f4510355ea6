//! Authorization guard for lifecycle transitions.

use super::{ActionKind, Actor, Initiator, TaskInstance, TaskStatus};

/// Decides whether an initiator may perform an action on a task.
///
/// The resolver is stateless and must be consulted on every attempt: the
/// potential-owner sets it reads can change between two transitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationResolver;

impl AuthorizationResolver {
    /// Returns `true` when `initiator` may perform `action` on `instance`.
    ///
    /// Per-status scope: administrators act on `Created` tasks, potential
    /// owners on `Ready` tasks and the actual owner on `Reserved` and
    /// `InProgress` tasks. A suspended task is judged by the status it held
    /// before suspension. `exit` and `nominate` are reserved for
    /// administrators; `skip` is open to administrators and to whoever holds
    /// the current scope. The scheduler may only `resume`.
    #[must_use]
    pub fn authorize(instance: &TaskInstance, initiator: &Initiator, action: ActionKind) -> bool {
        let actor = match initiator {
            Initiator::Scheduler { .. } => return action == ActionKind::Resume,
            Initiator::User(actor) => actor,
        };

        match action {
            ActionKind::Exit | ActionKind::Nominate => is_admin(instance, actor),
            ActionKind::Skip => {
                is_admin(instance, actor) || in_scope(instance, actor, effective_status(instance))
            }
            ActionKind::Forward if instance.status() == TaskStatus::Ready => {
                instance.potential_users().contains(actor.user())
            }
            _ => in_scope(instance, actor, effective_status(instance)),
        }
    }
}

fn effective_status(instance: &TaskInstance) -> TaskStatus {
    match (instance.status(), instance.previous_active_status()) {
        (TaskStatus::Suspended, Some(previous)) => previous,
        (status, _) => status,
    }
}

fn in_scope(instance: &TaskInstance, actor: &Actor, status: TaskStatus) -> bool {
    match status {
        TaskStatus::Created => is_admin(instance, actor),
        TaskStatus::Ready => is_potential_owner(instance, actor),
        TaskStatus::Reserved | TaskStatus::InProgress => is_actual_owner(instance, actor),
        _ => false,
    }
}

fn is_admin(instance: &TaskInstance, actor: &Actor) -> bool {
    instance.admin_users().contains(actor.user()) || actor.is_member_of(instance.admin_groups())
}

fn is_potential_owner(instance: &TaskInstance, actor: &Actor) -> bool {
    instance.potential_users().contains(actor.user())
        || actor.is_member_of(instance.potential_groups())
}

fn is_actual_owner(instance: &TaskInstance, actor: &Actor) -> bool {
    instance.actual_owner() == Some(actor.user())
}
