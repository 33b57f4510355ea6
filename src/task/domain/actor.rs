//! Acting identities for transition requests.

use super::{GroupId, SuspensionJobId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// An already-authenticated user together with its group memberships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    user: UserId,
    groups: BTreeSet<GroupId>,
}

impl Actor {
    /// Creates an actor without group memberships.
    #[must_use]
    pub const fn new(user: UserId) -> Self {
        Self {
            user,
            groups: BTreeSet::new(),
        }
    }

    /// Sets the group memberships.
    #[must_use]
    pub fn with_groups(mut self, groups: impl IntoIterator<Item = GroupId>) -> Self {
        self.groups = groups.into_iter().collect();
        self
    }

    /// Returns the user identity.
    #[must_use]
    pub const fn user(&self) -> &UserId {
        &self.user
    }

    /// Returns the group memberships.
    #[must_use]
    pub const fn groups(&self) -> &BTreeSet<GroupId> {
        &self.groups
    }

    /// Returns `true` when the actor belongs to at least one of `groups`.
    #[must_use]
    pub fn is_member_of(&self, groups: &BTreeSet<GroupId>) -> bool {
        !self.groups.is_disjoint(groups)
    }
}

/// Origin of a transition request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Initiator {
    /// A human actor calling through the external API.
    User(Actor),
    /// The suspension scheduler firing a wake-up job.
    Scheduler {
        /// The job being fired.
        job: SuspensionJobId,
    },
}

impl Initiator {
    /// Returns the acting user, if the initiator is human.
    #[must_use]
    pub const fn actor(&self) -> Option<&Actor> {
        match self {
            Self::User(actor) => Some(actor),
            Self::Scheduler { .. } => None,
        }
    }
}

impl From<Actor> for Initiator {
    fn from(actor: Actor) -> Self {
        Self::User(actor)
    }
}

impl fmt::Display for Initiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(actor) => write!(f, "user:{}", actor.user()),
            Self::Scheduler { job } => write!(f, "scheduler:{job}"),
        }
    }
}
