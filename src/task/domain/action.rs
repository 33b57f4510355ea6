//! Transition actions and decoding of their request payloads.

use super::{ParseActionKindError, RejectionReason, SuspendUntil, TaskStatus, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

/// Payload key naming the delegation target.
pub const DELEGATED_USER: &str = "DELEGATED_USER";
/// Payload key listing forwarding targets.
pub const FORWARDED_USERS: &str = "FORWARDED_USERS";
/// Payload key listing nominated potential owners.
pub const NOMINATED_USERS: &str = "NOMINATED_USERS";
/// Payload key holding a suspension wake time.
pub const SUSPEND_UNTIL: &str = "SUSPEND_UNTIL";
/// Payload key carrying a failure message.
pub const FAILURE_MESSAGE: &str = "message";

/// Name of a lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Take ownership of a ready task.
    Claim,
    /// Begin work on a reserved task.
    Start,
    /// Pause work, returning to reserved.
    Stop,
    /// Give up ownership.
    Release,
    /// Finish successfully.
    Complete,
    /// Finish with a business failure.
    Fail,
    /// Finish with a system fault.
    Fault,
    /// Mark a skippable task obsolete.
    Skip,
    /// Terminate administratively.
    Exit,
    /// Hand ownership to another user.
    Delegate,
    /// Offer the task to other users.
    Forward,
    /// Assign potential owners to a created task.
    Nominate,
    /// Park the task, optionally until a wake time.
    Suspend,
    /// Return a suspended task to its prior status.
    Resume,
    /// Merge new inputs without changing status.
    Update,
}

impl ActionKind {
    /// Every action, in declaration order.
    pub const ALL: [Self; 15] = [
        Self::Claim,
        Self::Start,
        Self::Stop,
        Self::Release,
        Self::Complete,
        Self::Fail,
        Self::Fault,
        Self::Skip,
        Self::Exit,
        Self::Delegate,
        Self::Forward,
        Self::Nominate,
        Self::Suspend,
        Self::Resume,
        Self::Update,
    ];

    /// Returns the canonical action name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Claim => "claim",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Release => "release",
            Self::Complete => "complete",
            Self::Fail => "fail",
            Self::Fault => "fault",
            Self::Skip => "skip",
            Self::Exit => "exit",
            Self::Delegate => "delegate",
            Self::Forward => "forward",
            Self::Nominate => "nominate",
            Self::Suspend => "suspend",
            Self::Resume => "resume",
            Self::Update => "update",
        }
    }

    /// Returns `true` when the action is listed for `status`.
    #[must_use]
    pub const fn is_allowed_from(self, status: TaskStatus) -> bool {
        use TaskStatus::{Created, InProgress, Ready, Reserved, Suspended};
        match self {
            Self::Claim => matches!(status, Ready),
            Self::Start | Self::Release => matches!(status, Reserved),
            Self::Stop | Self::Complete | Self::Fail | Self::Fault => matches!(status, InProgress),
            Self::Skip | Self::Suspend => status.is_active(),
            Self::Exit => matches!(status, Created | Ready | Reserved | InProgress),
            Self::Delegate => matches!(status, Created | Ready | Reserved),
            Self::Forward => matches!(status, Ready | Reserved),
            Self::Nominate => matches!(status, Created),
            Self::Resume => matches!(status, Suspended),
            Self::Update => !status.is_terminal(),
        }
    }
}

impl TryFrom<&str> for ActionKind {
    type Error = ParseActionKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ParseActionKindError(value.to_owned()))
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transition with its decoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionAction {
    /// See [`ActionKind::Claim`].
    Claim,
    /// See [`ActionKind::Start`].
    Start,
    /// See [`ActionKind::Stop`].
    Stop,
    /// See [`ActionKind::Release`].
    Release,
    /// See [`ActionKind::Complete`].
    Complete {
        /// Values merged into the task outputs.
        outputs: Map<String, Value>,
    },
    /// See [`ActionKind::Fail`].
    Fail {
        /// Values merged into the task outputs.
        outputs: Map<String, Value>,
        /// Failure message copied into `outputs.message`.
        message: Option<String>,
    },
    /// See [`ActionKind::Fault`].
    Fault,
    /// See [`ActionKind::Skip`].
    Skip,
    /// See [`ActionKind::Exit`].
    Exit,
    /// See [`ActionKind::Delegate`].
    Delegate {
        /// New actual owner.
        user: UserId,
    },
    /// See [`ActionKind::Forward`].
    Forward {
        /// Users added to the potential owners.
        users: BTreeSet<UserId>,
    },
    /// See [`ActionKind::Nominate`].
    Nominate {
        /// Replacement set of potential owners.
        users: BTreeSet<UserId>,
    },
    /// See [`ActionKind::Suspend`].
    Suspend {
        /// Optional wake time.
        until: Option<SuspendUntil>,
    },
    /// See [`ActionKind::Resume`].
    Resume,
    /// See [`ActionKind::Update`].
    Update {
        /// Values merged into the task inputs.
        inputs: Map<String, Value>,
    },
}

impl TransitionAction {
    /// Decodes the request payload for `kind`.
    ///
    /// # Errors
    ///
    /// Returns a [`RejectionReason`] when a required key is absent or a key
    /// has the wrong shape.
    pub fn decode(kind: ActionKind, payload: &Map<String, Value>) -> Result<Self, RejectionReason> {
        let action = match kind {
            ActionKind::Claim => Self::Claim,
            ActionKind::Start => Self::Start,
            ActionKind::Stop => Self::Stop,
            ActionKind::Release => Self::Release,
            ActionKind::Complete => Self::Complete {
                outputs: payload.clone(),
            },
            ActionKind::Fail => Self::Fail {
                outputs: payload.clone(),
                message: optional_string(payload, FAILURE_MESSAGE)?,
            },
            ActionKind::Fault => Self::Fault,
            ActionKind::Skip => Self::Skip,
            ActionKind::Exit => Self::Exit,
            ActionKind::Delegate => {
                let raw = optional_string(payload, DELEGATED_USER)?
                    .ok_or(RejectionReason::MissingPayload(DELEGATED_USER))?;
                Self::Delegate {
                    user: user_id(DELEGATED_USER, raw)?,
                }
            }
            ActionKind::Forward => Self::Forward {
                users: user_list(payload, FORWARDED_USERS)?,
            },
            ActionKind::Nominate => Self::Nominate {
                users: user_list(payload, NOMINATED_USERS)?,
            },
            ActionKind::Suspend => Self::Suspend {
                until: optional_string(payload, SUSPEND_UNTIL)?
                    .map(|raw| SuspendUntil::parse(&raw))
                    .transpose()?,
            },
            ActionKind::Resume => Self::Resume,
            ActionKind::Update => Self::Update {
                inputs: payload.clone(),
            },
        };
        Ok(action)
    }

    /// Returns the action name.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::Claim => ActionKind::Claim,
            Self::Start => ActionKind::Start,
            Self::Stop => ActionKind::Stop,
            Self::Release => ActionKind::Release,
            Self::Complete { .. } => ActionKind::Complete,
            Self::Fail { .. } => ActionKind::Fail,
            Self::Fault => ActionKind::Fault,
            Self::Skip => ActionKind::Skip,
            Self::Exit => ActionKind::Exit,
            Self::Delegate { .. } => ActionKind::Delegate,
            Self::Forward { .. } => ActionKind::Forward,
            Self::Nominate { .. } => ActionKind::Nominate,
            Self::Suspend { .. } => ActionKind::Suspend,
            Self::Resume => ActionKind::Resume,
            Self::Update { .. } => ActionKind::Update,
        }
    }
}

fn optional_string(
    payload: &Map<String, Value>,
    key: &'static str,
) -> Result<Option<String>, RejectionReason> {
    match payload.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(RejectionReason::MalformedPayload {
            key,
            message: "expected a string".to_owned(),
        }),
    }
}

fn user_id(key: &'static str, raw: String) -> Result<UserId, RejectionReason> {
    UserId::new(raw).map_err(|err| RejectionReason::MalformedPayload {
        key,
        message: err.to_string(),
    })
}

/// Accepts a JSON array of strings or a single comma-separated string.
fn user_list(
    payload: &Map<String, Value>,
    key: &'static str,
) -> Result<BTreeSet<UserId>, RejectionReason> {
    let raw: Vec<String> = match payload.get(key) {
        None | Some(Value::Null) => return Err(RejectionReason::MissingPayload(key)),
        Some(Value::String(text)) => text.split(',').map(str::to_owned).collect(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| RejectionReason::MalformedPayload {
                        key,
                        message: "expected a list of strings".to_owned(),
                    })
            })
            .collect::<Result<_, _>>()?,
        Some(_) => {
            return Err(RejectionReason::MalformedPayload {
                key,
                message: "expected a list of strings".to_owned(),
            });
        }
    };

    let users = raw
        .into_iter()
        .map(|entry| user_id(key, entry))
        .collect::<Result<BTreeSet<_>, _>>()?;
    if users.is_empty() {
        return Err(RejectionReason::MalformedPayload {
            key,
            message: "must name at least one user".to_owned(),
        });
    }
    Ok(users)
}
