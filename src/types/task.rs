//! Task container and task outcome.

use std::fmt;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::command::{Command, CommandKind, Commands};
use crate::error::ModelError;

/// Status code of a successful task.
pub const SUCCEED: StatusCode = StatusCode::OK;

/// Status code of a task rejected by validation or a precondition.
pub const FAILED: StatusCode = StatusCode::BAD_REQUEST;

/// A batch of same-kind commands plus the acting user.
///
/// Tasks start empty; commands are appended in arrival order and every
/// command must share the kind of the first one.
///
/// # Examples
///
/// ```
/// use restcmd::types::{CommandKind, DeleteCmd, PatchCmd, Task};
///
/// let mut task = Task::new("alice");
/// task.add_cmd(DeleteCmd::new("host", "1")).unwrap();
/// task.add_cmd(DeleteCmd::new("host", "2")).unwrap();
/// assert_eq!(task.kind(), Some(CommandKind::Delete));
/// assert_eq!(task.len(), 2);
///
/// // A Patch cannot join a Delete task.
/// assert!(task.add_cmd(PatchCmd::new("host", "1")).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Task {
    /// Identity of the acting user (`zdnsuser` on the wire).
    pub user: String,
    cmds: Option<Commands>,
}

impl Task {
    /// Creates an empty task for `user`.
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            cmds: None,
        }
    }

    /// Creates a task holding `cmds`.
    pub(crate) fn from_batch(user: impl Into<String>, cmds: Commands) -> Self {
        Self {
            user: user.into(),
            cmds: Some(cmds),
        }
    }

    /// Appends a command.
    ///
    /// # Errors
    ///
    /// [`ModelError::MixedCommands`] if `cmd` differs in kind from the
    /// commands already held.
    pub fn add_cmd(&mut self, cmd: impl Into<Command>) -> Result<(), ModelError> {
        let cmd = cmd.into();
        match self.cmds.as_mut() {
            None => {
                self.cmds = Some(Commands::from(cmd));
                Ok(())
            }
            Some(batch) => batch.push(cmd).map_err(|rejected| ModelError::MixedCommands {
                expected: batch.kind(),
                found: rejected.kind(),
            }),
        }
    }

    /// Builder form of [`add_cmd`](Self::add_cmd).
    ///
    /// # Errors
    ///
    /// [`ModelError::MixedCommands`] on a kind mismatch.
    pub fn with_cmd(mut self, cmd: impl Into<Command>) -> Result<Self, ModelError> {
        self.add_cmd(cmd)?;
        Ok(self)
    }

    /// The command batch, `None` while the task is empty.
    pub fn cmds(&self) -> Option<&Commands> {
        self.cmds.as_ref()
    }

    /// Consumes the task, returning its batch.
    pub fn into_cmds(self) -> Option<Commands> {
        self.cmds
    }

    /// Kind of the held commands.
    pub fn kind(&self) -> Option<CommandKind> {
        self.cmds.as_ref().map(Commands::kind)
    }

    /// Number of held commands.
    pub fn len(&self) -> usize {
        self.cmds.as_ref().map_or(0, Commands::len)
    }

    /// Returns `true` if no command has been added.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds the failed result for this task.
    pub fn failed(&self, err: impl fmt::Display) -> TaskResult {
        TaskResult::failed(err)
    }
}

/// Body written for a failed task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureBody {
    /// Human-readable failure message.
    pub error: String,
}

/// Outcome of handling one task.
///
/// Server-side results carry a JSON [`Value`]; client-side results carry
/// whatever the caller asked the codec to decode.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskResult<T = Value> {
    /// Status code, verbatim from the transport on the client side.
    pub code: StatusCode,
    /// Decoded payload, if any.
    pub result: Option<T>,
}

impl<T> TaskResult<T> {
    /// Returns `true` if `code` is [`SUCCEED`].
    pub fn is_success(&self) -> bool {
        self.code == SUCCEED
    }
}

impl TaskResult {
    /// Successful result carrying `result`.
    ///
    /// A payload that cannot be serialised turns the result into a
    /// [`failed`](Self::failed) one carrying the serialisation error.
    pub fn succeed(result: impl Serialize) -> Self {
        match serde_json::to_value(result) {
            Ok(value) => Self {
                code: SUCCEED,
                result: Some(value),
            },
            Err(err) => {
                tracing::warn!("result serialisation failed: {err}");
                Self::failed(format!("encode result failed: {err}"))
            }
        }
    }

    /// Successful result with no payload.
    pub fn empty() -> Self {
        Self {
            code: SUCCEED,
            result: None,
        }
    }

    /// Failed result whose body is a [`FailureBody`] carrying `err`.
    pub fn failed(err: impl fmt::Display) -> Self {
        Self {
            code: FAILED,
            result: Some(json!({ "error": err.to_string() })),
        }
    }

    /// Failure message, if this is a failed result written by [`failed`](Self::failed).
    pub fn error_message(&self) -> Option<&str> {
        if self.is_success() {
            return None;
        }
        self.result.as_ref()?.get("error")?.as_str()
    }
}

/// Which caller-supplied shape a decoded result body landed in.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<S, F> {
    /// Body parsed with the success shape.
    Success(S),
    /// Body parsed with the failure shape.
    Failure(F),
}
