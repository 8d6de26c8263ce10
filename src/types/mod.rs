//! Command model: commands, tasks and task results.

pub mod command;
pub mod task;

pub use command::{
    Command, CommandKind, Commands, DeleteCmd, GetCmd, PatchCmd, PostCmd, PutCmd, LIMIT_KEY,
    OFFSET_KEY,
};
pub use task::{FailureBody, Outcome, Task, TaskResult, FAILED, SUCCEED};
