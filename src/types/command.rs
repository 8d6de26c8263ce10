//! The five command variants and their per-kind batches.
//!
//! A [`Command`] is one Get, Post, Put, Delete or Patch operation.
//! [`Commands`] is the batch a [`Task`](super::Task) carries: a single
//! `Vec` of one kind, so a mixed batch cannot be built.

use std::fmt;
use std::sync::Arc;

use http::Method;
use serde_json::{Map, Value};

use crate::resource::Resource;

/// Reserved condition key for the pagination offset.
pub const OFFSET_KEY: &str = "offset";

/// Reserved condition key for the pagination limit.
pub const LIMIT_KEY: &str = "limit";

/// The kind of a command, independent of its payload.
///
/// # Examples
///
/// ```
/// use restcmd::types::CommandKind;
/// use http::Method;
///
/// assert_eq!(CommandKind::Patch.method(), Method::PATCH);
/// assert_eq!(CommandKind::from_method(&Method::DELETE), Some(CommandKind::Delete));
/// assert_eq!(CommandKind::from_method(&Method::HEAD), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Read resources matching conditions.
    Get,
    /// Create resources.
    Post,
    /// Replace existing resources.
    Put,
    /// Remove resources by id.
    Delete,
    /// Update selected attributes of a resource.
    Patch,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "get"),
            Self::Post => write!(f, "post"),
            Self::Put => write!(f, "put"),
            Self::Delete => write!(f, "delete"),
            Self::Patch => write!(f, "patch"),
        }
    }
}

impl CommandKind {
    /// HTTP method that frames this kind on the wire.
    pub fn method(self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Post => Method::POST,
            Self::Put => Method::PUT,
            Self::Delete => Method::DELETE,
            Self::Patch => Method::PATCH,
        }
    }

    /// Kind framed by `method`, if any.
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(Self::Get),
            Method::POST => Some(Self::Post),
            Method::PUT => Some(Self::Put),
            Method::DELETE => Some(Self::Delete),
            Method::PATCH => Some(Self::Patch),
            _ => None,
        }
    }
}

/// Reads resources of one type filtered by conditions.
///
/// `conds` may carry the reserved [`OFFSET_KEY`] and [`LIMIT_KEY`]
/// integer entries for pagination.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GetCmd {
    /// Resource type to read.
    pub resource_type: String,
    /// Condition key/value pairs.
    pub conds: Map<String, Value>,
}

impl GetCmd {
    /// Creates a Get command with no conditions.
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            conds: Map::new(),
        }
    }

    /// Adds a condition.
    ///
    /// `resource_type`, `zdnsuser` and `_` are reserved query parameters;
    /// encoding a command that uses one of them as a key fails.
    pub fn with_cond(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conds.insert(key.into(), value.into());
        self
    }

    /// Adds both pagination conditions.
    pub fn paginate(mut self, offset: u64, limit: u64) -> Self {
        self.conds.insert(OFFSET_KEY.to_string(), Value::from(offset));
        self.conds.insert(LIMIT_KEY.to_string(), Value::from(limit));
        self
    }

    /// Pagination offset, if set as an integer.
    pub fn offset(&self) -> Option<i64> {
        self.conds.get(OFFSET_KEY).and_then(Value::as_i64)
    }

    /// Pagination limit, if set as an integer.
    pub fn limit(&self) -> Option<i64> {
        self.conds.get(LIMIT_KEY).and_then(Value::as_i64)
    }
}

impl fmt::Display for GetCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "getcmd to get {} with conds {}",
            self.resource_type,
            Value::Object(self.conds.clone())
        )
    }
}

/// Creates a resource.
#[derive(Debug, Clone)]
pub struct PostCmd {
    /// The resource to create.
    pub new_resource: Arc<dyn Resource>,
}

impl PostCmd {
    /// Wraps `resource` in a Post command.
    pub fn new(resource: impl Resource) -> Self {
        Self {
            new_resource: Arc::new(resource),
        }
    }

    /// The carried resource as an `R`, if it is one.
    pub fn resource<R: Resource>(&self) -> Option<&R> {
        self.new_resource.downcast_ref::<R>()
    }
}

impl fmt::Display for PostCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "postcmd to create {:?}", self.new_resource)
    }
}

/// Replaces an existing resource.
#[derive(Debug, Clone)]
pub struct PutCmd {
    /// The replacement resource; its id selects the target.
    pub new_resource: Arc<dyn Resource>,
}

impl PutCmd {
    /// Wraps `resource` in a Put command.
    pub fn new(resource: impl Resource) -> Self {
        Self {
            new_resource: Arc::new(resource),
        }
    }

    /// The carried resource as an `R`, if it is one.
    pub fn resource<R: Resource>(&self) -> Option<&R> {
        self.new_resource.downcast_ref::<R>()
    }
}

impl fmt::Display for PutCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "putcmd to replace {:?}", self.new_resource)
    }
}

/// Removes a resource by id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeleteCmd {
    /// Type of the resource to remove.
    pub resource_type: String,
    /// Id of the resource to remove.
    pub id: String,
}

impl DeleteCmd {
    /// Creates a Delete command.
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for DeleteCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "deletecmd to delete {} with id {}",
            self.resource_type, self.id
        )
    }
}

/// Updates selected attributes of a resource.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PatchCmd {
    /// Type of the resource to update.
    pub resource_type: String,
    /// Id of the resource to update.
    pub id: String,
    /// Attributes to overwrite.
    pub new_attrs: Map<String, Value>,
}

impl PatchCmd {
    /// Creates a Patch command with no attributes.
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            new_attrs: Map::new(),
        }
    }

    /// Adds an attribute to overwrite.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.new_attrs.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for PatchCmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "patchcmd to update {} with id {} to new val {}",
            self.resource_type,
            self.id,
            Value::Object(self.new_attrs.clone())
        )
    }
}

/// A single command of any kind.
#[derive(Debug, Clone)]
pub enum Command {
    /// See [`GetCmd`].
    Get(GetCmd),
    /// See [`PostCmd`].
    Post(PostCmd),
    /// See [`PutCmd`].
    Put(PutCmd),
    /// See [`DeleteCmd`].
    Delete(DeleteCmd),
    /// See [`PatchCmd`].
    Patch(PatchCmd),
}

impl Command {
    /// Kind of this command.
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Get(_) => CommandKind::Get,
            Self::Post(_) => CommandKind::Post,
            Self::Put(_) => CommandKind::Put,
            Self::Delete(_) => CommandKind::Delete,
            Self::Patch(_) => CommandKind::Patch,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get(c) => c.fmt(f),
            Self::Post(c) => c.fmt(f),
            Self::Put(c) => c.fmt(f),
            Self::Delete(c) => c.fmt(f),
            Self::Patch(c) => c.fmt(f),
        }
    }
}

impl From<GetCmd> for Command {
    fn from(cmd: GetCmd) -> Self {
        Self::Get(cmd)
    }
}

impl From<PostCmd> for Command {
    fn from(cmd: PostCmd) -> Self {
        Self::Post(cmd)
    }
}

impl From<PutCmd> for Command {
    fn from(cmd: PutCmd) -> Self {
        Self::Put(cmd)
    }
}

impl From<DeleteCmd> for Command {
    fn from(cmd: DeleteCmd) -> Self {
        Self::Delete(cmd)
    }
}

impl From<PatchCmd> for Command {
    fn from(cmd: PatchCmd) -> Self {
        Self::Patch(cmd)
    }
}

/// A non-empty batch of commands sharing one kind.
#[derive(Debug, Clone)]
pub enum Commands {
    /// Get batch; only one command is ever encodable.
    Get(Vec<GetCmd>),
    /// Post batch.
    Post(Vec<PostCmd>),
    /// Put batch.
    Put(Vec<PutCmd>),
    /// Delete batch.
    Delete(Vec<DeleteCmd>),
    /// Patch batch.
    Patch(Vec<PatchCmd>),
}

impl Commands {
    /// Kind shared by every command in the batch.
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Get(_) => CommandKind::Get,
            Self::Post(_) => CommandKind::Post,
            Self::Put(_) => CommandKind::Put,
            Self::Delete(_) => CommandKind::Delete,
            Self::Patch(_) => CommandKind::Patch,
        }
    }

    /// Number of commands in the batch.
    pub fn len(&self) -> usize {
        match self {
            Self::Get(cmds) => cmds.len(),
            Self::Post(cmds) => cmds.len(),
            Self::Put(cmds) => cmds.len(),
            Self::Delete(cmds) => cmds.len(),
            Self::Patch(cmds) => cmds.len(),
        }
    }

    /// Returns `true` if the batch holds no command.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends `cmd`, handing it back if its kind differs from the batch.
    pub(crate) fn push(&mut self, cmd: Command) -> Result<(), Command> {
        match (self, cmd) {
            (Self::Get(cmds), Command::Get(c)) => cmds.push(c),
            (Self::Post(cmds), Command::Post(c)) => cmds.push(c),
            (Self::Put(cmds), Command::Put(c)) => cmds.push(c),
            (Self::Delete(cmds), Command::Delete(c)) => cmds.push(c),
            (Self::Patch(cmds), Command::Patch(c)) => cmds.push(c),
            (_, other) => return Err(other),
        }
        Ok(())
    }
}

impl From<Command> for Commands {
    fn from(cmd: Command) -> Self {
        match cmd {
            Command::Get(c) => Self::Get(vec![c]),
            Command::Post(c) => Self::Post(vec![c]),
            Command::Put(c) => Self::Put(vec![c]),
            Command::Delete(c) => Self::Delete(vec![c]),
            Command::Patch(c) => Self::Patch(vec![c]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn paginate_sets_integer_conditions() {
        let cmd = GetCmd::new("host").paginate(10, 5);
        assert_eq!(cmd.offset(), Some(10));
        assert_eq!(cmd.limit(), Some(5));
    }

    #[test]
    fn string_pagination_values_are_not_integers() {
        let cmd = GetCmd::new("host").with_cond("limit", "5");
        assert_eq!(cmd.limit(), None);
    }

    #[test]
    fn push_rejects_other_kind() {
        let mut batch = Commands::from(Command::from(DeleteCmd::new("host", "1")));
        let rejected = batch
            .push(PatchCmd::new("host", "1").into())
            .unwrap_err();
        assert_eq!(rejected.kind(), CommandKind::Patch);
        assert_eq!(batch.len(), 1);

        batch.push(DeleteCmd::new("host", "2").into()).unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn display_summaries() {
        assert_eq!(
            DeleteCmd::new("host", "42").to_string(),
            "deletecmd to delete host with id 42"
        );
        let patch = PatchCmd::new("host", "7").with_attr("ttl", json!(60));
        assert_eq!(
            Command::from(patch).to_string(),
            r#"patchcmd to update host with id 7 to new val {"ttl":60}"#
        );
    }
}
