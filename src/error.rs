//! Error types for every layer of the crate.
//!
//! Each layer owns one enum so callers can tell *where* a request died:
//! [`CodecError`] before dispatch, [`DispatchError`] around the store,
//! [`ProxyError`] on the client round trip. Task-level failures
//! (validation, unknown resource) are not errors at all; they are
//! [`TaskResult`](crate::types::TaskResult)s with a failure status code.

use http::Method;
use thiserror::Error;

use crate::types::CommandKind;

/// Boxed error used for opaque body and backend failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while assembling a [`Task`](crate::types::Task).
#[derive(Debug, Error)]
pub enum ModelError {
    /// A command of another kind was appended to a task.
    #[error("cannot add {found} command to a {expected} task")]
    MixedCommands {
        /// Kind already held by the task.
        expected: CommandKind,
        /// Kind of the rejected command.
        found: CommandKind,
    },
}

/// Errors raised by the wire codec.
///
/// # Examples
///
/// ```
/// use restcmd::CodecError;
///
/// let err = CodecError::InvalidInteger {
///     param: "offset",
///     value: "abc".to_string(),
/// };
/// assert_eq!(err.to_string(), "offset isn't a valid integer: abc");
/// ```
#[derive(Debug, Error)]
pub enum CodecError {
    /// The request used a method outside GET/POST/PUT/DELETE/PATCH.
    #[error("unknown http method {0}")]
    UnknownMethod(Method),

    /// GET request without a usable `resource_type` parameter.
    #[error("empty resource type")]
    EmptyResourceType,

    /// Empty `zdnsuser` while the user policy requires one.
    #[error("empty user")]
    EmptyUser,

    /// `offset` or `limit` query parameter is not an integer.
    #[error("{param} isn't a valid integer: {value}")]
    InvalidInteger {
        /// The offending parameter name.
        param: &'static str,
        /// The raw value received.
        value: String,
    },

    /// Reading a request or response body failed.
    #[error("http body reader error: {0}")]
    BodyRead(#[source] BoxError),

    /// The body is not a valid task envelope.
    #[error("invalid task envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    /// No decoder is registered for the envelope's resource type.
    #[error("unknown resource type: {0}")]
    UnknownResourceType(String),

    /// An `attrs` entry failed to decode.
    #[error("malformed {resource_type} entry at index {index}: {source}")]
    MalformedEntry {
        /// Resource type named by the envelope.
        resource_type: String,
        /// Position of the entry in `attrs`.
        index: usize,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A Get condition uses a query parameter name the codec reserves.
    #[error("reserved condition key: {0}")]
    ReservedCondition(String),

    /// Encoding a task that holds no command.
    #[error("encode empty task")]
    EmptyTask,

    /// Encoding a GET task that holds more than one command.
    #[error("get task doesn't support batch ({count} commands)")]
    GetBatch {
        /// Number of commands found.
        count: usize,
    },

    /// Serialising a resource or envelope failed.
    #[error("serialization error: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The endpoint does not yield a valid URL.
    #[error("invalid service url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Building the HTTP message failed.
    #[error("http message error: {0}")]
    Http(#[from] http::Error),

    /// The result body does not parse as the selected shape.
    #[error("invalid result body: {0}")]
    ResultBody(#[source] serde_json::Error),
}

/// Errors raised by the resource registry and the service registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A resource type tag was registered twice.
    #[error("resource type {0} already registered")]
    DuplicateResource(String),

    /// The service registry has no endpoint for this name.
    #[error("service not found: {0}")]
    ServiceNotFound(String),

    /// Registry configuration could not be loaded.
    #[error("registry configuration error: {0}")]
    Configuration(String),
}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<toml::de::Error> for RegistryError {
    fn from(err: toml::de::Error) -> Self {
        Self::Configuration(format!("TOML parse error: {err}"))
    }
}

/// Errors raised by a [`ResourceStore`](crate::store::ResourceStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Opening a transaction failed.
    #[error("begin transaction failed: {0}")]
    Begin(String),

    /// A count query failed.
    #[error("count {resource_type} failed: {message}")]
    Query {
        /// Resource type queried.
        resource_type: String,
        /// Backend message.
        message: String,
    },

    /// Committing a transaction failed.
    #[error("commit failed: {0}")]
    Commit(String),
}

/// Errors raised by the service dispatcher.
///
/// These abort the call; validation and precondition failures are
/// reported as failed [`TaskResult`](crate::types::TaskResult)s instead.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The task carries no command, so there is nothing to dispatch.
    #[error("dispatch of empty task")]
    EmptyTask,

    /// The precondition transaction could not be opened or committed.
    #[error("resource store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors raised by a [`Transport`](crate::transport::Transport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// `send` was called before `connect`.
    #[error("transport is not connected")]
    NotConnected,

    /// Establishing the connection failed.
    #[error("connect failed: {0}")]
    Connect(String),

    /// The request produced no usable response.
    #[error("send failed: {0}")]
    Send(String),
}

/// Errors raised by [`RestProxy::handle_task`](crate::proxy::RestProxy::handle_task).
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The task could not be encoded.
    #[error("encode task failed: {0}")]
    Encode(#[source] CodecError),

    /// Connecting or reconnecting the transport failed.
    #[error("connect failed: {0}")]
    Connect(#[source] TransportError),

    /// Both send attempts produced no usable response.
    #[error("send task failed: {0}")]
    Send(#[source] TransportError),

    /// The response could not be decoded.
    #[error("decode task result failed: {0}")]
    Decode(#[source] CodecError),

    /// The target service could not be resolved.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Errors raised while running the HTTP front end.
#[cfg(feature = "http-server")]
#[derive(Debug, Error)]
pub enum ServerError {
    /// Resource registration failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Binding or serving failed.
    #[error("server io error: {0}")]
    Io(#[from] std::io::Error),
}
