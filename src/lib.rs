//! Typed resource commands carried over HTTP.
//!
//! A client builds a [`Task`], a batch of same-kind commands
//! (Get/Post/Put/Delete/Patch) on behalf of a user. The task is encoded
//! as an HTTP request, decoded on the service side, checked against a
//! resource store and handed to the service's handler for its kind. The
//! [`TaskResult`] travels back the same way.
//!
//! # Overview
//!
//! ```text
//!  client                                  service
//!  ------                                  -------
//!  Task --RestCodec::encode_task--> HTTP --RestCodec::decode_task--> Task
//!                                                     |
//!                                       ServiceDispatcher::handle_task
//!                                        (validate / existence checks)
//!                                                     |
//!                                               RestService handler
//!                                                     |
//!  TaskResult <--decode_result-- HTTP <--encode_result-- TaskResult
//! ```
//!
//! # Module Organization
//!
//! - [`types`] - Commands, tasks and task results
//! - [`resource`] - The [`Resource`] trait and the type registry
//! - [`codec`] - HTTP wire codec
//! - [`store`] - Resource store traits and an in-memory store
//! - [`service`] - The service trait and dispatcher
//! - [`endpoint`] - Endpoints and service registries
//! - [`transport`] - Transport trait and the reqwest client (`http-client`)
//! - [`proxy`] - Client-side task exchange
//! - `server` - axum front end (`http-server`)
//! - `logging` - Subscriber setup (`logging`)
//! - [`error`] - Error types per layer

#![warn(missing_docs)]

pub mod codec;
pub mod endpoint;
pub mod error;
pub mod proxy;
pub mod resource;
pub mod service;
pub mod store;
pub mod transport;
pub mod types;

#[cfg(feature = "logging")]
pub mod logging;

#[cfg(all(feature = "http-server", not(target_arch = "wasm32")))]
pub mod server;

pub use codec::{CodecConfig, RestCodec, UserPolicy};
pub use endpoint::{Endpoint, ServiceRegistry, StaticRegistry};
pub use error::{
    CodecError, DispatchError, ModelError, ProxyError, RegistryError, StoreError,
    TransportError,
};
pub use proxy::{ProxyConfig, RestProxy};
pub use resource::{Resource, ResourceRegistry, ValidationError};
pub use service::{RestService, ServiceDispatcher};
pub use store::{InMemoryResourceStore, ResourceStore, Transaction};
pub use transport::Transport;
pub use types::{
    Command, CommandKind, Commands, DeleteCmd, GetCmd, PatchCmd, PostCmd, PutCmd, Task,
    TaskResult, FAILED, SUCCEED,
};

#[cfg(feature = "logging")]
pub use logging::init_logging;
