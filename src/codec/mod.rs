//! Wire codec between [`Task`]s and HTTP messages.
//!
//! # Mapping
//!
//! | Kind   | Method | Carrier                                   |
//! |--------|--------|-------------------------------------------|
//! | Get    | GET    | query string, exactly one command         |
//! | Post   | POST   | [`TaskEnvelope`], serialised resources    |
//! | Put    | PUT    | [`TaskEnvelope`], serialised resources    |
//! | Delete | DELETE | [`TaskEnvelope`], `{"id"}` entries        |
//! | Patch  | PATCH  | [`TaskEnvelope`], `{"id","new_attrs"}`    |
//!
//! Encoding and decoding match over the same closed set of kinds, so the
//! two directions stay symmetric.
//!
//! # Leniency
//!
//! Two historic permissive behaviours are kept behind [`CodecConfig`]:
//! a malformed DELETE entry decodes to an empty id, and an empty user is
//! accepted. [`CodecConfig::strict`] turns both into decode errors.

pub mod envelope;
mod query;
pub mod result;

use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{Method, Request, Response};
use http_body::Body;
use http_body_util::BodyExt;
use serde_json::value::{to_raw_value, RawValue};
use std::sync::Arc;
use url::Url;

pub use envelope::TaskEnvelope;
pub use result::{Discard, Json, ResultShape};

use crate::endpoint::Endpoint;
use crate::error::{BoxError, CodecError};
use crate::resource::{Resource, ResourceRegistry};
use crate::types::{
    CommandKind, Commands, DeleteCmd, GetCmd, Outcome, PatchCmd, PostCmd, PutCmd, Task,
    TaskResult, SUCCEED,
};
use envelope::{DeleteEntry, PatchEntry};

/// Content type of every encoded message.
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";

/// What to do with an empty `zdnsuser`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserPolicy {
    /// Accept tasks with an empty user.
    #[default]
    AllowEmpty,
    /// Reject tasks with an empty user.
    RequireNonEmpty,
}

/// Decode leniency switches.
///
/// # Examples
///
/// ```
/// use restcmd::codec::{CodecConfig, UserPolicy};
///
/// let lenient = CodecConfig::default();
/// assert!(lenient.lenient_delete_ids);
/// assert_eq!(lenient.user_policy, UserPolicy::AllowEmpty);
///
/// let strict = CodecConfig::strict();
/// assert!(!strict.lenient_delete_ids);
/// assert_eq!(strict.user_policy, UserPolicy::RequireNonEmpty);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Decode a malformed DELETE entry as an empty id instead of failing.
    pub lenient_delete_ids: bool,
    /// Policy for the `zdnsuser` field.
    pub user_policy: UserPolicy,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            lenient_delete_ids: true,
            user_policy: UserPolicy::AllowEmpty,
        }
    }
}

impl CodecConfig {
    /// Rejects malformed DELETE entries and empty users.
    pub fn strict() -> Self {
        Self {
            lenient_delete_ids: false,
            user_policy: UserPolicy::RequireNonEmpty,
        }
    }
}

/// Reads a whole message body.
pub(crate) async fn read_body<B>(body: B) -> Result<Bytes, CodecError>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    body.collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(|e| CodecError::BodyRead(e.into()))
}

async fn read_envelope<B>(body: B) -> Result<TaskEnvelope, CodecError>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let body = read_body(body).await?;
    serde_json::from_slice(&body).map_err(CodecError::Envelope)
}

fn decode_patch_entries(envelope: &TaskEnvelope) -> Result<Vec<PatchCmd>, CodecError> {
    envelope
        .attrs
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let entry: PatchEntry =
                serde_json::from_str(raw.get()).map_err(|source| CodecError::MalformedEntry {
                    resource_type: envelope.resource_type.clone(),
                    index,
                    source,
                })?;
            Ok(PatchCmd {
                resource_type: envelope.resource_type.clone(),
                id: entry.id,
                new_attrs: entry.new_attrs.unwrap_or_default(),
            })
        })
        .collect()
}

/// Translates tasks to HTTP requests and results to HTTP responses.
///
/// # Examples
///
/// ```
/// use restcmd::codec::RestCodec;
/// use restcmd::endpoint::Endpoint;
/// use restcmd::resource::ResourceRegistry;
/// use restcmd::types::{DeleteCmd, Task};
///
/// let codec = RestCodec::new(ResourceRegistry::new(), Endpoint::new("host", "127.0.0.1:8080"));
/// let task = Task::new("alice").with_cmd(DeleteCmd::new("host", "42")).unwrap();
/// let request = codec.encode_task(&task).unwrap();
/// assert_eq!(request.method(), "DELETE");
/// assert_eq!(request.uri(), "http://127.0.0.1:8080/host");
/// ```
#[derive(Debug, Clone)]
pub struct RestCodec {
    registry: Arc<ResourceRegistry>,
    endpoint: Endpoint,
    config: CodecConfig,
}

impl RestCodec {
    /// Creates a codec with the default (lenient) configuration.
    pub fn new(registry: ResourceRegistry, endpoint: Endpoint) -> Self {
        Self {
            registry: Arc::new(registry),
            endpoint,
            config: CodecConfig::default(),
        }
    }

    /// Replaces the decode configuration.
    pub fn with_config(mut self, config: CodecConfig) -> Self {
        self.config = config;
        self
    }

    /// Endpoint every request is addressed to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Active decode configuration.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Resource types this codec can decode.
    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    // ---- decode ----

    /// Decodes an incoming request into a task.
    ///
    /// # Errors
    ///
    /// Any [`CodecError`] decode variant: unknown method, bad query,
    /// unreadable body, malformed envelope or entry, unknown resource
    /// type, or an empty user under [`UserPolicy::RequireNonEmpty`].
    pub async fn decode_task<B>(&self, request: Request<B>) -> Result<Task, CodecError>
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = request.into_parts();
        let kind = CommandKind::from_method(&parts.method)
            .ok_or_else(|| CodecError::UnknownMethod(parts.method.clone()))?;

        let task = match kind {
            CommandKind::Get => query::decode_get(parts.uri.query().unwrap_or_default())?,
            CommandKind::Post => {
                let envelope = read_envelope(body).await?;
                let cmds = self
                    .decode_resources(&envelope)?
                    .into_iter()
                    .map(|new_resource| PostCmd { new_resource })
                    .collect();
                Task::from_batch(envelope.user, Commands::Post(cmds))
            }
            CommandKind::Put => {
                let envelope = read_envelope(body).await?;
                let cmds = self
                    .decode_resources(&envelope)?
                    .into_iter()
                    .map(|new_resource| PutCmd { new_resource })
                    .collect();
                Task::from_batch(envelope.user, Commands::Put(cmds))
            }
            CommandKind::Delete => {
                let envelope = read_envelope(body).await?;
                let cmds = self.decode_delete_entries(&envelope)?;
                Task::from_batch(envelope.user, Commands::Delete(cmds))
            }
            CommandKind::Patch => {
                let envelope = read_envelope(body).await?;
                let cmds = decode_patch_entries(&envelope)?;
                Task::from_batch(envelope.user, Commands::Patch(cmds))
            }
        };

        if self.config.user_policy == UserPolicy::RequireNonEmpty && task.user.is_empty() {
            return Err(CodecError::EmptyUser);
        }

        tracing::debug!(method = %parts.method, commands = task.len(), user = %task.user, "decoded task");
        Ok(task)
    }

    fn decode_resources(
        &self,
        envelope: &TaskEnvelope,
    ) -> Result<Vec<Arc<dyn Resource>>, CodecError> {
        let resource_type = envelope.resource_type.as_str();
        envelope
            .attrs
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                self.registry
                    .decode_type(resource_type, raw)
                    .ok_or_else(|| CodecError::UnknownResourceType(resource_type.to_string()))?
                    .map_err(|source| CodecError::MalformedEntry {
                        resource_type: resource_type.to_string(),
                        index,
                        source,
                    })
            })
            .collect()
    }

    fn decode_delete_entries(&self, envelope: &TaskEnvelope) -> Result<Vec<DeleteCmd>, CodecError> {
        let resource_type = envelope.resource_type.as_str();
        let mut cmds = Vec::with_capacity(envelope.attrs.len());
        for (index, raw) in envelope.attrs.iter().enumerate() {
            let id = match serde_json::from_str::<DeleteEntry>(raw.get()) {
                Ok(entry) => entry.id,
                Err(_) if self.config.lenient_delete_ids => String::new(),
                Err(source) => {
                    return Err(CodecError::MalformedEntry {
                        resource_type: resource_type.to_string(),
                        index,
                        source,
                    })
                }
            };
            cmds.push(DeleteCmd::new(resource_type, id));
        }
        Ok(cmds)
    }

    // ---- encode ----

    /// Encodes a task into a request addressed to the configured endpoint.
    ///
    /// # Errors
    ///
    /// [`CodecError::EmptyTask`] for a task without commands,
    /// [`CodecError::GetBatch`] for a Get task with more than one command,
    /// or a serialisation / URL error.
    pub fn encode_task(&self, task: &Task) -> Result<Request<Bytes>, CodecError> {
        let cmds = task
            .cmds()
            .filter(|cmds| !cmds.is_empty())
            .ok_or(CodecError::EmptyTask)?;

        let request = match cmds {
            Commands::Get(cmds) => self.encode_get(task, cmds),
            Commands::Post(cmds) => {
                let resources: Vec<&dyn Resource> =
                    cmds.iter().map(|c| c.new_resource.as_ref()).collect();
                self.encode_resources(Method::POST, task, &resources)
            }
            Commands::Put(cmds) => {
                let resources: Vec<&dyn Resource> =
                    cmds.iter().map(|c| c.new_resource.as_ref()).collect();
                self.encode_resources(Method::PUT, task, &resources)
            }
            Commands::Delete(cmds) => {
                let attrs = cmds
                    .iter()
                    .map(|c| to_raw_value(&DeleteEntry { id: c.id.clone() }))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(CodecError::Serialize)?;
                self.encode_envelope(Method::DELETE, task, &cmds[0].resource_type, attrs)
            }
            Commands::Patch(cmds) => {
                let attrs = cmds
                    .iter()
                    .map(|c| {
                        to_raw_value(&PatchEntry {
                            id: c.id.clone(),
                            new_attrs: Some(c.new_attrs.clone()),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(CodecError::Serialize)?;
                self.encode_envelope(Method::PATCH, task, &cmds[0].resource_type, attrs)
            }
        }?;

        tracing::debug!(method = %request.method(), uri = %request.uri(), commands = cmds.len(), "encoded task");
        Ok(request)
    }

    fn encode_get(&self, task: &Task, cmds: &[GetCmd]) -> Result<Request<Bytes>, CodecError> {
        let [cmd] = cmds else {
            return Err(CodecError::GetBatch { count: cmds.len() });
        };

        let mut url = self.service_url()?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query::encode_get(&task.user, cmd)? {
                pairs.append_pair(&key, &value);
            }
        }
        self.build_request(Method::GET, &url, Bytes::new())
    }

    fn encode_resources(
        &self,
        method: Method,
        task: &Task,
        resources: &[&dyn Resource],
    ) -> Result<Request<Bytes>, CodecError> {
        let resource_type = resources
            .first()
            .map(|r| r.resource_type().to_string())
            .unwrap_or_default();
        let attrs = resources
            .iter()
            .map(|r| r.to_json().and_then(|value| to_raw_value(&value)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(CodecError::Serialize)?;
        self.encode_envelope(method, task, &resource_type, attrs)
    }

    fn encode_envelope(
        &self,
        method: Method,
        task: &Task,
        resource_type: &str,
        attrs: Vec<Box<RawValue>>,
    ) -> Result<Request<Bytes>, CodecError> {
        let envelope = TaskEnvelope {
            resource_type: resource_type.to_string(),
            user: task.user.clone(),
            attrs,
        };
        let body = serde_json::to_vec(&envelope).map_err(CodecError::Serialize)?;
        let url = self.service_url()?;
        self.build_request(method, &url, Bytes::from(body))
    }

    fn service_url(&self) -> Result<Url, CodecError> {
        Ok(Url::parse(&self.endpoint.service_url())?)
    }

    fn build_request(
        &self,
        method: Method,
        url: &Url,
        body: Bytes,
    ) -> Result<Request<Bytes>, CodecError> {
        Ok(Request::builder()
            .method(method)
            .uri(url.as_str())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(ACCEPT, "*/*")
            .body(body)?)
    }

    // ---- results ----

    /// Encodes a task result as a response: status from `code`, JSON body
    /// from `result` (empty when there is none).
    ///
    /// # Errors
    ///
    /// [`CodecError::Serialize`] or [`CodecError::Http`].
    pub fn encode_result(&self, result: &TaskResult) -> Result<Response<Bytes>, CodecError> {
        let body = match &result.result {
            Some(value) => serde_json::to_vec(value).map_err(CodecError::Serialize)?,
            None => Vec::new(),
        };
        Ok(Response::builder()
            .status(result.code)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(Bytes::from(body))?)
    }

    /// Decodes a response into a task result.
    ///
    /// A [`SUCCEED`] status parses the body with `S`, anything else with
    /// `F`. The status code is carried over verbatim.
    ///
    /// # Errors
    ///
    /// [`CodecError::BodyRead`] if the body cannot be read,
    /// [`CodecError::ResultBody`] if it does not parse as the selected shape.
    pub async fn decode_result<S, F, B>(
        &self,
        response: Response<B>,
    ) -> Result<TaskResult<Outcome<S::Output, F::Output>>, CodecError>
    where
        S: ResultShape,
        F: ResultShape,
        B: Body,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = response.into_parts();
        let body = read_body(body).await?;
        let result = if parts.status == SUCCEED {
            S::parse(&body)
                .map_err(CodecError::ResultBody)?
                .map(Outcome::Success)
        } else {
            F::parse(&body)
                .map_err(CodecError::ResultBody)?
                .map(Outcome::Failure)
        };
        Ok(TaskResult {
            code: parts.status,
            result,
        })
    }
}
