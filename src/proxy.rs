//! Client side of a task exchange.
//!
//! [`RestProxy::handle_task`] encodes a task, sends it, and decodes the
//! answer. A send that yields no response triggers exactly one reconnect
//! followed by one re-encode and resend; there is no backoff and no
//! further retry. Timeouts belong to the transport.
//!
//! # Examples
//!
//! ```no_run
//! # #[cfg(feature = "http-client")]
//! # async fn demo() -> Result<(), restcmd::ProxyError> {
//! use restcmd::codec::{Discard, Json};
//! use restcmd::endpoint::Endpoint;
//! use restcmd::proxy::{get_proxy_of_service, ProxyConfig};
//! use restcmd::resource::ResourceRegistry;
//! use restcmd::types::{FailureBody, GetCmd, Outcome, Task};
//!
//! let endpoint = Endpoint::new("host", "127.0.0.1:8080");
//! let proxy = get_proxy_of_service(endpoint, ResourceRegistry::new(), ProxyConfig::default());
//!
//! let task = Task::new("alice").with_cmd(GetCmd::new("host")).unwrap();
//! let result = proxy
//!     .handle_task::<Json<serde_json::Value>, Json<FailureBody>>(&task)
//!     .await?;
//! match result.result {
//!     Some(Outcome::Success(hosts)) => println!("{hosts}"),
//!     Some(Outcome::Failure(body)) => eprintln!("{}", body.error),
//!     None => {}
//! }
//! proxy.close().await;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use http_body_util::Full;

use crate::codec::{RestCodec, ResultShape};
use crate::error::ProxyError;
use crate::transport::Transport;
use crate::types::{Outcome, Task, TaskResult};

/// Default transport timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variable overriding the transport timeout, in milliseconds.
pub const TIMEOUT_ENV: &str = "RESTCMD_TIMEOUT_MS";

/// Proxy settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Timeout applied by the transport client to every request.
    pub timeout: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ProxyConfig {
    /// Reads [`TIMEOUT_ENV`], falling back to the default when it is unset
    /// or not a number.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(value) = std::env::var(TIMEOUT_ENV) {
            if let Ok(ms) = value.parse::<u64>() {
                config.timeout = Duration::from_millis(ms);
            }
        }
        config
    }
}

/// Sends tasks to one service.
#[derive(Debug)]
pub struct RestProxy<T> {
    codec: RestCodec,
    transport: T,
}

impl<T: Transport> RestProxy<T> {
    /// Creates a proxy; the transport connects lazily on the first task.
    pub fn new(codec: RestCodec, transport: T) -> Self {
        Self { codec, transport }
    }

    /// The codec used for both directions.
    pub fn codec(&self) -> &RestCodec {
        &self.codec
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Exchanges one task with the service.
    ///
    /// `S` shapes a success body and `F` a failure body; pass
    /// [`Discard`](crate::codec::Discard) to leave either one unread.
    ///
    /// # Errors
    ///
    /// - [`ProxyError::Encode`] if the task cannot be encoded
    /// - [`ProxyError::Connect`] if connecting or reconnecting fails
    /// - [`ProxyError::Send`] with the second transport error when the
    ///   resend also fails
    /// - [`ProxyError::Decode`] if the response does not decode
    pub async fn handle_task<S, F>(
        &self,
        task: &Task,
    ) -> Result<TaskResult<Outcome<S::Output, F::Output>>, ProxyError>
    where
        S: ResultShape,
        F: ResultShape,
    {
        let request = self.codec.encode_task(task).map_err(ProxyError::Encode)?;
        self.transport
            .connect()
            .await
            .map_err(ProxyError::Connect)?;

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(service = %self.codec.endpoint().name, error = %err, "send failed, reconnecting");
                self.transport
                    .reconnect()
                    .await
                    .map_err(ProxyError::Connect)?;
                let request = self.codec.encode_task(task).map_err(ProxyError::Encode)?;
                self.transport
                    .send(request)
                    .await
                    .map_err(ProxyError::Send)?
            }
        };

        tracing::debug!(service = %self.codec.endpoint().name, status = %response.status(), "task answered");
        self.codec
            .decode_result::<S, F, _>(response.map(Full::new))
            .await
            .map_err(ProxyError::Decode)
    }

    /// Closes the transport.
    pub async fn close(&self) {
        self.transport.close().await;
    }
}

#[cfg(all(feature = "http-client", not(target_arch = "wasm32")))]
mod helpers {
    use super::{ProxyConfig, RestProxy};
    use crate::codec::RestCodec;
    use crate::endpoint::{Endpoint, ServiceRegistry};
    use crate::error::ProxyError;
    use crate::resource::ResourceRegistry;
    use crate::transport::ReqwestTransport;

    /// Resolves `name` through `registry` and builds an HTTP proxy for it.
    ///
    /// # Errors
    ///
    /// [`ProxyError::Registry`] if the service is unknown.
    pub async fn get_proxy(
        registry: &dyn ServiceRegistry,
        name: &str,
        resources: ResourceRegistry,
    ) -> Result<RestProxy<ReqwestTransport>, ProxyError> {
        let endpoint = registry.resolve(name).await?;
        Ok(get_proxy_of_service(
            endpoint,
            resources,
            ProxyConfig::from_env(),
        ))
    }

    /// Builds an HTTP proxy for a known endpoint.
    pub fn get_proxy_of_service(
        endpoint: Endpoint,
        resources: ResourceRegistry,
        config: ProxyConfig,
    ) -> RestProxy<ReqwestTransport> {
        let codec = RestCodec::new(resources, endpoint);
        RestProxy::new(codec, ReqwestTransport::new(config.timeout))
    }
}

#[cfg(all(feature = "http-client", not(target_arch = "wasm32")))]
pub use helpers::{get_proxy, get_proxy_of_service};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeout_is_one_minute() {
        assert_eq!(ProxyConfig::default().timeout, Duration::from_secs(60));
    }
}
