//! Transport clients used by the proxy.
//!
//! A [`Transport`] moves one encoded request to the service and hands
//! back the raw response. It reports an absent response as an error; an
//! HTTP failure status is still a response and is left to the codec.

#[cfg(all(feature = "http-client", not(target_arch = "wasm32")))]
pub mod http_client;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};

use crate::error::TransportError;

#[cfg(all(feature = "http-client", not(target_arch = "wasm32")))]
pub use http_client::ReqwestTransport;

/// Request/response exchange with a remote service.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establishes the connection; a no-op when already connected.
    async fn connect(&self) -> Result<(), TransportError>;

    /// Drops the current connection and establishes a fresh one.
    async fn reconnect(&self) -> Result<(), TransportError>;

    /// Sends `request`, returning the full response.
    ///
    /// # Errors
    ///
    /// [`TransportError::NotConnected`] before [`connect`](Self::connect),
    /// [`TransportError::Send`] when no response arrives.
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError>;

    /// Releases the connection.
    async fn close(&self);
}
