//! HTTP transport backed by [`reqwest`].

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use parking_lot::RwLock;

use super::Transport;
use crate::error::TransportError;

/// [`Transport`] over a pooled `reqwest::Client`.
///
/// The client is built on [`connect`](Transport::connect) with the
/// configured timeout, rebuilt on [`reconnect`](Transport::reconnect) and
/// dropped on [`close`](Transport::close).
#[derive(Debug)]
pub struct ReqwestTransport {
    timeout: Duration,
    client: RwLock<Option<reqwest::Client>>,
}

impl ReqwestTransport {
    /// Creates a disconnected transport.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            client: RwLock::new(None),
        }
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns `true` between `connect` and `close`.
    pub fn is_connected(&self) -> bool {
        self.client.read().is_some()
    }

    fn build_client(&self) -> Result<reqwest::Client, TransportError> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| TransportError::Connect(format!("failed to create HTTP client: {e}")))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        if self.is_connected() {
            return Ok(());
        }
        let client = self.build_client()?;
        *self.client.write() = Some(client);
        Ok(())
    }

    async fn reconnect(&self) -> Result<(), TransportError> {
        let client = self.build_client()?;
        *self.client.write() = Some(client);
        tracing::debug!("http client rebuilt");
        Ok(())
    }

    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        let client = self
            .client
            .read()
            .clone()
            .ok_or(TransportError::NotConnected)?;

        let (parts, body) = request.into_parts();
        let response = client
            .request(parts.method, parts.uri.to_string())
            .headers(parts.headers)
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Send(format!("reading response body: {e}")))?;

        let mut out = Response::new(body);
        *out.status_mut() = status;
        *out.headers_mut() = headers;
        Ok(out)
    }

    async fn close(&self) {
        self.client.write().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_before_connect_fails() {
        let transport = ReqwestTransport::new(Duration::from_secs(1));
        let request = Request::get("http://127.0.0.1:1/host")
            .body(Bytes::new())
            .unwrap();
        assert!(matches!(
            transport.send(request).await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn connect_and_close_toggle_state() {
        let transport = ReqwestTransport::new(Duration::from_secs(1));
        assert!(!transport.is_connected());
        transport.connect().await.unwrap();
        assert!(transport.is_connected());
        transport.reconnect().await.unwrap();
        assert!(transport.is_connected());
        transport.close().await;
        assert!(!transport.is_connected());
    }
}
