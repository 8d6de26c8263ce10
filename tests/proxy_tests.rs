//! Integration tests for the proxy's connect / send / resend sequence.
//!
//! A scripted transport replays queued send outcomes and counts every
//! call, so tests can assert exactly one reconnect and one resend.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response, StatusCode};
use parking_lot::Mutex;
use serde_json::{json, Value};

mod common;

use common::codec;
use restcmd::codec::{Discard, Json};
use restcmd::error::{ProxyError, TransportError};
use restcmd::proxy::RestProxy;
use restcmd::transport::Transport;
use restcmd::types::{DeleteCmd, FailureBody, Outcome, Task};

type SendOutcome = Result<Response<Bytes>, TransportError>;

#[derive(Default)]
struct ScriptedTransport {
    script: Mutex<VecDeque<SendOutcome>>,
    sent: Mutex<Vec<Request<Bytes>>>,
    connects: AtomicUsize,
    reconnects: AtomicUsize,
    closes: AtomicUsize,
    fail_connect: bool,
    fail_reconnect: bool,
}

impl ScriptedTransport {
    fn new(script: Vec<SendOutcome>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    fn sends(&self) -> usize {
        self.sent.lock().len()
    }

    fn reconnects(&self) -> usize {
        self.reconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect {
            return Err(TransportError::Connect("connection refused".to_string()));
        }
        Ok(())
    }

    async fn reconnect(&self) -> Result<(), TransportError> {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
        if self.fail_reconnect {
            return Err(TransportError::Connect("connection refused".to_string()));
        }
        Ok(())
    }

    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        self.sent.lock().push(request);
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Send("script exhausted".to_string())))
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

fn ok(status: StatusCode, body: Value) -> SendOutcome {
    let mut response = Response::new(Bytes::from(body.to_string()));
    *response.status_mut() = status;
    Ok(response)
}

fn lost(message: &str) -> SendOutcome {
    Err(TransportError::Send(message.to_string()))
}

fn delete_task() -> Task {
    Task::new("alice")
        .with_cmd(DeleteCmd::new("host", "1"))
        .unwrap()
}

mod resend_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn answered_first_time() {
        let proxy = RestProxy::new(
            codec(),
            ScriptedTransport::new(vec![ok(StatusCode::OK, json!({"deleted": 1}))]),
        );

        let result = proxy
            .handle_task::<Json<Value>, Json<FailureBody>>(&delete_task())
            .await
            .unwrap();
        assert_eq!(result.result, Some(Outcome::Success(json!({"deleted": 1}))));
        assert_eq!(proxy.transport().connects.load(Ordering::SeqCst), 1);
        assert_eq!(proxy.transport().reconnects(), 0);
        assert_eq!(proxy.transport().sends(), 1);
    }

    #[tokio::test]
    async fn lost_response_is_resent_once() {
        let proxy = RestProxy::new(
            codec(),
            ScriptedTransport::new(vec![
                lost("connection reset"),
                ok(StatusCode::OK, json!({"deleted": 1})),
            ]),
        );

        let result = proxy
            .handle_task::<Json<Value>, Discard>(&delete_task())
            .await
            .unwrap();
        assert!(result.is_success());
        assert_eq!(proxy.transport().reconnects(), 1);
        assert_eq!(proxy.transport().sends(), 2);

        let sent = proxy.transport().sent.lock();
        assert_eq!(sent[0].body(), sent[1].body());
        assert_eq!(sent[0].uri(), sent[1].uri());
    }

    #[tokio::test]
    async fn second_loss_returns_second_error() {
        let proxy = RestProxy::new(
            codec(),
            ScriptedTransport::new(vec![lost("first"), lost("second"), lost("third")]),
        );

        let err = proxy
            .handle_task::<Json<Value>, Json<FailureBody>>(&delete_task())
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Send(TransportError::Send(ref m)) if m == "second"));
        assert_eq!(proxy.transport().reconnects(), 1);
        assert_eq!(proxy.transport().sends(), 2);
    }

    #[tokio::test]
    async fn failure_status_is_a_result_not_a_resend() {
        let proxy = RestProxy::new(
            codec(),
            ScriptedTransport::new(vec![ok(
                StatusCode::BAD_REQUEST,
                json!({"error": "delete unknown resource: host with id 1"}),
            )]),
        );

        let result = proxy
            .handle_task::<Json<Value>, Json<FailureBody>>(&delete_task())
            .await
            .unwrap();
        assert_eq!(result.code, StatusCode::BAD_REQUEST);
        assert_eq!(
            result.result,
            Some(Outcome::Failure(FailureBody {
                error: "delete unknown resource: host with id 1".to_string()
            }))
        );
        assert_eq!(proxy.transport().reconnects(), 0);
    }
}

mod failure_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn encode_failure_precedes_connect() {
        let proxy = RestProxy::new(codec(), ScriptedTransport::new(vec![]));

        let err = proxy
            .handle_task::<Discard, Discard>(&Task::new("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Encode(_)));
        assert_eq!(proxy.transport().connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn connect_failure_precedes_send() {
        let transport = ScriptedTransport {
            fail_connect: true,
            ..Default::default()
        };
        let proxy = RestProxy::new(codec(), transport);

        let err = proxy
            .handle_task::<Discard, Discard>(&delete_task())
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Connect(_)));
        assert_eq!(proxy.transport().sends(), 0);
    }

    #[tokio::test]
    async fn reconnect_failure_stops_resend() {
        let transport = ScriptedTransport {
            script: Mutex::new(vec![lost("reset")].into()),
            fail_reconnect: true,
            ..Default::default()
        };
        let proxy = RestProxy::new(codec(), transport);

        let err = proxy
            .handle_task::<Discard, Discard>(&delete_task())
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Connect(_)));
        assert_eq!(proxy.transport().sends(), 1);
    }

    #[tokio::test]
    async fn undecodable_body_is_a_decode_error() {
        let mut response = Response::new(Bytes::from_static(b"<html>"));
        *response.status_mut() = StatusCode::OK;
        let proxy = RestProxy::new(codec(), ScriptedTransport::new(vec![Ok(response)]));

        let err = proxy
            .handle_task::<Json<Value>, Discard>(&delete_task())
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Decode(_)));
    }

    #[tokio::test]
    async fn close_reaches_transport() {
        let proxy = RestProxy::new(codec(), ScriptedTransport::new(vec![]));
        proxy.close().await;
        assert_eq!(proxy.transport().closes.load(Ordering::SeqCst), 1);
    }
}
