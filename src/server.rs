//! HTTP front end for a [`RestService`].
//!
//! Every method on the endpoint path goes through the same pipeline:
//! decode the request into a [`Task`](crate::types::Task), dispatch it,
//! encode the [`TaskResult`](crate::types::TaskResult) as the response.
//!
//! | Stage    | Failure answer                     |
//! |----------|------------------------------------|
//! | decode   | `400 Bad Request`, error text body |
//! | decode   | `413 Payload Too Large` past the body limit |
//! | dispatch | `500 Internal Server Error`        |
//! | encode   | `500 Internal Server Error`        |

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use http::StatusCode;
use http_body_util::{LengthLimitError, Limited};

use crate::codec::RestCodec;
use crate::endpoint::{Endpoint, ServiceRegistry};
use crate::error::{CodecError, ServerError};
use crate::resource::ResourceRegistry;
use crate::service::{RestService, ServiceDispatcher};
use crate::store::ResourceStore;

/// Largest request body read by [`router`], in bytes.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

struct AppState<S> {
    dispatcher: Arc<ServiceDispatcher<S>>,
    codec: Arc<RestCodec>,
    body_limit: usize,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
            codec: Arc::clone(&self.codec),
            body_limit: self.body_limit,
        }
    }
}

/// Builds the router serving `codec.endpoint().path()`, reading at most
/// [`DEFAULT_BODY_LIMIT`] bytes of each request body.
pub fn router<S>(dispatcher: Arc<ServiceDispatcher<S>>, codec: Arc<RestCodec>) -> Router
where
    S: RestService + 'static,
{
    router_with_body_limit(dispatcher, codec, DEFAULT_BODY_LIMIT)
}

/// Like [`router`], with a custom request body limit in bytes.
pub fn router_with_body_limit<S>(
    dispatcher: Arc<ServiceDispatcher<S>>,
    codec: Arc<RestCodec>,
    body_limit: usize,
) -> Router
where
    S: RestService + 'static,
{
    let path = codec.endpoint().path();
    Router::new()
        .route(&path, any(handle_request::<S>))
        .with_state(AppState {
            dispatcher,
            codec,
            body_limit,
        })
}

fn body_too_large(err: &CodecError) -> bool {
    matches!(err, CodecError::BodyRead(source) if source.is::<LengthLimitError>())
}

async fn handle_request<S>(State(state): State<AppState<S>>, request: Request) -> Response
where
    S: RestService + 'static,
{
    let request = request.map(|body| Limited::new(body, state.body_limit));
    let task = match state.codec.decode_task(request).await {
        Ok(task) => task,
        Err(err) if body_too_large(&err) => {
            tracing::warn!(limit = state.body_limit, "rejecting oversized request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, err.to_string()).into_response();
        }
        Err(err) => {
            tracing::warn!(error = %err, "rejecting undecodable request");
            return (StatusCode::BAD_REQUEST, err.to_string()).into_response();
        }
    };

    let result = match state.dispatcher.handle_task(task).await {
        Ok(result) => result,
        Err(err) => {
            tracing::error!(error = %err, "dispatch failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
        }
    };

    match state.codec.encode_result(&result) {
        Ok(response) => response.map(axum::body::Body::from),
        Err(err) => {
            tracing::error!(error = %err, "encoding task result failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

/// Serves `service` on `endpoint` until the listener fails.
///
/// Registers the service's resource types, announces `endpoint` to
/// `registry`, then binds `endpoint.addr`.
///
/// # Errors
///
/// [`ServerError::Registry`] if registration fails, [`ServerError::Io`]
/// if binding or serving fails.
pub async fn run<S>(
    service: S,
    store: Arc<dyn ResourceStore>,
    registry: &dyn ServiceRegistry,
    endpoint: Endpoint,
) -> Result<(), ServerError>
where
    S: RestService + 'static,
{
    let mut resources = ResourceRegistry::new();
    service.supported_resources(&mut resources)?;

    let codec = Arc::new(RestCodec::new(resources, endpoint.clone()));
    let dispatcher = Arc::new(ServiceDispatcher::new(service, store));
    registry.register(&endpoint).await?;

    let listener = tokio::net::TcpListener::bind(&endpoint.addr).await?;
    tracing::info!(service = %endpoint.name, addr = %listener.local_addr()?, "serving");
    axum::serve(listener, router(dispatcher, codec)).await?;
    Ok(())
}
