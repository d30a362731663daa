//! Gateway HTTP handler
//!
//! Every method and path is routed to [`invoke_gateway`], which parses the
//! body into an [`InvocationRequest`], runs it through the coordinator and
//! renders the committed result.

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::Response,
    routing::any,
    Router,
};
use bytes::Bytes;
use fngate_core::{GatewayFailure, RequestId, REQUEST_ID_HEADER};
use serde_json::Value;
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{error, info, info_span, Instrument};

use crate::coordinator::InvocationCoordinator;
use crate::invocation::{CompletionResult, InvocationRequest};

/// Default request body limit (6 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 6 * 1024 * 1024;

/// Shared state for the gateway handler
pub struct GatewayState {
    pub coordinator: InvocationCoordinator,
    pub max_body_bytes: usize,
}

impl GatewayState {
    pub fn new(coordinator: InvocationCoordinator) -> Self {
        Self {
            coordinator,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

/// Create the gateway router: every path and method reaches [`invoke_gateway`]
pub fn gateway_router(state: Arc<GatewayState>) -> Router {
    let max_body_bytes = state.max_body_bytes;

    Router::new()
        .route("/", any(invoke_gateway))
        .route("/*path", any(invoke_gateway))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ))
        .with_state(state)
}

/// Any method, any path
///
/// Invokes the gateway's handler with the request body's `event` and
/// `context` and responds with whatever the invocation commits.
pub async fn invoke_gateway(
    State(state): State<Arc<GatewayState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = RequestId::new();
    let span = info_span!("invocation", request_id = %request_id);

    async move {
        info!(method = %method, path = %uri.path(), "Function triggered");

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());

        let result = match InvocationRequest::from_body(content_type, &body) {
            Ok(request) => state.coordinator.handle(request).await,
            Err(failure) => CompletionResult::Failure(failure),
        };

        completion_response(result, &request_id)
    }
    .instrument(span)
    .await
}

/// Render a committed result
pub fn completion_response(result: CompletionResult, request_id: &RequestId) -> Response {
    let (status, body) = match result {
        CompletionResult::Success(payload) => (StatusCode::OK, payload),
        CompletionResult::Failure(failure) => (failure_status(&failure), failure.body),
        CompletionResult::Pending => {
            error!("Rendering an invocation that never committed");
            let failure = GatewayFailure::invocation("Invocation did not complete");
            (failure_status(&failure), failure.body)
        }
    };

    let mut response = payload_response(status, body);
    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

fn failure_status(failure: &GatewayFailure) -> StatusCode {
    StatusCode::from_u16(failure.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Strings are sent as text, `null` as an empty body, anything else as JSON
fn payload_response(status: StatusCode, payload: Value) -> Response {
    let (content_type, body) = match payload {
        Value::Null => (None, Body::empty()),
        Value::String(text) => (Some("text/plain; charset=utf-8"), Body::from(text)),
        other => (Some("application/json"), Body::from(other.to_string())),
    };

    let mut builder = Response::builder().status(status);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }

    builder.body(body).unwrap_or_else(|e| {
        error!(error = %e, "Failed to build response");
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_string_payload_is_text() {
        let response = payload_response(StatusCode::OK, json!("hello"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_text(response).await, "hello");
    }

    #[tokio::test]
    async fn test_structured_payload_is_json() {
        let response = payload_response(StatusCode::OK, json!({"items": [1, 2]}));
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(body_text(response).await, r#"{"items":[1,2]}"#);

        let response = payload_response(StatusCode::OK, json!(42));
        assert_eq!(body_text(response).await, "42");
    }

    #[tokio::test]
    async fn test_null_payload_is_empty() {
        let response = payload_response(StatusCode::OK, Value::Null);
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
        assert_eq!(body_text(response).await, "");
    }

    #[tokio::test]
    async fn test_failure_response() {
        let request_id = RequestId::with_id("REQ1");
        let response = completion_response(
            CompletionResult::Failure(GatewayFailure::callback(json!({"code": 7}))),
            &request_id,
        );

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "REQ1");
        assert_eq!(body_text(response).await, r#"{"code":7}"#);
    }

    #[tokio::test]
    async fn test_malformed_request_status() {
        let response = completion_response(
            CompletionResult::Failure(GatewayFailure::malformed_request("bad json")),
            &RequestId::new(),
        );
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
