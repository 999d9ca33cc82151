use std::any::Any;

use axum::body::Body;
use axum::extract::rejection::BytesRejection;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::Response;
use bytes::Bytes;
use serde_json::Value;

use keyrelay_core::ProxyError;
use keyrelay_provider_core::UpstreamHttpResponse;

pub(crate) fn error_response(err: ProxyError) -> Response {
    let body = err.body();
    bytes_response(err.status, Some(json_content_type()), body)
}

pub(crate) fn json_response(status: StatusCode, value: &Value) -> Response {
    bytes_response(
        status,
        Some(json_content_type()),
        Bytes::from(value.to_string()),
    )
}

/// Status and body go back untouched; `content-type` is the only header carried over.
pub(crate) fn upstream_response(resp: UpstreamHttpResponse) -> Response {
    let status = StatusCode::from_u16(resp.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = resp
        .content_type()
        .and_then(|value| HeaderValue::from_str(value).ok());
    bytes_response(status, content_type, resp.body)
}

/// Body read failures (the size limit included) use the same JSON envelope as every other error.
pub(crate) fn rejection_response(rejection: BytesRejection) -> Response {
    let status = rejection.status();
    let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
        "Request body too large"
    } else {
        "Failed to read request body"
    };
    tracing::warn!(event = "request_body_rejected", status = status.as_u16());
    error_response(ProxyError::new(status, message).with_details(rejection.body_text()))
}

pub(crate) fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(message) = err.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = err.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "handler panicked".to_string()
    };
    tracing::error!(event = "handler_panicked", details = %details);
    error_response(ProxyError::internal("Internal server error").with_details(details))
}

fn bytes_response(status: StatusCode, content_type: Option<HeaderValue>, body: Bytes) -> Response {
    let mut resp = Response::new(Body::from(body));
    *resp.status_mut() = status;
    if let Some(value) = content_type {
        resp.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    resp
}

fn json_content_type() -> HeaderValue {
    HeaderValue::from_static("application/json")
}
