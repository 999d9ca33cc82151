use std::sync::Arc;
use std::time::Instant;

use axum::Extension;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::Response;
use bytes::Bytes;
use serde_json::json;
use tracing::{debug, info, warn};

use keyrelay_core::AppState;
use keyrelay_core::relay;
use keyrelay_core::transform;
use keyrelay_core::transform::identify::IdentifyInput;
use keyrelay_core::transform::passthrough::PassthroughInput;
use keyrelay_provider_core::{
    ApiKey, Headers, UpstreamFailure, UpstreamHttpRequest, UpstreamHttpResponse,
};

use crate::response::{error_response, json_response, rejection_response, upstream_response};
use crate::trace::RequestTraceId;

pub(crate) async fn health(State(state): State<Arc<AppState>>) -> Response {
    json_response(
        StatusCode::OK,
        &json!({ "status": "ok", "keys": state.pool.len() }),
    )
}

pub(crate) async fn identify(
    State(state): State<Arc<AppState>>,
    Extension(RequestTraceId(trace_id)): Extension<RequestTraceId>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    // Validate before rotating so rejected requests don't consume a key slot.
    let input = match IdentifyInput::from_body(&body, &state.config) {
        Ok(input) => input,
        Err(err) => return error_response(err.into()),
    };

    let key = state.pool.next();
    let req = match transform::identify::build_request(&input, &state.config, &key) {
        Ok(req) => req,
        Err(err) => return error_response(err.into()),
    };

    let result = forward(&state, &trace_id, "identify", &key, req).await;
    match relay::identify_response(result) {
        Ok(value) => json_response(StatusCode::OK, &value),
        Err(err) => {
            warn!(event = "identify_failed", trace_id = %trace_id, error = %err);
            error_response(err.into())
        }
    }
}

pub(crate) async fn passthrough(
    State(state): State<Arc<AppState>>,
    Extension(RequestTraceId(trace_id)): Extension<RequestTraceId>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    let method = match transform::passthrough::parse_method(method.as_str()) {
        Ok(method) => method,
        Err(err) => return error_response(err.into()),
    };

    let key = state.pool.next();
    let req = transform::passthrough::build_request(
        PassthroughInput {
            method,
            path: uri.path(),
            query: uri.query(),
            headers: headers_to_vec(&headers, &trace_id),
            body,
        },
        &state.config,
        &key,
    );

    let result = forward(&state, &trace_id, "passthrough", &key, req).await;
    match relay::passthrough_response(result) {
        Ok(resp) => upstream_response(resp),
        Err(err) => error_response(err),
    }
}

/// One upstream call with its log lines. The URL is not logged since it may carry the key.
async fn forward(
    state: &AppState,
    trace_id: &str,
    mode: &'static str,
    key: &ApiKey,
    req: UpstreamHttpRequest,
) -> Result<UpstreamHttpResponse, UpstreamFailure> {
    let started_at = Instant::now();
    info!(
        event = "upstream_request",
        trace_id = %trace_id,
        mode,
        method = req.method.as_str(),
        key = %key,
    );

    let result = state.upstream.send(req).await;
    match &result {
        Ok(resp) => info!(
            event = "upstream_responded",
            trace_id = %trace_id,
            mode,
            status = resp.status,
            elapsed_ms = started_at.elapsed().as_millis(),
        ),
        Err(err) => warn!(
            event = "upstream_failed",
            trace_id = %trace_id,
            mode,
            kind = err.kind.as_str(),
            error = %err.message,
            elapsed_ms = started_at.elapsed().as_millis(),
        ),
    }
    result
}

/// Header values that are not visible ASCII cannot be carried as strings and are left out.
fn headers_to_vec(headers: &HeaderMap, trace_id: &str) -> Headers {
    let mut out: Headers = Vec::new();
    for (name, value) in headers {
        match value.to_str() {
            Ok(v) => out.push((name.as_str().to_string(), v.to_string())),
            Err(_) => debug!(
                event = "header_dropped",
                trace_id = %trace_id,
                name = name.as_str(),
                len = value.len(),
            ),
        }
    }
    out
}
