use std::time::Instant;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tracing::info;

pub const REQUEST_ID_HEADER: &str = "x-keyrelay-request-id";

#[derive(Debug, Clone)]
pub(crate) struct RequestTraceId(pub(crate) String);

/// Tags each request with a trace id and logs it on the way in and out.
/// The query string is never logged: clients may put a `key` there.
pub(crate) async fn request_trace(mut req: Request, next: Next) -> Response {
    let trace_id = uuid::Uuid::now_v7().to_string();
    let started_at = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!(
        event = "downstream_received",
        trace_id = %trace_id,
        method = %method,
        path = %path,
    );
    req.extensions_mut()
        .insert(RequestTraceId(trace_id.clone()));

    let mut resp = next.run(req).await;

    info!(
        event = "downstream_responded",
        trace_id = %trace_id,
        method = %method,
        path = %path,
        status = resp.status().as_u16(),
        elapsed_ms = started_at.elapsed().as_millis(),
    );
    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        resp.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    resp
}
