//! HTTP surface: `/health`, `/identify` and transparent `/v1`, `/v1beta` forwarding.

mod proxy;
mod response;
mod trace;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{any, get, post};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use keyrelay_core::AppState;

pub use trace::REQUEST_ID_HEADER;

pub fn router(state: Arc<AppState>) -> Router {
    let max_body_bytes = state.config.max_body_bytes;

    Router::new()
        .route("/health", get(proxy::health))
        .route("/identify", post(proxy::identify))
        .route("/v1/{*path}", any(proxy::passthrough))
        .route("/v1beta/{*path}", any(proxy::passthrough))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        // Inside the trace middleware so panics still get a request id and a log line.
        .layer(CatchPanicLayer::custom(response::panic_response))
        .layer(middleware::from_fn(trace::request_trace))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
