//! Credential pool and upstream HTTP value types for keyrelay.
//!
//! This crate does **not** depend on axum or any concrete HTTP client. Request
//! builders produce `UpstreamHttpRequest`, and a higher layer performs IO.

pub mod headers;
pub mod key_pool;
pub mod upstream;

pub use headers::{Headers, header_get, header_remove, header_set};
pub use key_pool::{ApiKey, KeyPool, KeyPoolError};
pub use upstream::{
    HttpMethod, UpstreamFailure, UpstreamHttpRequest, UpstreamHttpResponse,
    UpstreamTransportErrorKind,
};
