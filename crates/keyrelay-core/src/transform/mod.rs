//! Builds outbound requests from inbound ones.
//!
//! `identify` constructs a fixed `generateContent` envelope; `passthrough` copies the
//! inbound request onto the upstream origin with the credential swapped in.

pub mod identify;
pub mod passthrough;

use crate::error::ProxyError;

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Invalid JSON body")]
    InvalidJson(#[source] serde_json::Error),
    #[error("Failed to encode upstream request")]
    Encode(#[source] serde_json::Error),
    #[error("Failed to encode upstream query")]
    EncodeQuery(#[source] serde_urlencoded::ser::Error),
    #[error("Unsupported method: {0}")]
    UnsupportedMethod(String),
}

impl From<TransformError> for ProxyError {
    fn from(err: TransformError) -> Self {
        match &err {
            TransformError::InvalidJson(source) => {
                ProxyError::bad_request(err.to_string()).with_details(source.to_string())
            }
            TransformError::MissingField(_) => ProxyError::bad_request(err.to_string()),
            TransformError::Encode(source) => {
                ProxyError::internal(err.to_string()).with_details(source.to_string())
            }
            TransformError::EncodeQuery(source) => {
                ProxyError::internal(err.to_string()).with_details(source.to_string())
            }
            TransformError::UnsupportedMethod(_) => {
                ProxyError::new(http::StatusCode::METHOD_NOT_ALLOWED, err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use serde::ser::Error as _;

    use super::*;

    #[test]
    fn encoding_failures_are_server_errors() {
        let err: ProxyError =
            TransformError::EncodeQuery(serde_urlencoded::ser::Error::custom("bad pair")).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Failed to encode upstream query");
        assert_eq!(err.details, Some(serde_json::json!("bad pair")));
    }

    #[test]
    fn client_mistakes_are_bad_requests() {
        let err: ProxyError = TransformError::MissingField("imageBase64").into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err: ProxyError = TransformError::UnsupportedMethod("TRACE".to_string()).into();
        assert_eq!(err.status, StatusCode::METHOD_NOT_ALLOWED);
    }
}
