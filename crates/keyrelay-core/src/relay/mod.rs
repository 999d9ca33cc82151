//! Turns upstream results into what the client sees.

use bytes::Bytes;
use http::StatusCode;
use serde_json::Value;

use keyrelay_protocol::gemini::generate_content::response::GenerateContentResponse;
use keyrelay_provider_core::{UpstreamFailure, UpstreamHttpResponse};

use crate::error::{ProxyError, diagnostic_value};

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Failed to reach AI service")]
    Transport(#[source] UpstreamFailure),
    #[error("AI service returned an error")]
    UpstreamStatus { status: u16, body: Bytes },
    #[error("Upstream returned an invalid response envelope")]
    Envelope {
        #[source]
        source: serde_json::Error,
        body: Bytes,
    },
    #[error("AI response was blocked or empty")]
    Blocked { body: Bytes },
    #[error("Invalid AI output format")]
    EmbeddedJson {
        #[source]
        source: serde_json::Error,
        text: String,
    },
}

impl From<RelayError> for ProxyError {
    fn from(err: RelayError) -> Self {
        let message = err.to_string();
        match err {
            RelayError::Transport(failure) => {
                ProxyError::internal(message).with_details(failure.to_string())
            }
            RelayError::UpstreamStatus { status, body } => {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                ProxyError::new(status, message).with_details(diagnostic_value(&body))
            }
            RelayError::Envelope { source, body } => {
                tracing::warn!(event = "upstream_envelope_invalid", error = %source);
                ProxyError::bad_request(message).with_details(diagnostic_value(&body))
            }
            RelayError::Blocked { body } => {
                ProxyError::bad_request(message).with_details(diagnostic_value(&body))
            }
            RelayError::EmbeddedJson { text, .. } => {
                ProxyError::internal(message).with_details(text)
            }
        }
    }
}

/// Structured mode: unwrap the `generateContent` envelope, then parse the model's text
/// as JSON. Two decode steps, each with its own failure.
pub fn identify_response(
    result: Result<UpstreamHttpResponse, UpstreamFailure>,
) -> Result<Value, RelayError> {
    let resp = result.map_err(RelayError::Transport)?;
    if !resp.is_success() {
        return Err(RelayError::UpstreamStatus {
            status: resp.status,
            body: resp.body,
        });
    }

    let envelope: GenerateContentResponse = match serde_json::from_slice(&resp.body) {
        Ok(envelope) => envelope,
        Err(source) => {
            return Err(RelayError::Envelope {
                source,
                body: resp.body,
            });
        }
    };

    let Some(text) = envelope.first_text() else {
        tracing::warn!(
            event = "upstream_no_text",
            block_reason = ?envelope.block_reason(),
            candidates = envelope.candidates.len(),
        );
        return Err(RelayError::Blocked { body: resp.body });
    };

    serde_json::from_str(text).map_err(|source| RelayError::EmbeddedJson {
        source,
        text: text.to_string(),
    })
}

/// Transparent mode: any HTTP response is relayed as-is; only a missing response is an error.
pub fn passthrough_response(
    result: Result<UpstreamHttpResponse, UpstreamFailure>,
) -> Result<UpstreamHttpResponse, ProxyError> {
    result.map_err(|failure| {
        ProxyError::bad_gateway("Upstream request failed").with_details(failure.to_string())
    })
}
