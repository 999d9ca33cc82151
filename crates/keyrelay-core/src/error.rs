use bytes::Bytes;
use http::StatusCode;
use serde_json::{Value, json};

/// Client-facing failure rendered as `{ "error": .., "details"?: .. }`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<Value>,
}

impl ProxyError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<Value>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn body(&self) -> Bytes {
        let mut value = json!({ "error": self.message });
        if let Some(details) = &self.details {
            value["details"] = details.clone();
        }
        Bytes::from(value.to_string())
    }
}

/// Upstream bodies go back to the client as JSON when they parse, else as text.
pub fn diagnostic_value(body: &[u8]) -> Value {
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_omits_missing_details() {
        let err = ProxyError::bad_request("Missing required field: imageBase64");
        assert_eq!(
            err.body(),
            Bytes::from_static(br#"{"error":"Missing required field: imageBase64"}"#)
        );
    }

    #[test]
    fn diagnostic_value_prefers_json() {
        assert_eq!(diagnostic_value(br#"{"a":1}"#), json!({ "a": 1 }));
        assert_eq!(diagnostic_value(b"plain"), json!("plain"));
    }
}
