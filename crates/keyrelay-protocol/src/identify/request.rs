use serde::{Deserialize, Serialize};

/// Inbound `/identify` body. Both fields are optional at the wire level so that
/// a missing field can be reported by name instead of as a decode error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyRequestBody {
    /// Base64-encoded JPEG bytes, forwarded unchanged.
    #[serde(default)]
    pub image_base64: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
}

impl IdentifyRequestBody {
    pub fn image(&self) -> Option<&str> {
        non_blank(self.image_base64.as_deref())
    }

    pub fn prompt(&self) -> Option<&str> {
        non_blank(self.prompt.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_count_as_missing() {
        let body: IdentifyRequestBody =
            serde_json::from_str(r#"{"imageBase64":"  ","prompt":""}"#).unwrap();
        assert_eq!(body.image(), None);
        assert_eq!(body.prompt(), None);

        let body: IdentifyRequestBody = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(body.image(), None);
    }
}
