use bytes::Bytes;

use keyrelay_common::GlobalConfig;
use keyrelay_protocol::gemini::generate_content::request::GenerateContentRequestBody;
use keyrelay_protocol::gemini::types::{Content, ContentRole, GenerationConfig, Part};
use keyrelay_protocol::identify::request::IdentifyRequestBody;
use keyrelay_protocol::identify::schema::identification_schema;
use keyrelay_provider_core::{ApiKey, Headers, HttpMethod, UpstreamHttpRequest, header_set};

use super::TransformError;

const IMAGE_MIME_TYPE: &str = "image/jpeg";
const RESPONSE_MIME_TYPE: &str = "application/json";

/// Validated `/identify` input; constructing one never touches the key pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifyInput {
    pub image_base64: String,
    pub prompt: String,
}

impl IdentifyInput {
    pub fn from_body(body: &[u8], config: &GlobalConfig) -> Result<Self, TransformError> {
        let parsed: IdentifyRequestBody =
            serde_json::from_slice(body).map_err(TransformError::InvalidJson)?;

        let image_base64 = parsed
            .image()
            .ok_or(TransformError::MissingField("imageBase64"))?
            .to_string();

        let prompt = match parsed.prompt() {
            Some(prompt) => prompt.to_string(),
            None if config.require_prompt => return Err(TransformError::MissingField("prompt")),
            None => config.default_prompt.clone(),
        };

        Ok(Self {
            image_base64,
            prompt,
        })
    }
}

pub fn build_body(input: &IdentifyInput, config: &GlobalConfig) -> GenerateContentRequestBody {
    GenerateContentRequestBody {
        contents: vec![Content {
            role: Some(ContentRole::User),
            parts: vec![
                Part::text(input.prompt.clone()),
                Part::inline_data(IMAGE_MIME_TYPE, input.image_base64.clone()),
            ],
        }],
        generation_config: Some(GenerationConfig {
            response_mime_type: Some(RESPONSE_MIME_TYPE.to_string()),
            response_schema: config.response_schema.then(identification_schema),
        }),
    }
}

/// `POST {base}/{version}/models/{model}:generateContent?key=<credential>`.
pub fn build_request(
    input: &IdentifyInput,
    config: &GlobalConfig,
    key: &ApiKey,
) -> Result<UpstreamHttpRequest, TransformError> {
    let body = serde_json::to_vec(&build_body(input, config)).map_err(TransformError::Encode)?;
    let query = serde_urlencoded::to_string([("key", key.expose())])
        .map_err(TransformError::EncodeQuery)?;

    let mut headers: Headers = Vec::new();
    header_set(&mut headers, "Content-Type", "application/json");
    header_set(&mut headers, "Accept", "application/json");

    Ok(UpstreamHttpRequest {
        method: HttpMethod::Post,
        url: format!("{}?{query}", config.generate_content_url()),
        headers,
        body: Some(Bytes::from(body)),
    })
}

#[cfg(test)]
mod tests {
    use keyrelay_common::GlobalConfigPatch;
    use keyrelay_provider_core::header_get;
    use serde_json::Value;

    use super::*;

    fn config(patch: GlobalConfigPatch) -> GlobalConfig {
        patch.into_config().unwrap()
    }

    #[test]
    fn missing_image_is_reported_by_name() {
        let err = IdentifyInput::from_body(br#"{"prompt":"what is this"}"#, &config(Default::default()))
            .unwrap_err();
        assert!(matches!(err, TransformError::MissingField("imageBase64")));
        assert_eq!(err.to_string(), "Missing required field: imageBase64");
    }

    #[test]
    fn prompt_defaults_unless_required() {
        let lenient = config(GlobalConfigPatch {
            default_prompt: Some("describe".to_string()),
            ..Default::default()
        });
        let input = IdentifyInput::from_body(br#"{"imageBase64":"AAAA"}"#, &lenient).unwrap();
        assert_eq!(input.prompt, "describe");

        let strict = config(GlobalConfigPatch {
            require_prompt: Some(true),
            ..Default::default()
        });
        let err = IdentifyInput::from_body(br#"{"imageBase64":"AAAA","prompt":" "}"#, &strict)
            .unwrap_err();
        assert!(matches!(err, TransformError::MissingField("prompt")));
    }

    #[test]
    fn non_json_body_is_rejected() {
        let err = IdentifyInput::from_body(b"not json", &config(Default::default())).unwrap_err();
        assert!(matches!(err, TransformError::InvalidJson(_)));
    }

    #[test]
    fn request_carries_key_in_query_and_image_unchanged() {
        let config = config(GlobalConfigPatch {
            upstream_base_url: Some("http://stub.local".to_string()),
            model: Some("gemini-test".to_string()),
            ..Default::default()
        });
        let input = IdentifyInput {
            image_base64: "/9j/4AAQSkZJRg==".to_string(),
            prompt: "find parts".to_string(),
        };
        let req = build_request(&input, &config, &ApiKey::new("k+1/=")).unwrap();

        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(
            req.url,
            "http://stub.local/v1beta/models/gemini-test:generateContent?key=k%2B1%2F%3D"
        );
        assert_eq!(header_get(&req.headers, "content-type"), Some("application/json"));
        assert_eq!(header_get(&req.headers, "x-goog-api-key"), None);

        let body: Value = serde_json::from_slice(req.body.as_ref().unwrap()).unwrap();
        let parts = &body["contents"][0]["parts"];
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(parts[0]["text"], "find parts");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[1]["inlineData"]["data"], "/9j/4AAQSkZJRg==");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn schema_can_be_switched_off() {
        let config = config(GlobalConfigPatch {
            response_schema: Some(false),
            ..Default::default()
        });
        let input = IdentifyInput {
            image_base64: "AAAA".to_string(),
            prompt: "p".to_string(),
        };
        let body = serde_json::to_value(build_body(&input, &config)).unwrap();
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert!(body["generationConfig"].get("responseSchema").is_none());
    }
}
