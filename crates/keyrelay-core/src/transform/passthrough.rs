use bytes::Bytes;

use keyrelay_common::GlobalConfig;
use keyrelay_provider_core::{ApiKey, Headers, HttpMethod, UpstreamHttpRequest, header_set};

use super::TransformError;

pub const CREDENTIAL_HEADER: &str = "x-goog-api-key";
pub const CREDENTIAL_QUERY_PARAM: &str = "key";

/// Never copied from the client: credentials, cookies, framing and hop-by-hop headers.
/// `accept-encoding` is dropped too since only `content-type` is relayed back.
const DENIED_HEADERS: &[&str] = &[
    "host",
    "content-length",
    "authorization",
    CREDENTIAL_HEADER,
    "x-api-key",
    "cookie",
    "connection",
    "accept-encoding",
    "keep-alive",
    "proxy-authorization",
    "proxy-authenticate",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

#[derive(Debug, Clone)]
pub struct PassthroughInput<'a> {
    pub method: HttpMethod,
    /// Inbound path including its `/v1` or `/v1beta` prefix.
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub headers: Headers,
    pub body: Bytes,
}

pub fn parse_method(method: &str) -> Result<HttpMethod, TransformError> {
    HttpMethod::parse(method).ok_or_else(|| TransformError::UnsupportedMethod(method.to_string()))
}

pub fn build_request(
    input: PassthroughInput<'_>,
    config: &GlobalConfig,
    key: &ApiKey,
) -> UpstreamHttpRequest {
    let method = input.method;
    let mut url = format!(
        "{}/{}",
        config.upstream_base_url,
        input.path.trim_start_matches('/')
    );
    if let Some(query) = strip_credential_query(input.query) {
        url.push('?');
        url.push_str(&query);
    }

    let mut headers: Headers = input
        .headers
        .into_iter()
        .filter(|(name, _)| is_forwardable_header(name))
        .collect();
    header_set(&mut headers, CREDENTIAL_HEADER, key.expose());

    let body = (!method.is_bodyless()).then_some(input.body);

    UpstreamHttpRequest {
        method,
        url,
        headers,
        body,
    }
}

pub fn is_forwardable_header(name: &str) -> bool {
    !DENIED_HEADERS
        .iter()
        .any(|denied| name.eq_ignore_ascii_case(denied))
}

/// Drops every `key=` pair while leaving the other pairs byte-for-byte intact.
pub fn strip_credential_query(query: Option<&str>) -> Option<String> {
    let kept: Vec<&str> = query?
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| pair.split('=').next() != Some(CREDENTIAL_QUERY_PARAM))
        .collect();
    if kept.is_empty() {
        return None;
    }
    Some(kept.join("&"))
}

#[cfg(test)]
mod tests {
    use keyrelay_common::GlobalConfigPatch;
    use keyrelay_provider_core::header_get;

    use super::*;

    fn config() -> GlobalConfig {
        GlobalConfigPatch {
            upstream_base_url: Some("http://stub.local/".to_string()),
            ..Default::default()
        }
        .into_config()
        .unwrap()
    }

    fn headers(pairs: &[(&str, &str)]) -> Headers {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn query_key_is_removed_other_params_kept() {
        assert_eq!(strip_credential_query(None), None);
        assert_eq!(strip_credential_query(Some("key=abc")), None);
        assert_eq!(
            strip_credential_query(Some("alt=sse&key=abc&pageSize=5")).as_deref(),
            Some("alt=sse&pageSize=5")
        );
        assert_eq!(
            strip_credential_query(Some("keyword=x%20y")).as_deref(),
            Some("keyword=x%20y")
        );
    }

    #[test]
    fn sensitive_headers_are_replaced_by_pool_key() {
        let req = build_request(
            PassthroughInput {
                method: HttpMethod::Post,
                path: "/v1beta/models/gemini-pro:generateContent",
                query: Some("key=client"),
                headers: headers(&[
                    ("Host", "proxy.local"),
                    ("Authorization", "Bearer client"),
                    ("Cookie", "session=1"),
                    ("X-Goog-Api-Key", "client"),
                    ("Content-Length", "2"),
                    ("Content-Type", "application/json"),
                    ("x-custom", "kept"),
                ]),
                body: Bytes::from_static(b"{}"),
            },
            &config(),
            &ApiKey::new("pool-key"),
        );

        assert_eq!(
            req.url,
            "http://stub.local/v1beta/models/gemini-pro:generateContent"
        );
        assert_eq!(header_get(&req.headers, "authorization"), None);
        assert_eq!(header_get(&req.headers, "cookie"), None);
        assert_eq!(header_get(&req.headers, "host"), None);
        assert_eq!(header_get(&req.headers, "content-length"), None);
        assert_eq!(header_get(&req.headers, "x-goog-api-key"), Some("pool-key"));
        assert_eq!(
            req.headers
                .iter()
                .filter(|(k, _)| k.eq_ignore_ascii_case("x-goog-api-key"))
                .count(),
            1
        );
        assert_eq!(header_get(&req.headers, "content-type"), Some("application/json"));
        assert_eq!(header_get(&req.headers, "x-custom"), Some("kept"));
        assert_eq!(req.body.as_deref(), Some(&b"{}"[..]));
    }

    #[test]
    fn get_requests_carry_no_body() {
        let req = build_request(
            PassthroughInput {
                method: HttpMethod::Get,
                path: "/v1beta/models",
                query: Some("pageSize=10"),
                headers: Vec::new(),
                body: Bytes::from_static(b"ignored"),
            },
            &config(),
            &ApiKey::new("pool-key"),
        );
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://stub.local/v1beta/models?pageSize=10");
        assert!(req.body.is_none());
    }

    #[test]
    fn unknown_method_is_rejected() {
        let err = parse_method("TRACE").unwrap_err();
        assert!(matches!(err, TransformError::UnsupportedMethod(m) if m == "TRACE"));
        assert_eq!(parse_method("delete").unwrap(), HttpMethod::Delete);
    }
}
