use serde::{Deserialize, Serialize};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_API_VERSION: &str = "v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_KEY_PREFIX: &str = "GEMINI_API_KEY";
pub const DEFAULT_MAX_BODY_MB: usize = 20;
pub const MIN_MAX_BODY_MB: usize = 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_PROMPT: &str = "Identify every electronic component visible in this image. \
For each one report its type, a confidence between 0 and 1, its name, part code if legible, \
a short description, typical applications, available packages and a bounding box. \
Also report whether the image quality is good enough for identification.";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required config field: {0}")]
    MissingField(&'static str),
    #[error("invalid config field {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Final, merged configuration used by the running process.
///
/// Built once at startup (CLI > ENV > defaults) and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    pub host: String,
    pub port: u16,
    /// Upstream origin without a trailing slash.
    pub upstream_base_url: String,
    pub api_version: String,
    pub model: String,
    /// Environment variable prefix scanned for credentials.
    pub key_prefix: String,
    pub max_body_bytes: usize,
    /// `None` disables the total upstream timeout.
    pub request_timeout_secs: Option<u64>,
    /// Optional outbound proxy (for upstream egress).
    pub proxy: Option<String>,
    pub require_prompt: bool,
    pub default_prompt: String,
    pub response_schema: bool,
}

impl GlobalConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn generate_content_url(&self) -> String {
        format!(
            "{}/{}/models/{}:generateContent",
            self.upstream_base_url, self.api_version, self.model
        )
    }
}

/// Optional layer used for merging config sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalConfigPatch {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub upstream_base_url: Option<String>,
    pub api_version: Option<String>,
    pub model: Option<String>,
    pub key_prefix: Option<String>,
    pub max_body_mb: Option<usize>,
    pub request_timeout_secs: Option<u64>,
    pub proxy: Option<String>,
    pub require_prompt: Option<bool>,
    pub default_prompt: Option<String>,
    pub response_schema: Option<bool>,
}

impl GlobalConfigPatch {
    pub fn overlay(&mut self, other: GlobalConfigPatch) {
        if other.host.is_some() {
            self.host = other.host;
        }
        if other.port.is_some() {
            self.port = other.port;
        }
        if other.upstream_base_url.is_some() {
            self.upstream_base_url = other.upstream_base_url;
        }
        if other.api_version.is_some() {
            self.api_version = other.api_version;
        }
        if other.model.is_some() {
            self.model = other.model;
        }
        if other.key_prefix.is_some() {
            self.key_prefix = other.key_prefix;
        }
        if other.max_body_mb.is_some() {
            self.max_body_mb = other.max_body_mb;
        }
        if other.request_timeout_secs.is_some() {
            self.request_timeout_secs = other.request_timeout_secs;
        }
        if other.proxy.is_some() {
            self.proxy = other.proxy;
        }
        if other.require_prompt.is_some() {
            self.require_prompt = other.require_prompt;
        }
        if other.default_prompt.is_some() {
            self.default_prompt = other.default_prompt;
        }
        if other.response_schema.is_some() {
            self.response_schema = other.response_schema;
        }
    }

    pub fn into_config(self) -> Result<GlobalConfig, ConfigError> {
        let upstream_base_url = self
            .upstream_base_url
            .unwrap_or_else(|| DEFAULT_UPSTREAM_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if !upstream_base_url.starts_with("http://") && !upstream_base_url.starts_with("https://")
        {
            return Err(ConfigError::Invalid {
                field: "upstream_base_url",
                reason: format!("expected an http(s) url, got {upstream_base_url:?}"),
            });
        }

        let key_prefix = self
            .key_prefix
            .unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string());
        if key_prefix.is_empty() {
            return Err(ConfigError::MissingField("key_prefix"));
        }

        let max_body_mb = self
            .max_body_mb
            .unwrap_or(DEFAULT_MAX_BODY_MB)
            .max(MIN_MAX_BODY_MB);
        let max_body_bytes =
            max_body_mb
                .checked_mul(1024 * 1024)
                .ok_or_else(|| ConfigError::Invalid {
                    field: "max_body_mb",
                    reason: format!("{max_body_mb} MiB does not fit in usize bytes"),
                })?;

        let request_timeout_secs = match self.request_timeout_secs {
            Some(0) => None,
            Some(secs) => Some(secs),
            None => Some(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        Ok(GlobalConfig {
            host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.port.unwrap_or(DEFAULT_PORT),
            upstream_base_url,
            api_version: self
                .api_version
                .map(|v| v.trim_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            model: self
                .model
                .map(|m| m.trim_start_matches("models/").to_string())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            key_prefix,
            max_body_bytes,
            request_timeout_secs,
            proxy: self.proxy,
            require_prompt: self.require_prompt.unwrap_or(false),
            default_prompt: self
                .default_prompt
                .unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
            response_schema: self.response_schema.unwrap_or(true),
        })
    }
}
