use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use keyrelay_common::{GlobalConfig, GlobalConfigPatch};
use keyrelay_provider_core::KeyPool;

use crate::state::AppState;
use crate::upstream_client::{UpstreamClientConfig, WreqUpstreamClient};

#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "keyrelay",
    version,
    about = "Key-rotating reverse proxy for the Gemini API"
)]
pub struct CliArgs {
    /// Bind host.
    #[arg(long, env = "KEYRELAY_HOST")]
    pub host: Option<String>,

    /// Bind port.
    #[arg(long, env = "PORT")]
    pub port: Option<String>,

    /// Upstream origin, e.g. https://generativelanguage.googleapis.com.
    #[arg(long, env = "KEYRELAY_UPSTREAM_BASE_URL")]
    pub upstream_base_url: Option<String>,

    /// API version segment used by /identify.
    #[arg(long, env = "KEYRELAY_API_VERSION")]
    pub api_version: Option<String>,

    /// Model used by /identify.
    #[arg(long, env = "KEYRELAY_MODEL")]
    pub model: Option<String>,

    /// Environment variable prefix holding API keys (GEMINI_API_KEY, GEMINI_API_KEY_1, ..).
    #[arg(long, env = "KEYRELAY_KEY_PREFIX")]
    pub key_prefix: Option<String>,

    /// Inbound body limit in MiB.
    #[arg(long, env = "KEYRELAY_MAX_BODY_MB")]
    pub max_body_mb: Option<String>,

    /// Total upstream request timeout in seconds; 0 disables it.
    #[arg(long, env = "KEYRELAY_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<String>,

    /// Optional outbound proxy for upstream requests.
    #[arg(long, env = "KEYRELAY_PROXY")]
    pub proxy: Option<String>,

    /// Reject /identify requests without a prompt instead of using the default one.
    #[arg(long, env = "KEYRELAY_REQUIRE_PROMPT")]
    pub require_prompt: Option<String>,

    /// Prompt used when /identify omits one.
    #[arg(long, env = "KEYRELAY_DEFAULT_PROMPT")]
    pub default_prompt: Option<String>,

    /// Attach the identification response schema to /identify requests.
    #[arg(long, env = "KEYRELAY_RESPONSE_SCHEMA")]
    pub response_schema: Option<String>,
}

pub struct Bootstrap {
    pub config: Arc<GlobalConfig>,
    pub state: Arc<AppState>,
}

pub fn bootstrap_from_env() -> anyhow::Result<Bootstrap> {
    let args = CliArgs::parse();
    bootstrap(args, std::env::vars())
}

/// Resolves config (CLI > ENV > defaults), loads the key pool from `vars` and builds the
/// shared state. An empty pool is a startup error.
pub fn bootstrap<I>(args: CliArgs, vars: I) -> anyhow::Result<Bootstrap>
where
    I: IntoIterator<Item = (String, String)>,
{
    let config = Arc::new(resolve_config(args)?);

    let pool = KeyPool::from_vars(vars, &config.key_prefix).context("load api keys")?;
    tracing::info!(
        event = "keys_loaded",
        count = pool.len(),
        keys = ?pool.masked(),
        prefix = %config.key_prefix,
    );

    let upstream = WreqUpstreamClient::new(UpstreamClientConfig::from_global(&config))
        .context("build upstream http client")?;

    let state = AppState::new(config.clone(), Arc::new(pool), Arc::new(upstream));
    Ok(Bootstrap {
        config,
        state: Arc::new(state),
    })
}

fn resolve_config(args: CliArgs) -> anyhow::Result<GlobalConfig> {
    // clap already applies CLI > ENV per field; this layer goes over the defaults.
    let mut merged = GlobalConfigPatch::default();
    merged.overlay(GlobalConfigPatch {
        host: sanitize_optional_env_value(args.host),
        port: parse_u16_env_value(args.port, "PORT")?,
        upstream_base_url: sanitize_optional_env_value(args.upstream_base_url),
        api_version: sanitize_optional_env_value(args.api_version),
        model: sanitize_optional_env_value(args.model),
        key_prefix: sanitize_optional_env_value(args.key_prefix),
        max_body_mb: parse_number_env_value(args.max_body_mb, "KEYRELAY_MAX_BODY_MB")?,
        request_timeout_secs: parse_number_env_value(
            args.request_timeout_secs,
            "KEYRELAY_REQUEST_TIMEOUT_SECS",
        )?,
        proxy: sanitize_optional_env_value(args.proxy),
        require_prompt: parse_bool_env_value(args.require_prompt, "KEYRELAY_REQUIRE_PROMPT")?,
        default_prompt: sanitize_optional_env_value(args.default_prompt),
        response_schema: parse_bool_env_value(args.response_schema, "KEYRELAY_RESPONSE_SCHEMA")?,
    });

    merged
        .into_config()
        .context("finalize merged global config")
}

fn sanitize_optional_env_value(value: Option<String>) -> Option<String> {
    let trimmed = value?.trim().to_string();
    if trimmed.is_empty() {
        return None;
    }
    // Some PaaS systems may inject unresolved placeholders like `${VAR}`.
    if trimmed.starts_with("${") && trimmed.ends_with('}') {
        return None;
    }
    Some(trimmed)
}

fn parse_u16_env_value(value: Option<String>, env_name: &str) -> anyhow::Result<Option<u16>> {
    parse_number_env_value(value, env_name)
}

fn parse_number_env_value<T>(value: Option<String>, env_name: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let Some(raw) = sanitize_optional_env_value(value) else {
        return Ok(None);
    };
    let parsed = raw
        .parse::<T>()
        .with_context(|| format!("invalid {env_name} value: {raw}"))?;
    Ok(Some(parsed))
}

fn parse_bool_env_value(value: Option<String>, env_name: &str) -> anyhow::Result<Option<bool>> {
    let Some(raw) = sanitize_optional_env_value(value) else {
        return Ok(None);
    };
    let parsed = match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => return Err(anyhow::anyhow!("invalid {env_name} value: {raw}")),
    };
    Ok(Some(parsed))
}
