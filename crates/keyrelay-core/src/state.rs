use std::sync::Arc;

use keyrelay_common::GlobalConfig;
use keyrelay_provider_core::KeyPool;

use crate::upstream_client::UpstreamClient;

/// Everything a request handler needs; built once at startup and shared read-only.
pub struct AppState {
    pub config: Arc<GlobalConfig>,
    pub pool: Arc<KeyPool>,
    pub upstream: Arc<dyn UpstreamClient>,
}

impl AppState {
    pub fn new(
        config: Arc<GlobalConfig>,
        pool: Arc<KeyPool>,
        upstream: Arc<dyn UpstreamClient>,
    ) -> Self {
        Self {
            config,
            pool,
            upstream,
        }
    }
}
