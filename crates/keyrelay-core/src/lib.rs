pub mod bootstrap;
pub mod error;
pub mod relay;
pub mod state;
pub mod transform;
pub mod upstream_client;

pub use bootstrap::{Bootstrap, CliArgs, bootstrap, bootstrap_from_env};
pub use error::ProxyError;
pub use state::AppState;
pub use upstream_client::{UpstreamClient, UpstreamClientConfig, WreqUpstreamClient};
