use anyhow::Context;
use tracing::info;

use keyrelay_core::bootstrap_from_env;
use keyrelay_router::router;

#[tokio::main]
async fn main() {
    // A missing .env file is the normal case.
    let _ = dotenvy::dotenv();
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("keyrelay failed: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let boot = bootstrap_from_env()?;
    let config = boot.config.clone();
    info!(
        host = %config.host,
        port = config.port,
        upstream = %config.upstream_base_url,
        model = %config.model,
        keys = boot.state.pool.len(),
        max_body_bytes = config.max_body_bytes,
        request_timeout_secs = ?config.request_timeout_secs,
        proxy = %config.proxy.as_deref().unwrap_or(""),
        "config loaded"
    );

    let app = router(boot.state);
    let bind = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("bind {bind}"))?;
    info!(addr = %bind, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve")?;
    info!("shut down");
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("keyrelay=info,tower_http=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
