use std::sync::Arc;

use anyhow::Context;
use tokio::signal;

use devcamper_api::app::{build_app, services::AppServices};
use devcamper_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing `.env` is fine; real deployments set the environment directly.
    let _ = dotenvy::dotenv();
    devcamper_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let port = config.server.port;
    let environment = config.server.environment;
    let services = AppServices::from_config(config)
        .await
        .context("failed to wire services")?;

    let app = build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind 0.0.0.0:{port}"))?;
    tracing::info!(addr = %listener.local_addr()?, ?environment, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
