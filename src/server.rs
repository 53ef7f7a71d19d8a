use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use zipbox::api::{self, state::AppState};
use zipbox::config::Config;
use zipbox::observability::Metrics;
use zipbox::orchestrator::Orchestrator;
use zipbox::registry::TaskRegistry;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub async fn run(config_path: Option<PathBuf>) -> Result<(), AnyError> {
    info!("Loading configuration");
    let config = match config_path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }?;

    let registry = Arc::new(TaskRegistry::new());
    let metrics = Arc::new(Metrics::new());
    let orchestrator = Orchestrator::new(&config, registry, metrics)?;

    let address = config.server.bind_addr();
    let state = AppState::new(config, orchestrator);
    let app = api::app(state);

    let listener = TcpListener::bind(&address).await?;
    info!(%address, "ZipBox API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
