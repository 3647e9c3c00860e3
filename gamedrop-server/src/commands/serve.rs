//! Serve command - run the HTTP API

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gamedrop_server::AppState;

use super::get_context;

const DEFAULT_LOG_FILTER: &str = "gamedrop=info";

pub fn run(data_dir: &Path, bind: Option<String>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // The context owns blocking HTTP clients, which must be created and
    // dropped outside the async runtime.
    let context = Arc::new(get_context(data_dir)?);
    let bind = bind.unwrap_or_else(|| context.config.bind.clone());
    let state = AppState::new(Arc::clone(&context));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async move {
        let listener = TcpListener::bind(&bind)
            .await
            .with_context(|| format!("Failed to bind {}", bind))?;
        gamedrop_server::serve(listener, state, shutdown_signal())
            .await
            .context("Server error")
    })?;

    drop(runtime);
    info!(data_dir = %context.data_dir.display(), "gamedrop stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => {
            warn!(error = %e, "cannot listen for ctrl-c; running until killed");
            std::future::pending::<()>().await;
        }
    }
}
