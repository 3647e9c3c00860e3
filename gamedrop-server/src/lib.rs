//! Gamedrop Server - HTTP surface over `gamedrop-core`
//!
//! The router is exposed as a library so integration tests can serve it on an
//! ephemeral port; the `gamedrop` binary adds the command line around it.

pub mod api;
pub mod session;

use std::future::Future;

use tokio::net::TcpListener;
use tracing::info;

pub use api::{router, AppState};

/// Serve the API on an already bound listener until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "gamedrop listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
