mod api;
mod config;
mod reaper;
mod store;

pub use api::*;
pub use config::*;
pub use reaper::*;
pub use store::*;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

/// Binds the configured address and serves the relay until the process exits.
pub async fn serve(config: RelayConfig) -> Result<()> {
    let addr = config.addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind relay on {addr}"))?;

    let state = AppState::new();
    if let Some(ttl) = config.member_ttl {
        spawn_reaper(state.clone(), ttl, config.reap_interval);
    }

    serve_on(listener, state).await
}

/// Serves the relay on an already bound listener.
pub async fn serve_on(listener: TcpListener, state: AppState) -> Result<()> {
    let addr = listener.local_addr().context("Listener has no local address")?;
    info!("Relay listening on http://{}", addr);

    axum::serve(listener, router(state))
        .await
        .context("Relay server stopped")
}
