mod error;
mod rooms;
mod signal;

pub use error::ApiError;

use crate::store::{RosterStore, SignalMailbox};
use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared handler state. Cloning is cheap: both stores are `Arc`-backed.
#[derive(Clone, Default)]
pub struct AppState {
    pub rosters: RosterStore,
    pub mailbox: SignalMailbox,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/rooms/{room}/join", post(rooms::join_room))
        .route("/rooms/{room}/leave", post(rooms::leave_room))
        .route("/rooms/{room}/call", post(rooms::set_call_status))
        .route("/rooms/{room}/roster", get(rooms::get_roster))
        .route("/signal/send", post(signal::send_signal))
        .route("/signal/{room}/{participant}", get(signal::drain_signals))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
