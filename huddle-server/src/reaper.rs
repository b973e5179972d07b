use crate::api::AppState;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Periodically drops members whose client stopped polling.
pub fn spawn_reaper(state: AppState, ttl: Duration, period: Duration) -> JoinHandle<()> {
    info!(?ttl, ?period, "Starting roster liveness reaper");

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;

            for (room, participant) in state.rosters.reap_stale(ttl) {
                info!(room = %room, participant = %participant, "Removed silent participant");
                state.mailbox.purge(&room, &participant);
            }
            debug!(rooms = state.rosters.room_count(), "Reaper tick");
        }
    })
}
