mod http_relay;

pub use http_relay::HttpRelay;

use crate::error::RelayError;
use async_trait::async_trait;
use huddle_core::{Participant, ParticipantId, RoomCode, Roster, Signal};

/// Client side of the signaling relay: roster registration plus the
/// per-recipient handshake mailbox.
#[async_trait]
pub trait SignalRelay: Send + Sync {
    async fn join(&self, room: &RoomCode, participant: &Participant) -> Result<Roster, RelayError>;

    async fn leave(&self, room: &RoomCode, participant: &ParticipantId) -> Result<(), RelayError>;

    /// Marks `participant` as in or out of the room's call.
    async fn set_call_status(
        &self,
        room: &RoomCode,
        participant: &ParticipantId,
        active: bool,
    ) -> Result<Roster, RelayError>;

    /// Current roster of `room`, polled on behalf of `participant`.
    async fn roster(&self, room: &RoomCode, participant: &ParticipantId)
    -> Result<Roster, RelayError>;

    /// Appends `signal` to the mailbox of `to`.
    async fn send(&self, room: &RoomCode, to: &ParticipantId, signal: &Signal)
    -> Result<(), RelayError>;

    /// Takes every pending signal addressed to `participant`, oldest first.
    async fn drain(
        &self,
        room: &RoomCode,
        participant: &ParticipantId,
    ) -> Result<Vec<Signal>, RelayError>;
}
