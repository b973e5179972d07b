use dashmap::DashMap;
use huddle_core::{ParticipantId, RoomCode, Signal};
use std::sync::Arc;
use tracing::debug;

type MailboxKey = (RoomCode, ParticipantId);

/// Per-recipient handshake queues.
///
/// `enqueue` appends under the entry lock and `drain` removes the whole entry
/// under the same lock, so every enqueued signal lands in exactly one drain.
#[derive(Clone, Default)]
pub struct SignalMailbox {
    queues: Arc<DashMap<MailboxKey, Vec<Signal>>>,
}

impl SignalMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, room: &RoomCode, to: &ParticipantId, signal: Signal) {
        debug!(
            room = %room,
            from = %signal.from,
            to = %to,
            kind = %signal.kind(),
            "Signal enqueued"
        );
        self.queues
            .entry((room.clone(), to.clone()))
            .or_default()
            .push(signal);
    }

    /// Returns and deletes everything queued for `participant`, oldest first.
    pub fn drain(&self, room: &RoomCode, participant: &ParticipantId) -> Vec<Signal> {
        self.queues
            .remove(&(room.clone(), participant.clone()))
            .map(|(_, signals)| signals)
            .unwrap_or_default()
    }

    pub fn pending(&self, room: &RoomCode, participant: &ParticipantId) -> usize {
        self.queues
            .get(&(room.clone(), participant.clone()))
            .map(|queue| queue.len())
            .unwrap_or(0)
    }

    /// Drops whatever is queued for a participant that left.
    pub fn purge(&self, room: &RoomCode, participant: &ParticipantId) -> usize {
        let dropped = self.drain(room, participant).len();
        if dropped > 0 {
            debug!(room = %room, participant = %participant, dropped, "Mailbox purged");
        }
        dropped
    }
}
