use async_trait::async_trait;
use huddle_client::{RelayError, SignalRelay};
use huddle_core::{HandshakeKind, Participant, ParticipantId, RoomCode, Roster, Signal};
use huddle_server::AppState;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// In-process relay backed by the server's own stores.
#[derive(Clone, Default)]
pub struct LocalRelay {
    pub state: AppState,
    fail_sends: Arc<AtomicUsize>,
    failed_sends: Arc<AtomicUsize>,
    offline: Arc<AtomicBool>,
}

impl LocalRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// A view of the same relay that can be cut off on its own.
    pub fn connection(&self) -> Self {
        Self {
            offline: Arc::new(AtomicBool::new(false)),
            ..self.clone()
        }
    }

    /// Every later request through this view fails as unreachable.
    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    fn reachable(&self) -> Result<(), RelayError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RelayError::Unavailable("connection lost".to_string()));
        }
        Ok(())
    }

    /// Makes the next `count` sends fail as if the relay were unreachable.
    pub fn fail_next_sends(&self, count: usize) {
        self.fail_sends.store(count, Ordering::SeqCst);
    }

    pub fn failed_sends(&self) -> usize {
        self.failed_sends.load(Ordering::SeqCst)
    }

    /// Puts `participant` in the room's call without a client behind it.
    pub fn add_call_member(&self, room: &RoomCode, participant: &str) {
        self.state
            .rosters
            .join(room, Participant::new(participant, participant));
        self.state
            .rosters
            .set_call_status(room, &ParticipantId::from(participant), true);
    }

    pub fn pending(&self, room: &RoomCode, participant: &str) -> usize {
        self.state
            .mailbox
            .pending(room, &ParticipantId::from(participant))
    }

    pub fn inject(&self, room: &RoomCode, to: &ParticipantId, signal: Signal) {
        self.state.mailbox.enqueue(room, to, signal);
    }

    /// Drains `participant`'s mailbox and counts messages of `kind`.
    pub fn take_kind(&self, room: &RoomCode, participant: &str, kind: HandshakeKind) -> usize {
        self.state
            .mailbox
            .drain(room, &ParticipantId::from(participant))
            .iter()
            .filter(|s| s.kind() == kind)
            .count()
    }
}

#[async_trait]
impl SignalRelay for LocalRelay {
    async fn join(&self, room: &RoomCode, participant: &Participant) -> Result<Roster, RelayError> {
        self.reachable()?;
        Ok(self.state.rosters.join(room, participant.clone()))
    }

    async fn leave(&self, room: &RoomCode, participant: &ParticipantId) -> Result<(), RelayError> {
        self.reachable()?;
        self.state.rosters.leave(room, participant);
        self.state.mailbox.purge(room, participant);
        Ok(())
    }

    async fn set_call_status(
        &self,
        room: &RoomCode,
        participant: &ParticipantId,
        active: bool,
    ) -> Result<Roster, RelayError> {
        self.reachable()?;
        let roster = self.state.rosters.set_call_status(room, participant, active);
        self.state.mailbox.purge(room, participant);
        Ok(roster)
    }

    async fn roster(
        &self,
        room: &RoomCode,
        participant: &ParticipantId,
    ) -> Result<Roster, RelayError> {
        self.reachable()?;
        self.state.rosters.touch(room, participant);
        Ok(self.state.rosters.snapshot(room))
    }

    async fn send(
        &self,
        room: &RoomCode,
        to: &ParticipantId,
        signal: &Signal,
    ) -> Result<(), RelayError> {
        self.reachable()?;
        let pending_failures = self.fail_sends.load(Ordering::SeqCst);
        if pending_failures > 0 {
            self.fail_sends.store(pending_failures - 1, Ordering::SeqCst);
            self.failed_sends.fetch_add(1, Ordering::SeqCst);
            return Err(RelayError::Unavailable("simulated outage".to_string()));
        }
        if self.state.rosters.is_member(room, to) {
            self.state.mailbox.enqueue(room, to, signal.clone());
        }
        Ok(())
    }

    async fn drain(
        &self,
        room: &RoomCode,
        participant: &ParticipantId,
    ) -> Result<Vec<Signal>, RelayError> {
        self.reachable()?;
        self.state.rosters.touch(room, participant);
        Ok(self.state.mailbox.drain(room, participant))
    }
}
