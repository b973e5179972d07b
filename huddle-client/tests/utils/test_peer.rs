use crate::utils::{LocalRelay, MockTransportFactory, RecordingAudioDevice};
use huddle_client::{
    CallEvent, CallSnapshot, ClientConfig, HuddleClient, LinkContext, LinkState, SignalClock,
    TransportEvent,
};
use huddle_core::{Participant, ParticipantId, RoomCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};

pub const WAIT_LIMIT: Duration = Duration::from_secs(5);

pub fn fast_config() -> ClientConfig {
    ClientConfig {
        tick_interval: Duration::from_millis(20),
        negotiation_timeout: Duration::from_secs(3),
        ..ClientConfig::default()
    }
}

/// A client wired to mocks, plus handles to inspect them.
pub struct TestPeer {
    pub id: ParticipantId,
    pub client: HuddleClient,
    pub events: mpsc::UnboundedReceiver<CallEvent>,
    pub transports: Arc<MockTransportFactory>,
    pub audio: Arc<RecordingAudioDevice>,
}

impl TestPeer {
    pub fn new(relay: &LocalRelay, id: &str) -> Self {
        Self::with_config(relay, id, fast_config())
    }

    pub fn with_config(relay: &LocalRelay, id: &str, config: ClientConfig) -> Self {
        let participant = Participant::new(id, id.to_uppercase());
        let transports = Arc::new(MockTransportFactory::new(&participant.id));
        let audio = Arc::new(RecordingAudioDevice::new());
        let (client, events) = HuddleClient::new(
            participant.clone(),
            config,
            Arc::new(relay.clone()),
            transports.clone(),
            audio.clone(),
        );

        Self {
            id: participant.id,
            client,
            events,
            transports,
            audio,
        }
    }

    pub async fn join_and_call(&self, room: &RoomCode) {
        self.client.join_room(room.clone()).await.unwrap();
        self.client.start_call(room).await.unwrap();
    }

    pub async fn snapshot(&self, room: &RoomCode) -> CallSnapshot {
        self.client.snapshot(room).await.unwrap()
    }

    /// Polls until the link to `remote` reaches `state`.
    pub async fn wait_for_link(
        &self,
        room: &RoomCode,
        remote: &ParticipantId,
        state: LinkState,
    ) -> bool {
        let deadline = Instant::now() + WAIT_LIMIT;
        while Instant::now() < deadline {
            let snapshot = self.snapshot(room).await;
            if snapshot.link(remote).is_some_and(|l| l.state == state) {
                return true;
            }
            sleep(Duration::from_millis(10)).await;
        }
        false
    }

    /// Polls until no link to `remote` exists.
    pub async fn wait_for_no_link(&self, room: &RoomCode, remote: &ParticipantId) -> bool {
        let deadline = Instant::now() + WAIT_LIMIT;
        while Instant::now() < deadline {
            if self.snapshot(room).await.link(remote).is_none() {
                return true;
            }
            sleep(Duration::from_millis(10)).await;
        }
        false
    }

    pub async fn wait_for_connected_peers(&self, room: &RoomCode, count: usize) -> bool {
        let deadline = Instant::now() + WAIT_LIMIT;
        while Instant::now() < deadline {
            if self.snapshot(room).await.connected_peers() == count {
                return true;
            }
            sleep(Duration::from_millis(10)).await;
        }
        false
    }

    /// Reads events until one matches `pred`.
    pub async fn wait_for_event(&mut self, pred: impl Fn(&CallEvent) -> bool) -> bool {
        let deadline = Instant::now() + WAIT_LIMIT;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, self.events.recv()).await {
                Ok(Some(event)) if pred(&event) => return true,
                Ok(Some(_)) => continue,
                _ => return false,
            }
        }
    }
}

/// A link context for driving a `PeerLink` by hand.
pub fn link_context(
    relay: &LocalRelay,
    local: &str,
    transports: Arc<MockTransportFactory>,
    audio: Arc<RecordingAudioDevice>,
) -> (LinkContext, mpsc::Receiver<TransportEvent>) {
    let (events, events_rx) = mpsc::channel(64);
    let local = ParticipantId::from(local);
    let ctx = LinkContext {
        room: RoomCode::from("ABC123"),
        local_audio: huddle_client::LocalAudio::new(&local, &Default::default()),
        local,
        relay: Arc::new(relay.clone()),
        transports,
        audio,
        events,
        clock: Arc::new(SignalClock::default()),
    };
    (ctx, events_rx)
}
