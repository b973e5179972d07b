mod transport_config;
mod transport_event;
mod webrtc_transport;

pub use transport_config::{IceServerConfig, TransportConfig};
pub use transport_event::TransportEvent;
pub use webrtc_transport::{WebRtcTransport, WebRtcTransportFactory};

use crate::media::LocalAudio;
use anyhow::Result;
use async_trait::async_trait;
use huddle_core::{IceCandidate, ParticipantId};
use tokio::sync::mpsc;

/// Identifies one peer-link instance. A recreated link gets a fresh id, so
/// late events from a torn-down transport can be told apart.
pub type LinkId = u64;

/// One real-time media connection to a single remote participant.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Creates an offer and installs it as the local description.
    async fn create_offer(&self) -> Result<String>;

    async fn set_remote_offer(&self, sdp: String) -> Result<()>;

    /// Creates an answer to the applied offer and installs it locally.
    async fn create_answer(&self) -> Result<String>;

    async fn set_remote_answer(&self, sdp: String) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Opens transports. Each transport sends the local track and reports its
/// progress as [`TransportEvent`]s tagged with `link`.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn open(
        &self,
        link: LinkId,
        remote: &ParticipantId,
        audio: &LocalAudio,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn PeerTransport>>;
}
