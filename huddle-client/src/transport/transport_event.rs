use crate::media::RemoteAudio;
use crate::transport::LinkId;
use huddle_core::IceCandidate;

/// Asynchronous progress reported by a transport to its room session.
pub enum TransportEvent {
    /// A local ICE candidate to trickle to the remote side.
    CandidateGenerated(LinkId, IceCandidate),
    Connected(LinkId),
    /// The remote side's audio track arrived.
    RemoteTrack(LinkId, RemoteAudio),
    /// The connection failed or was closed underneath us.
    Failed(LinkId),
}

impl TransportEvent {
    pub fn link(&self) -> LinkId {
        match self {
            TransportEvent::CandidateGenerated(link, _)
            | TransportEvent::Connected(link)
            | TransportEvent::RemoteTrack(link, _)
            | TransportEvent::Failed(link) => *link,
        }
    }
}

impl std::fmt::Debug for TransportEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportEvent::CandidateGenerated(link, c) => f
                .debug_tuple("CandidateGenerated")
                .field(link)
                .field(&c.candidate)
                .finish(),
            TransportEvent::Connected(link) => f.debug_tuple("Connected").field(link).finish(),
            TransportEvent::RemoteTrack(link, track) => f
                .debug_tuple("RemoteTrack")
                .field(link)
                .field(&track.track_id())
                .finish(),
            TransportEvent::Failed(link) => f.debug_tuple("Failed").field(link).finish(),
        }
    }
}
