//! Audio capture and playback seam.
//!
//! The session never touches a microphone or speaker directly. It asks an
//! [`AudioDevice`] for one local track per call and hands every remote
//! track back to it, keyed by participant.

use crate::error::PermissionError;
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use huddle_core::ParticipantId;
use std::sync::Arc;
use std::time::Duration;
use webrtc::api::media_engine::MIME_TYPE_OPUS;
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_remote::TrackRemote;

/// Capture constraints requested when a call starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for AudioConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            sample_rate: 48_000,
            channels: 1,
        }
    }
}

/// The outgoing Opus track of an active call. Every peer link of the call
/// sends this same track.
#[derive(Clone)]
pub struct LocalAudio {
    track: Arc<TrackLocalStaticSample>,
}

impl LocalAudio {
    pub fn new(participant: &ParticipantId, constraints: &AudioConstraints) -> Self {
        let codec = RTCRtpCodecCapability {
            mime_type: MIME_TYPE_OPUS.to_owned(),
            clock_rate: constraints.sample_rate,
            channels: constraints.channels,
            ..Default::default()
        };
        let track = TrackLocalStaticSample::new(
            codec,
            format!("audio-{participant}"),
            format!("huddle-{participant}"),
        );
        Self {
            track: Arc::new(track),
        }
    }

    pub fn track(&self) -> Arc<TrackLocalStaticSample> {
        self.track.clone()
    }

    pub fn track_id(&self) -> String {
        self.track.id().to_owned()
    }

    /// Writes one encoded Opus frame to every bound peer connection.
    pub async fn write_frame(&self, data: Bytes, duration: Duration) -> Result<()> {
        self.track
            .write_sample(&Sample {
                data,
                duration,
                ..Default::default()
            })
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for LocalAudio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalAudio").finish_non_exhaustive()
    }
}

/// Incoming audio from one remote participant.
#[async_trait]
pub trait RemoteAudioTrack: Send + Sync {
    fn track_id(&self) -> String;

    /// Reads the payload of the next RTP packet.
    async fn read_payload(&self) -> Result<Bytes>;
}

pub type RemoteAudio = Arc<dyn RemoteAudioTrack>;

#[async_trait]
impl RemoteAudioTrack for TrackRemote {
    fn track_id(&self) -> String {
        self.id()
    }

    async fn read_payload(&self) -> Result<Bytes> {
        let (packet, _) = self.read_rtp().await?;
        Ok(packet.payload)
    }
}

/// Platform audio: microphone capture and per-participant playback.
#[async_trait]
pub trait AudioDevice: Send + Sync {
    /// Opens the microphone for `participant`.
    async fn acquire_local_audio(
        &self,
        participant: &ParticipantId,
        constraints: &AudioConstraints,
    ) -> Result<LocalAudio, PermissionError>;

    async fn release_local_audio(&self, audio: LocalAudio);

    /// Starts playback of `audio`. Replaces any earlier track for the same participant.
    fn attach_remote_audio(&self, participant: &ParticipantId, audio: RemoteAudio);

    fn detach_remote_audio(&self, participant: &ParticipantId);
}
