use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use huddle::ParticipantId;
use huddle::client::{AudioConstraints, AudioDevice, LocalAudio, PermissionError, RemoteAudio};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

const FRAME: Duration = Duration::from_millis(20);

/// One Opus frame of silence.
const OPUS_SILENCE: [u8; 3] = [0xf8, 0xff, 0xfe];

/// Audio device for terminals: sends silence and counts what arrives.
#[derive(Default)]
pub struct HeadlessAudio {
    senders: DashMap<String, JoinHandle<()>>,
    receivers: DashMap<ParticipantId, JoinHandle<()>>,
}

impl HeadlessAudio {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AudioDevice for HeadlessAudio {
    async fn acquire_local_audio(
        &self,
        participant: &ParticipantId,
        constraints: &AudioConstraints,
    ) -> Result<LocalAudio, PermissionError> {
        let audio = LocalAudio::new(participant, constraints);
        let writer = audio.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(FRAME);
            loop {
                ticker.tick().await;
                if let Err(e) = writer
                    .write_frame(Bytes::from_static(&OPUS_SILENCE), FRAME)
                    .await
                {
                    trace!("Silence frame not written: {}", e);
                }
            }
        });

        if let Some(previous) = self.senders.insert(audio.track_id(), handle) {
            previous.abort();
        }
        Ok(audio)
    }

    async fn release_local_audio(&self, audio: LocalAudio) {
        if let Some((_, handle)) = self.senders.remove(&audio.track_id()) {
            handle.abort();
        }
    }

    fn attach_remote_audio(&self, participant: &ParticipantId, audio: RemoteAudio) {
        let peer = participant.clone();
        let handle = tokio::spawn(async move {
            info!(peer = %peer, track = %audio.track_id(), "Receiving audio");
            let mut packets: u64 = 0;
            while audio.read_payload().await.is_ok() {
                packets += 1;
                if packets % 500 == 0 {
                    debug!(peer = %peer, packets, "Audio still flowing");
                }
            }
            debug!(peer = %peer, packets, "Remote audio ended");
        });

        if let Some(previous) = self.receivers.insert(participant.clone(), handle) {
            previous.abort();
        }
    }

    fn detach_remote_audio(&self, participant: &ParticipantId) {
        if let Some((_, handle)) = self.receivers.remove(participant) {
            handle.abort();
        }
    }
}
