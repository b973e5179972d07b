use anyhow::{Result, bail};
use async_trait::async_trait;
use bytes::Bytes;
use huddle_client::{
    LinkId, LocalAudio, PeerTransport, RemoteAudio, RemoteAudioTrack, TransportEvent,
    TransportFactory,
};
use huddle_core::{IceCandidate, ParticipantId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// What happened on one mock transport.
#[derive(Debug, Default, Clone)]
pub struct TransportLog {
    pub offers_created: usize,
    pub offers_applied: usize,
    pub answers_created: usize,
    pub answers_applied: usize,
    pub candidates: Vec<IceCandidate>,
    pub closed: bool,
}

pub struct MockRemoteTrack {
    id: String,
}

#[async_trait]
impl RemoteAudioTrack for MockRemoteTrack {
    fn track_id(&self) -> String {
        self.id.clone()
    }

    async fn read_payload(&self) -> Result<Bytes> {
        bail!("mock track carries no media")
    }
}

struct Opened {
    link: LinkId,
    remote: ParticipantId,
    events: mpsc::Sender<TransportEvent>,
    log: Arc<Mutex<TransportLog>>,
}

/// Transport factory whose connections "connect" as soon as both
/// descriptions are in place.
pub struct MockTransportFactory {
    owner: ParticipantId,
    connect: AtomicBool,
    fail_open: AtomicBool,
    opened: Mutex<Vec<Opened>>,
}

impl MockTransportFactory {
    pub fn new(owner: &ParticipantId) -> Self {
        Self {
            owner: owner.clone(),
            connect: AtomicBool::new(true),
            fail_open: AtomicBool::new(false),
            opened: Mutex::new(Vec::new()),
        }
    }

    /// Stop reporting `Connected`, so negotiations hang.
    pub fn set_connect(&self, connect: bool) {
        self.connect.store(connect, Ordering::SeqCst);
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    pub fn opened_to(&self, remote: &ParticipantId) -> usize {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .filter(|o| &o.remote == remote)
            .count()
    }

    pub fn logs_to(&self, remote: &ParticipantId) -> Vec<TransportLog> {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .filter(|o| &o.remote == remote)
            .map(|o| o.log.lock().unwrap().clone())
            .collect()
    }

    pub fn offers_created_to(&self, remote: &ParticipantId) -> usize {
        self.logs_to(remote).iter().map(|l| l.offers_created).sum()
    }

    pub fn answers_created_to(&self, remote: &ParticipantId) -> usize {
        self.logs_to(remote).iter().map(|l| l.answers_created).sum()
    }

    pub fn offers_created(&self) -> usize {
        self.all_logs().iter().map(|l| l.offers_created).sum()
    }

    pub fn all_logs(&self) -> Vec<TransportLog> {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .map(|o| o.log.lock().unwrap().clone())
            .collect()
    }

    /// Reports a transport failure on the newest link to `remote`.
    pub fn fail_latest(&self, remote: &ParticipantId) {
        let opened = self.opened.lock().unwrap();
        if let Some(o) = opened.iter().rev().find(|o| &o.remote == remote) {
            let _ = o.events.try_send(TransportEvent::Failed(o.link));
        }
    }
}

#[async_trait]
impl TransportFactory for MockTransportFactory {
    async fn open(
        &self,
        link: LinkId,
        remote: &ParticipantId,
        _audio: &LocalAudio,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn PeerTransport>> {
        if self.fail_open.load(Ordering::SeqCst) {
            bail!("transport creation disabled");
        }

        let log = Arc::new(Mutex::new(TransportLog::default()));
        self.opened.lock().unwrap().push(Opened {
            link,
            remote: remote.clone(),
            events: events.clone(),
            log: log.clone(),
        });

        Ok(Box::new(MockTransport {
            link,
            owner: self.owner.clone(),
            events,
            log,
            connect: self.connect.load(Ordering::SeqCst),
        }))
    }
}

pub struct MockTransport {
    link: LinkId,
    owner: ParticipantId,
    events: mpsc::Sender<TransportEvent>,
    log: Arc<Mutex<TransportLog>>,
    connect: bool,
}

impl MockTransport {
    fn emit(&self, event: TransportEvent) {
        let _ = self.events.try_send(event);
    }

    fn local_description_set(&self) {
        let candidate = IceCandidate::new(format!("candidate:{}:{}", self.owner, self.link));
        self.emit(TransportEvent::CandidateGenerated(self.link, candidate));
    }

    fn complete(&self) {
        if !self.connect {
            return;
        }
        let track: RemoteAudio = Arc::new(MockRemoteTrack {
            id: format!("track-{}", self.link),
        });
        self.emit(TransportEvent::RemoteTrack(self.link, track));
        self.emit(TransportEvent::Connected(self.link));
    }
}

#[async_trait]
impl PeerTransport for MockTransport {
    async fn create_offer(&self) -> Result<String> {
        self.log.lock().unwrap().offers_created += 1;
        self.local_description_set();
        Ok(format!("offer:{}:{}", self.owner, self.link))
    }

    async fn set_remote_offer(&self, sdp: String) -> Result<()> {
        if !sdp.starts_with("offer:") {
            bail!("not an offer: {sdp}");
        }
        self.log.lock().unwrap().offers_applied += 1;
        Ok(())
    }

    async fn create_answer(&self) -> Result<String> {
        self.log.lock().unwrap().answers_created += 1;
        self.local_description_set();
        self.complete();
        Ok(format!("answer:{}:{}", self.owner, self.link))
    }

    async fn set_remote_answer(&self, sdp: String) -> Result<()> {
        if !sdp.starts_with("answer:") {
            bail!("not an answer: {sdp}");
        }
        self.log.lock().unwrap().answers_applied += 1;
        self.complete();
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.log.lock().unwrap().candidates.push(candidate);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.log.lock().unwrap().closed = true;
        Ok(())
    }
}
