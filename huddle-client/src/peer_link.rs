//! Per-remote-participant connection state machine.
//!
//! ```text
//! New ──offer sent / offer answered──▶ Negotiating ──transport up──▶ Connected
//!  │                                        │                           │
//!  └────────────────────────────────────────┴──── close ────────────────┴──▶ Closed
//! ```
//!
//! `Closed` is terminal. A link that needs to come back is replaced by a
//! fresh instance with a new [`LinkId`].

use crate::error::RelayError;
use crate::media::{AudioDevice, LocalAudio, RemoteAudio};
use crate::relay::SignalRelay;
use crate::transport::{LinkId, PeerTransport, TransportEvent, TransportFactory};
use anyhow::anyhow;
use huddle_core::utils::now_millis;
use huddle_core::{HandshakeKind, HandshakeMessage, IceCandidate, ParticipantId, RoomCode, Signal};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    New,
    Negotiating,
    Connected,
    Closed,
}

/// Which side sends the offer. Decided once per link from roster order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkRole {
    Initiator,
    Responder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    RemoteLeft,
    CallEnded,
    TransportFailed,
    NegotiationTimeout,
    /// The remote restarted the handshake and a new link took over.
    Replaced,
}

impl CloseReason {
    /// Whether the remote is still expected to be reachable afterwards.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            CloseReason::TransportFailed | CloseReason::NegotiationTimeout
        )
    }
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("{kind} not expected while {state:?} as {role:?}")]
    Unexpected {
        kind: HandshakeKind,
        state: LinkState,
        role: LinkRole,
    },

    #[error("transport error: {0:#}")]
    Transport(#[from] anyhow::Error),
}

/// What handling an inbound message did to the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    Applied,
    /// The candidate was already applied.
    Duplicate,
    /// The candidate arrived before the answer and is held until then.
    Deferred,
}

/// Issues strictly increasing millisecond timestamps, so two handshake
/// messages from the same sender never share a dedup key.
#[derive(Debug, Default)]
pub struct SignalClock {
    last: AtomicI64,
}

impl SignalClock {
    pub fn next(&self) -> i64 {
        let now = now_millis();
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let stamp = now.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, stamp, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return stamp,
                Err(actual) => last = actual,
            }
        }
    }
}

/// Everything a link needs from its room session.
#[derive(Clone)]
pub struct LinkContext {
    pub room: RoomCode,
    pub local: ParticipantId,
    pub relay: Arc<dyn SignalRelay>,
    pub transports: Arc<dyn TransportFactory>,
    pub audio: Arc<dyn AudioDevice>,
    pub local_audio: LocalAudio,
    pub events: mpsc::Sender<TransportEvent>,
    pub clock: Arc<SignalClock>,
}

pub struct PeerLink {
    id: LinkId,
    remote: ParticipantId,
    role: LinkRole,
    state: LinkState,
    transport: Option<Box<dyn PeerTransport>>,
    answer_applied: bool,
    applied_candidates: HashSet<IceCandidate>,
    pending_candidates: Vec<IceCandidate>,
    outbox: VecDeque<Signal>,
    remote_audio: Option<RemoteAudio>,
    audio_attached: bool,
    negotiating_since: Option<Instant>,
}

impl PeerLink {
    pub fn new(id: LinkId, remote: ParticipantId, role: LinkRole) -> Self {
        Self {
            id,
            remote,
            role,
            state: LinkState::New,
            transport: None,
            answer_applied: false,
            applied_candidates: HashSet::new(),
            pending_candidates: Vec::new(),
            outbox: VecDeque::new(),
            remote_audio: None,
            audio_attached: false,
            negotiating_since: None,
        }
    }

    pub fn id(&self) -> LinkId {
        self.id
    }

    pub fn remote(&self) -> &ParticipantId {
        &self.remote
    }

    pub fn role(&self) -> LinkRole {
        self.role
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == LinkState::Closed
    }

    pub fn pending_outbound(&self) -> usize {
        self.outbox.len()
    }

    /// Sends the initial offer. Only meaningful for a `New` initiator; a
    /// local failure leaves the link `New` so the next tick retries.
    pub async fn initiate(&mut self, ctx: &LinkContext) -> Result<(), LinkError> {
        if self.state != LinkState::New || self.role != LinkRole::Initiator {
            return Err(self.unexpected(HandshakeKind::Offer));
        }

        let result: anyhow::Result<String> = async {
            let transport = self.open_transport(ctx).await?;
            transport.create_offer().await
        }
        .await;

        match result {
            Ok(sdp) => {
                info!(peer = %self.remote, link = self.id, "Sending offer");
                self.enqueue(ctx, HandshakeMessage::Offer { sdp });
                self.begin_negotiation();
                Ok(())
            }
            Err(e) => {
                self.drop_transport().await;
                Err(LinkError::Transport(e))
            }
        }
    }

    /// Applies one inbound handshake message.
    pub async fn handle_signal(
        &mut self,
        message: HandshakeMessage,
        ctx: &LinkContext,
    ) -> Result<SignalOutcome, LinkError> {
        match message {
            HandshakeMessage::Offer { sdp } => self.accept_offer(sdp, ctx).await,
            HandshakeMessage::Answer { sdp } => self.apply_answer(sdp).await,
            HandshakeMessage::IceCandidate { candidate } => self.apply_candidate(candidate).await,
        }
    }

    async fn accept_offer(
        &mut self,
        sdp: String,
        ctx: &LinkContext,
    ) -> Result<SignalOutcome, LinkError> {
        if self.state != LinkState::New {
            return Err(self.unexpected(HandshakeKind::Offer));
        }
        if self.role == LinkRole::Initiator {
            // Our offer has not gone out yet; the remote's view of the roster
            // made it the initiator, so follow it.
            debug!(peer = %self.remote, link = self.id, "Offer received before ours was sent, answering instead");
            self.role = LinkRole::Responder;
        }

        let result: anyhow::Result<String> = async {
            let transport = self.open_transport(ctx).await?;
            transport.set_remote_offer(sdp).await?;
            transport.create_answer().await
        }
        .await;

        match result {
            Ok(answer) => {
                info!(peer = %self.remote, link = self.id, "Answering offer");
                self.enqueue(ctx, HandshakeMessage::Answer { sdp: answer });
                self.begin_negotiation();
                Ok(SignalOutcome::Applied)
            }
            Err(e) => {
                self.drop_transport().await;
                Err(LinkError::Transport(e))
            }
        }
    }

    async fn apply_answer(&mut self, sdp: String) -> Result<SignalOutcome, LinkError> {
        if self.state != LinkState::Negotiating
            || self.role != LinkRole::Initiator
            || self.answer_applied
        {
            return Err(self.unexpected(HandshakeKind::Answer));
        }
        let transport = self.transport_or_err()?;
        transport.set_remote_answer(sdp).await?;
        self.answer_applied = true;
        debug!(peer = %self.remote, link = self.id, "Answer applied");

        for candidate in std::mem::take(&mut self.pending_candidates) {
            if let Err(e) = self.add_candidate(candidate).await {
                warn!(peer = %self.remote, link = self.id, "Deferred ICE candidate rejected: {}", e);
            }
        }
        Ok(SignalOutcome::Applied)
    }

    async fn apply_candidate(&mut self, candidate: IceCandidate) -> Result<SignalOutcome, LinkError> {
        if !matches!(self.state, LinkState::Negotiating | LinkState::Connected) {
            return Err(self.unexpected(HandshakeKind::IceCandidate));
        }
        if self.applied_candidates.contains(&candidate) || self.pending_candidates.contains(&candidate)
        {
            return Ok(SignalOutcome::Duplicate);
        }
        if self.role == LinkRole::Initiator && !self.answer_applied {
            self.pending_candidates.push(candidate);
            return Ok(SignalOutcome::Deferred);
        }
        self.add_candidate(candidate).await?;
        Ok(SignalOutcome::Applied)
    }

    async fn add_candidate(&mut self, candidate: IceCandidate) -> Result<(), LinkError> {
        let transport = self.transport_or_err()?;
        transport.add_ice_candidate(candidate.clone()).await?;
        self.applied_candidates.insert(candidate);
        Ok(())
    }

    /// Applies a transport event. Returns the close reason when the event
    /// ended the link.
    pub async fn on_transport_event(
        &mut self,
        event: TransportEvent,
        ctx: &LinkContext,
    ) -> Option<CloseReason> {
        if self.is_closed() {
            return None;
        }

        match event {
            TransportEvent::CandidateGenerated(_, candidate) => {
                self.enqueue(ctx, HandshakeMessage::IceCandidate { candidate });
                None
            }
            TransportEvent::Connected(_) => {
                if self.state == LinkState::Negotiating {
                    info!(peer = %self.remote, link = self.id, "Peer link connected");
                    self.state = LinkState::Connected;
                    self.negotiating_since = None;
                    self.attach_audio(ctx);
                }
                None
            }
            TransportEvent::RemoteTrack(_, track) => {
                self.remote_audio = Some(track);
                if self.state == LinkState::Connected {
                    self.attach_audio(ctx);
                }
                None
            }
            TransportEvent::Failed(_) => {
                warn!(peer = %self.remote, link = self.id, "Transport failed");
                self.close(CloseReason::TransportFailed, ctx).await;
                Some(CloseReason::TransportFailed)
            }
        }
    }

    /// Whether the link has been negotiating for longer than `timeout`.
    pub fn negotiation_expired(&self, now: Instant, timeout: Duration) -> bool {
        self.state == LinkState::Negotiating
            && self
                .negotiating_since
                .is_some_and(|since| now.duration_since(since) >= timeout)
    }

    /// Sends queued messages in order. Stops at the first transient failure,
    /// keeping it and everything after it for the next attempt.
    pub async fn flush(&mut self, ctx: &LinkContext) -> usize {
        let mut sent = 0;
        while let Some(signal) = self.outbox.front() {
            match ctx.relay.send(&ctx.room, &self.remote, signal).await {
                Ok(()) => {
                    self.outbox.pop_front();
                    sent += 1;
                }
                Err(e) if e.is_transient() => {
                    debug!(peer = %self.remote, link = self.id, queued = self.outbox.len(), "Signal send failed, will retry: {}", e);
                    break;
                }
                Err(e) => {
                    self.report_rejected(e);
                }
            }
        }
        sent
    }

    fn report_rejected(&mut self, e: RelayError) {
        if let Some(signal) = self.outbox.pop_front() {
            warn!(peer = %self.remote, link = self.id, kind = %signal.kind(), "Relay rejected signal, dropping it: {}", e);
        }
    }

    /// Tears the link down. Idempotent.
    pub async fn close(&mut self, reason: CloseReason, ctx: &LinkContext) {
        if self.is_closed() {
            return;
        }
        info!(peer = %self.remote, link = self.id, ?reason, "Closing peer link");

        self.state = LinkState::Closed;
        self.negotiating_since = None;
        self.outbox.clear();
        self.pending_candidates.clear();
        self.drop_transport().await;

        if self.audio_attached {
            ctx.audio.detach_remote_audio(&self.remote);
            self.audio_attached = false;
        }
        self.remote_audio = None;
    }

    async fn open_transport(
        &mut self,
        ctx: &LinkContext,
    ) -> anyhow::Result<&dyn PeerTransport> {
        if self.transport.is_none() {
            let transport = ctx
                .transports
                .open(self.id, &self.remote, &ctx.local_audio, ctx.events.clone())
                .await?;
            self.transport = Some(transport);
        }
        self.transport
            .as_deref()
            .ok_or_else(|| anyhow!("transport missing after open"))
    }

    async fn drop_transport(&mut self) {
        let Some(transport) = self.transport.take() else {
            return;
        };
        if let Err(e) = transport.close().await {
            debug!(peer = %self.remote, link = self.id, "Transport close failed: {:#}", e);
        }
    }

    fn transport_or_err(&self) -> Result<&dyn PeerTransport, LinkError> {
        self.transport
            .as_deref()
            .ok_or_else(|| LinkError::Transport(anyhow!("no transport for link {}", self.id)))
    }

    fn attach_audio(&mut self, ctx: &LinkContext) {
        if self.audio_attached {
            return;
        }
        if let Some(track) = &self.remote_audio {
            ctx.audio.attach_remote_audio(&self.remote, track.clone());
            self.audio_attached = true;
        }
    }

    fn enqueue(&mut self, ctx: &LinkContext, message: HandshakeMessage) {
        self.outbox.push_back(Signal {
            from: ctx.local.clone(),
            message,
            timestamp: ctx.clock.next(),
        });
    }

    fn begin_negotiation(&mut self) {
        self.state = LinkState::Negotiating;
        self.negotiating_since = Some(Instant::now());
    }

    fn unexpected(&self, kind: HandshakeKind) -> LinkError {
        LinkError::Unexpected {
            kind,
            state: self.state,
            role: self.role,
        }
    }
}

impl std::fmt::Debug for PeerLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerLink")
            .field("id", &self.id)
            .field("remote", &self.remote)
            .field("role", &self.role)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
