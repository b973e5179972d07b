use crate::peer_link::{
    CloseReason, LinkContext, LinkError, LinkRole, LinkState, PeerLink, SignalOutcome,
};
use crate::reconcile::{ReconcilePlan, Reconciler};
use crate::room::{CallEvent, LinkSummary};
use crate::transport::{LinkId, TransportEvent};
use futures::future::join_all;
use huddle_core::{HandshakeKind, HandshakeMessage, ParticipantId, Roster, Signal};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

static NEXT_LINK_ID: AtomicU64 = AtomicU64::new(1);

fn next_link_id() -> LinkId {
    NEXT_LINK_ID.fetch_add(1, Ordering::Relaxed)
}

/// Peer links of the local participant's call in one room.
pub(crate) struct ActiveCall {
    ctx: LinkContext,
    links: HashMap<ParticipantId, PeerLink>,
    link_index: HashMap<LinkId, ParticipantId>,
    reconciler: Reconciler,
    /// Peers whose last link failed and that have not connected since.
    failed_peers: HashSet<ParticipantId>,
    degraded: bool,
    negotiation_timeout: Duration,
    events: mpsc::UnboundedSender<CallEvent>,
}

impl ActiveCall {
    pub(crate) fn new(
        ctx: LinkContext,
        negotiation_timeout: Duration,
        events: mpsc::UnboundedSender<CallEvent>,
    ) -> Self {
        let reconciler = Reconciler::new(ctx.local.clone());
        Self {
            ctx,
            links: HashMap::new(),
            link_index: HashMap::new(),
            reconciler,
            failed_peers: HashSet::new(),
            degraded: false,
            negotiation_timeout,
            events,
        }
    }

    pub(crate) fn context(&self) -> &LinkContext {
        &self.ctx
    }

    pub(crate) fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Plans link changes for `roster`. Does not touch any link.
    pub(crate) fn plan(&mut self, roster: &Roster) -> ReconcilePlan {
        let linked: HashSet<ParticipantId> = self.links.keys().cloned().collect();
        self.reconciler.plan(roster, &linked)
    }

    pub(crate) async fn apply_plan(&mut self, plan: ReconcilePlan) {
        for peer in plan.remove {
            self.failed_peers.remove(&peer);
            self.close_link(&peer, CloseReason::RemoteLeft).await;
        }
        for peer in plan.restarted {
            self.failed_peers.remove(&peer);
            self.close_link(&peer, CloseReason::Replaced).await;
        }
        for (peer, role) in plan.create {
            self.open_link(peer, role).await;
        }
    }

    async fn open_link(&mut self, peer: ParticipantId, role: LinkRole) {
        if let Some(existing) = self.links.get(&peer) {
            debug!(peer = %peer, link = existing.id(), "Link already present, not creating another");
            return;
        }

        let link = PeerLink::new(next_link_id(), peer.clone(), role);
        info!(room = %self.ctx.room, peer = %peer, link = link.id(), ?role, "Creating peer link");
        self.link_index.insert(link.id(), peer.clone());
        self.links.insert(peer.clone(), link);
        self.emit_state(&peer, LinkState::New);

        if role == LinkRole::Initiator {
            self.initiate(&peer).await;
        }
    }

    async fn initiate(&mut self, peer: &ParticipantId) {
        let Some(link) = self.links.get_mut(peer) else {
            return;
        };
        match link.initiate(&self.ctx).await {
            Ok(()) => {
                link.flush(&self.ctx).await;
                self.emit_state(peer, LinkState::Negotiating);
            }
            Err(e) => warn!(peer = %peer, link = link.id(), "Could not start negotiation, retrying next tick: {}", e),
        }
    }

    /// Retries offers for initiator links that are still `New`.
    pub(crate) async fn start_pending(&mut self) {
        let pending: Vec<ParticipantId> = self
            .links
            .values()
            .filter(|l| l.role() == LinkRole::Initiator && l.state() == LinkState::New)
            .map(|l| l.remote().clone())
            .collect();
        for peer in pending {
            self.initiate(&peer).await;
        }
    }

    /// Routes one deduplicated inbound message to its link.
    pub(crate) async fn dispatch(&mut self, signal: Signal, roster: &Roster) {
        let from = signal.from.clone();
        let kind = signal.kind();

        if !self.links.contains_key(&from) {
            if kind == HandshakeKind::Offer && roster.call_seq_of(&from).is_some() {
                self.open_link(from.clone(), LinkRole::Responder).await;
            } else {
                debug!(peer = %from, %kind, "No link for sender, dropping message");
                return;
            }
        }

        let Some(link) = self.links.get_mut(&from) else {
            return;
        };
        let before = link.state();
        let result = link.handle_signal(signal.message.clone(), &self.ctx).await;

        match result {
            Ok(SignalOutcome::Applied) => {
                let after = link.state();
                link.flush(&self.ctx).await;
                if before != after {
                    self.emit_state(&from, after);
                }
            }
            Ok(outcome) => debug!(peer = %from, %kind, ?outcome, "Candidate not applied yet"),
            Err(LinkError::Unexpected {
                kind: HandshakeKind::Offer,
                state,
                role: LinkRole::Responder,
            }) if matches!(state, LinkState::Negotiating | LinkState::Connected) => {
                info!(peer = %from, ?state, "Remote restarted negotiation, replacing link");
                self.replace_link(&from, signal.message).await;
            }
            Err(e) => warn!(peer = %from, %kind, "Dropping handshake message: {}", e),
        }
    }

    async fn replace_link(&mut self, peer: &ParticipantId, offer: HandshakeMessage) {
        self.close_link(peer, CloseReason::Replaced).await;
        self.open_link(peer.clone(), LinkRole::Responder).await;

        let Some(link) = self.links.get_mut(peer) else {
            return;
        };
        match link.handle_signal(offer, &self.ctx).await {
            Ok(_) => {
                link.flush(&self.ctx).await;
                self.emit_state(peer, LinkState::Negotiating);
            }
            Err(e) => warn!(peer = %peer, "Restarted offer could not be answered: {}", e),
        }
    }

    pub(crate) async fn on_transport_event(&mut self, event: TransportEvent) {
        let link_id = event.link();
        let Some(peer) = self.link_index.get(&link_id).cloned() else {
            debug!(link = link_id, ?event, "Event for a retired link, ignoring");
            return;
        };
        let Some(link) = self.links.get_mut(&peer) else {
            return;
        };

        let before = link.state();
        let closed = link.on_transport_event(event, &self.ctx).await;
        let after = link.state();
        link.flush(&self.ctx).await;

        if let Some(reason) = closed {
            self.retire(&peer, reason);
        } else if before != after {
            self.emit_state(&peer, after);
            if after == LinkState::Connected {
                self.failed_peers.remove(&peer);
            }
        }
    }

    /// Closes links that have been negotiating for too long.
    pub(crate) async fn expire_negotiations(&mut self) {
        let now = Instant::now();
        let expired: Vec<ParticipantId> = self
            .links
            .values()
            .filter(|l| l.negotiation_expired(now, self.negotiation_timeout))
            .map(|l| l.remote().clone())
            .collect();

        for peer in expired {
            warn!(peer = %peer, timeout = ?self.negotiation_timeout, "Negotiation timed out");
            self.close_link(&peer, CloseReason::NegotiationTimeout).await;
        }
    }

    pub(crate) async fn flush_all(&mut self) {
        for link in self.links.values_mut() {
            link.flush(&self.ctx).await;
        }
    }

    /// Recomputes whether every other call member is unreachable and
    /// reports a change.
    pub(crate) fn update_health(&mut self, roster: &Roster) {
        let peers: Vec<&ParticipantId> = roster
            .call_members()
            .map(|entry| entry.id())
            .filter(|id| *id != &self.ctx.local)
            .collect();
        let degraded = !peers.is_empty() && peers.iter().all(|p| self.failed_peers.contains(*p));

        if degraded == self.degraded {
            return;
        }
        self.degraded = degraded;
        let room = self.ctx.room.clone();
        if degraded {
            warn!(room = %room, "Every peer link failed, call degraded");
            let _ = self.events.send(CallEvent::Degraded { room });
        } else {
            info!(room = %room, "Call recovered");
            let _ = self.events.send(CallEvent::Recovered { room });
        }
    }

    async fn close_link(&mut self, peer: &ParticipantId, reason: CloseReason) {
        let Some(link) = self.links.get_mut(peer) else {
            return;
        };
        link.close(reason, &self.ctx).await;
        self.retire(peer, reason);
    }

    /// Forgets a closed link so the next reconciliation can recreate it.
    fn retire(&mut self, peer: &ParticipantId, reason: CloseReason) {
        let Some(link) = self.links.remove(peer) else {
            return;
        };
        self.link_index.remove(&link.id());
        if reason.is_failure() {
            self.failed_peers.insert(peer.clone());
        }
        self.emit_state(peer, LinkState::Closed);
    }

    /// Closes every link concurrently.
    pub(crate) async fn close_all(&mut self, reason: CloseReason) {
        let ctx = &self.ctx;
        join_all(self.links.values_mut().map(|link| link.close(reason, ctx))).await;

        let peers: Vec<ParticipantId> = self.links.keys().cloned().collect();
        for peer in peers {
            self.retire(&peer, reason);
        }
        self.reconciler.reset();
    }

    pub(crate) fn summaries(&self) -> Vec<LinkSummary> {
        let mut links: Vec<LinkSummary> = self
            .links
            .values()
            .map(|l| LinkSummary {
                participant: l.remote().clone(),
                role: l.role(),
                state: l.state(),
            })
            .collect();
        links.sort_by(|a, b| a.participant.cmp(&b.participant));
        links
    }

    fn emit_state(&self, peer: &ParticipantId, state: LinkState) {
        let _ = self.events.send(CallEvent::LinkStateChanged {
            room: self.ctx.room.clone(),
            participant: peer.clone(),
            state,
        });
    }
}
