use crate::config::ClientConfig;
use crate::dedup::DedupGuard;
use crate::error::CallError;
use crate::media::AudioDevice;
use crate::peer_link::{CloseReason, LinkContext, SignalClock};
use crate::relay::SignalRelay;
use crate::room::active_call::ActiveCall;
use crate::room::{CallEvent, CallSnapshot, RoomCommand};
use crate::transport::{TransportEvent, TransportFactory};
use huddle_core::{Participant, RoomCode, Roster};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Shared collaborators of every room session a client runs.
#[derive(Clone)]
pub struct SessionServices {
    pub relay: Arc<dyn SignalRelay>,
    pub transports: Arc<dyn TransportFactory>,
    pub audio: Arc<dyn AudioDevice>,
    pub events: mpsc::UnboundedSender<CallEvent>,
}

/// Event loop for the local participant's presence in one room.
///
/// Everything that touches the room's links runs on this task, so link
/// state needs no locking. Each tick polls the roster, reconciles links
/// against it, then, while a call is active, drains and dispatches the
/// mailbox.
pub struct RoomSession {
    room: RoomCode,
    local: Participant,
    config: ClientConfig,
    services: SessionServices,
    command_rx: mpsc::Receiver<RoomCommand>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    transport_tx: mpsc::Sender<TransportEvent>,
    roster: Roster,
    dedup: DedupGuard,
    clock: Arc<SignalClock>,
    call: Option<ActiveCall>,
}

impl RoomSession {
    pub fn new(
        room: RoomCode,
        local: Participant,
        roster: Roster,
        config: ClientConfig,
        services: SessionServices,
        command_rx: mpsc::Receiver<RoomCommand>,
    ) -> Self {
        let (transport_tx, transport_rx) = mpsc::channel(256);
        let dedup = DedupGuard::new(config.dedup_capacity);

        Self {
            room,
            local,
            config,
            services,
            command_rx,
            transport_rx,
            transport_tx,
            roster,
            dedup,
            clock: Arc::new(SignalClock::default()),
            call: None,
        }
    }

    pub async fn run(mut self) {
        info!(room = %self.room, participant = %self.local.id, "Room session started");

        let mut ticker = tokio::time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick().await,

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(RoomCommand::Leave { reply }) => {
                            self.leave().await;
                            let _ = reply.send(());
                            break;
                        }
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!(room = %self.room, "Command channel closed. Leaving room.");
                            self.leave().await;
                            break;
                        }
                    }
                }

                Some(evt) = self.transport_rx.recv() => {
                    match self.call.as_mut() {
                        Some(call) => call.on_transport_event(evt).await,
                        None => debug!(room = %self.room, ?evt, "Transport event outside a call, ignoring"),
                    }
                }
            }
        }

        info!(room = %self.room, "Room session finished");
    }

    async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::StartCall { reply } => {
                let _ = reply.send(self.start_call().await);
            }
            RoomCommand::EndCall { reply } => {
                let _ = reply.send(self.end_call().await);
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            RoomCommand::Leave { .. } => {}
        }
    }

    async fn start_call(&mut self) -> Result<(), CallError> {
        if self.call.is_some() {
            return Err(CallError::AlreadyActive(self.room.clone()));
        }

        let local_audio = self
            .services
            .audio
            .acquire_local_audio(&self.local.id, &self.config.audio)
            .await
            .inspect_err(|e| warn!(room = %self.room, "Local audio unavailable: {}", e))?;

        let roster = match self
            .services
            .relay
            .set_call_status(&self.room, &self.local.id, true)
            .await
        {
            Ok(roster) => roster,
            Err(e) => {
                self.services.audio.release_local_audio(local_audio).await;
                return Err(e.into());
            }
        };

        let ctx = LinkContext {
            room: self.room.clone(),
            local: self.local.id.clone(),
            relay: self.services.relay.clone(),
            transports: self.services.transports.clone(),
            audio: self.services.audio.clone(),
            local_audio,
            events: self.transport_tx.clone(),
            clock: self.clock.clone(),
        };
        self.call = Some(ActiveCall::new(
            ctx,
            self.config.negotiation_timeout,
            self.services.events.clone(),
        ));

        info!(room = %self.room, participant = %self.local.id, "Call started");
        self.emit(CallEvent::CallStarted {
            room: self.room.clone(),
        });
        self.apply_roster(roster).await;
        Ok(())
    }

    async fn end_call(&mut self) -> Result<(), CallError> {
        let Some(mut call) = self.call.take() else {
            return Err(CallError::NotActive(self.room.clone()));
        };

        call.close_all(CloseReason::CallEnded).await;
        let local_audio = call.context().local_audio.clone();
        drop(call);
        self.services.audio.release_local_audio(local_audio).await;

        info!(room = %self.room, participant = %self.local.id, "Call ended");
        self.emit(CallEvent::CallEnded {
            room: self.room.clone(),
        });

        match self
            .services
            .relay
            .set_call_status(&self.room, &self.local.id, false)
            .await
        {
            Ok(roster) => self.apply_roster(roster).await,
            Err(e) => warn!(room = %self.room, "Could not clear call status on relay: {}", e),
        }
        Ok(())
    }

    async fn leave(&mut self) {
        if self.call.is_some()
            && let Err(e) = self.end_call().await
        {
            debug!(room = %self.room, "Ending call on leave failed: {}", e);
        }
        if let Err(e) = self.services.relay.leave(&self.room, &self.local.id).await {
            warn!(room = %self.room, "Leave request failed: {}", e);
        }
    }

    async fn tick(&mut self) {
        match self
            .services
            .relay
            .roster(&self.room, &self.local.id)
            .await
        {
            Ok(roster) => self.apply_roster(roster).await,
            Err(e) => debug!(room = %self.room, "Roster poll failed, retrying next tick: {}", e),
        }

        // Outside a call the mailbox is left alone.
        let Some(call) = self.call.as_mut() else {
            return;
        };

        let signals = match self.services.relay.drain(&self.room, &self.local.id).await {
            Ok(signals) => signals,
            Err(e) => {
                debug!(room = %self.room, "Mailbox drain failed, retrying next tick: {}", e);
                Vec::new()
            }
        };

        call.start_pending().await;
        for signal in signals {
            if !self.dedup.admit(&signal) {
                debug!(peer = %signal.from, kind = %signal.kind(), timestamp = signal.timestamp, "Duplicate signal discarded");
                continue;
            }
            if !self.roster.contains(&signal.from) {
                debug!(peer = %signal.from, kind = %signal.kind(), "Signal from non-member dropped");
                continue;
            }
            call.dispatch(signal, &self.roster).await;
        }
        call.expire_negotiations().await;
        call.flush_all().await;
        call.update_health(&self.roster);
    }

    /// Stores `roster` and reconciles the call against it.
    async fn apply_roster(&mut self, roster: Roster) {
        if roster.version != self.roster.version || roster.members != self.roster.members {
            self.emit(CallEvent::RosterChanged {
                room: self.room.clone(),
                roster: roster.clone(),
            });
        }
        self.roster = roster;

        let Some(call) = self.call.as_mut() else {
            return;
        };

        let plan = call.plan(&self.roster);
        if !plan.local_missing {
            call.apply_plan(plan).await;
            call.update_health(&self.roster);
            return;
        }

        warn!(room = %self.room, participant = %self.local.id, "Relay lost our call entry, rejoining");
        call.apply_plan(plan).await;
        if let Err(e) = self.services.relay.join(&self.room, &self.local).await {
            warn!(room = %self.room, "Rejoining the room failed: {}", e);
            return;
        }
        match self
            .services
            .relay
            .set_call_status(&self.room, &self.local.id, true)
            .await
        {
            Ok(roster) => self.roster = roster,
            Err(e) => warn!(room = %self.room, "Rejoining the call failed: {}", e),
        }
    }

    fn snapshot(&self) -> CallSnapshot {
        CallSnapshot {
            room: self.room.clone(),
            roster: self.roster.clone(),
            in_call: self.call.is_some(),
            degraded: self.call.as_ref().is_some_and(|c| c.is_degraded()),
            links: self
                .call
                .as_ref()
                .map(|c| c.summaries())
                .unwrap_or_default(),
        }
    }

    fn emit(&self, event: CallEvent) {
        let _ = self.services.events.send(event);
    }
}
