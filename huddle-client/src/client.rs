use crate::config::ClientConfig;
use crate::error::CallError;
use crate::media::AudioDevice;
use crate::relay::{HttpRelay, SignalRelay};
use crate::room::{CallEvent, CallSnapshot, RoomCommand, RoomSession, SessionServices};
use crate::transport::{TransportFactory, WebRtcTransportFactory};
use anyhow::Result;
use dashmap::DashMap;
use huddle_core::{Participant, RoomCode, Roster};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::info;

/// One local participant's view of every room it has entered.
///
/// Each entered room runs its own [`RoomSession`] task; this handle only
/// forwards commands to it.
#[derive(Clone)]
pub struct HuddleClient {
    local: Participant,
    config: ClientConfig,
    services: SessionServices,
    rooms: Arc<DashMap<RoomCode, mpsc::Sender<RoomCommand>>>,
}

impl HuddleClient {
    pub fn new(
        local: Participant,
        config: ClientConfig,
        relay: Arc<dyn SignalRelay>,
        transports: Arc<dyn TransportFactory>,
        audio: Arc<dyn AudioDevice>,
    ) -> (Self, mpsc::UnboundedReceiver<CallEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let client = Self {
            local,
            config,
            services: SessionServices {
                relay,
                transports,
                audio,
                events,
            },
            rooms: Arc::new(DashMap::new()),
        };
        (client, events_rx)
    }

    /// Builds a client that talks HTTP to `config.relay_url` and carries
    /// audio over WebRTC.
    pub fn connect(
        local: Participant,
        config: ClientConfig,
        audio: Arc<dyn AudioDevice>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<CallEvent>)> {
        let relay = HttpRelay::new(config.relay_url.clone(), config.request_timeout)?;
        let transports = WebRtcTransportFactory::new(config.transport.clone())?;
        Ok(Self::new(
            local,
            config,
            Arc::new(relay),
            Arc::new(transports),
            audio,
        ))
    }

    pub fn local(&self) -> &Participant {
        &self.local
    }

    pub fn rooms(&self) -> Vec<RoomCode> {
        self.rooms.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Registers with `room` and starts its session. Entering a room that
    /// is already entered only refreshes the registration.
    pub async fn join_room(&self, room: RoomCode) -> Result<Roster, CallError> {
        let roster = self.services.relay.join(&room, &self.local).await?;

        if self.rooms.contains_key(&room) {
            return Ok(roster);
        }

        info!(room = %room, participant = %self.local.id, "Entering room");
        let (tx, rx) = mpsc::channel(100);
        let session = RoomSession::new(
            room.clone(),
            self.local.clone(),
            roster.clone(),
            self.config.clone(),
            self.services.clone(),
            rx,
        );
        tokio::spawn(session.run());
        self.rooms.insert(room, tx);

        Ok(roster)
    }

    pub async fn start_call(&self, room: &RoomCode) -> Result<(), CallError> {
        self.request(room, |reply| RoomCommand::StartCall { reply })
            .await?
    }

    pub async fn end_call(&self, room: &RoomCode) -> Result<(), CallError> {
        self.request(room, |reply| RoomCommand::EndCall { reply })
            .await?
    }

    pub async fn snapshot(&self, room: &RoomCode) -> Result<CallSnapshot, CallError> {
        self.request(room, |reply| RoomCommand::Snapshot { reply })
            .await
    }

    /// Ends any call in `room`, deregisters and stops the session.
    pub async fn leave_room(&self, room: &RoomCode) -> Result<(), CallError> {
        let result = self.request(room, |reply| RoomCommand::Leave { reply }).await;
        self.rooms.remove(room);
        result
    }

    /// Leaves every entered room.
    pub async fn shutdown(&self) {
        for room in self.rooms() {
            let _ = self.leave_room(&room).await;
        }
    }

    async fn request<T>(
        &self,
        room: &RoomCode,
        command: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, CallError> {
        let sender = self
            .rooms
            .get(room)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CallError::NotInRoom(room.clone()))?;

        let (reply, response) = oneshot::channel();
        sender
            .send(command(reply))
            .await
            .map_err(|_| CallError::SessionClosed(room.clone()))?;
        response
            .await
            .map_err(|_| CallError::SessionClosed(room.clone()))
    }
}
