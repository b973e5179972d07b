use crate::error::RelayError;
use crate::relay::SignalRelay;
use async_trait::async_trait;
use huddle_core::wire::{
    CallStatusRequest, DrainResponse, JoinRequest, LeaveRequest, RosterResponse,
    SendSignalRequest, SuccessResponse,
};
use huddle_core::{Participant, ParticipantId, RoomCode, Roster, Signal};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::trace;

/// [`SignalRelay`] over the relay's JSON HTTP API.
#[derive(Clone)]
pub struct HttpRelay {
    client: Client,
    base_url: String,
}

impl HttpRelay {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RelayError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RelayError> {
        let status = response.status();
        if status.is_client_error() {
            let error = match response.json::<SuccessResponse>().await {
                Ok(body) => body.error.unwrap_or_else(|| status.to_string()),
                Err(_) => status.to_string(),
            };
            return Err(RelayError::Rejected(error));
        }
        if !status.is_success() {
            return Err(RelayError::Unavailable(status.to_string()));
        }
        Ok(response.json::<T>().await?)
    }

    fn check(body: SuccessResponse) -> Result<(), RelayError> {
        if body.success {
            Ok(())
        } else {
            Err(RelayError::Rejected(body.error.unwrap_or_default()))
        }
    }
}

#[async_trait]
impl SignalRelay for HttpRelay {
    async fn join(&self, room: &RoomCode, participant: &Participant) -> Result<Roster, RelayError> {
        let request = JoinRequest {
            participant: participant.id.clone(),
            display_name: participant.display_name.clone(),
        };
        let response = self
            .client
            .post(self.url(&format!("/rooms/{room}/join")))
            .json(&request)
            .send()
            .await?;
        let body: RosterResponse = Self::decode(response).await?;
        Ok(body.roster)
    }

    async fn leave(&self, room: &RoomCode, participant: &ParticipantId) -> Result<(), RelayError> {
        let request = LeaveRequest {
            participant: participant.clone(),
        };
        let response = self
            .client
            .post(self.url(&format!("/rooms/{room}/leave")))
            .json(&request)
            .send()
            .await?;
        Self::check(Self::decode(response).await?)
    }

    async fn set_call_status(
        &self,
        room: &RoomCode,
        participant: &ParticipantId,
        active: bool,
    ) -> Result<Roster, RelayError> {
        let request = CallStatusRequest {
            participant: participant.clone(),
            active,
        };
        let response = self
            .client
            .post(self.url(&format!("/rooms/{room}/call")))
            .json(&request)
            .send()
            .await?;
        let body: RosterResponse = Self::decode(response).await?;
        Ok(body.roster)
    }

    async fn roster(
        &self,
        room: &RoomCode,
        participant: &ParticipantId,
    ) -> Result<Roster, RelayError> {
        let response = self
            .client
            .get(self.url(&format!("/rooms/{room}/roster")))
            .query(&[("participant", participant.as_str())])
            .send()
            .await?;
        let body: RosterResponse = Self::decode(response).await?;
        Ok(body.roster)
    }

    async fn send(
        &self,
        room: &RoomCode,
        to: &ParticipantId,
        signal: &Signal,
    ) -> Result<(), RelayError> {
        trace!(room = %room, to = %to, kind = %signal.kind(), "Sending signal");
        let request = SendSignalRequest {
            room: room.clone(),
            from_participant: signal.from.clone(),
            to_participant: to.clone(),
            message: signal.message.clone(),
            timestamp: Some(signal.timestamp),
        };
        let response = self
            .client
            .post(self.url("/signal/send"))
            .json(&request)
            .send()
            .await?;
        Self::check(Self::decode(response).await?)
    }

    async fn drain(
        &self,
        room: &RoomCode,
        participant: &ParticipantId,
    ) -> Result<Vec<Signal>, RelayError> {
        let response = self
            .client
            .get(self.url(&format!("/signal/{room}/{participant}")))
            .send()
            .await?;
        let body: DrainResponse = Self::decode(response).await?;
        Ok(body.signals)
    }
}
