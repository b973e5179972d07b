use crate::model::participant::ParticipantId;
use crate::utils::now_millis;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default)]
    pub sdp_m_line_index: Option<u16>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
        }
    }
}

/// Connection-setup message exchanged through the relay mailbox.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HandshakeMessage {
    Offer { sdp: String },
    Answer { sdp: String },
    IceCandidate { candidate: IceCandidate },
}

impl HandshakeMessage {
    pub fn kind(&self) -> HandshakeKind {
        match self {
            HandshakeMessage::Offer { .. } => HandshakeKind::Offer,
            HandshakeMessage::Answer { .. } => HandshakeKind::Answer,
            HandshakeMessage::IceCandidate { .. } => HandshakeKind::IceCandidate,
        }
    }
}

/// Variant tag of a [`HandshakeMessage`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum HandshakeKind {
    Offer,
    Answer,
    IceCandidate,
}

impl fmt::Display for HandshakeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandshakeKind::Offer => "offer",
            HandshakeKind::Answer => "answer",
            HandshakeKind::IceCandidate => "ice-candidate",
        };
        f.write_str(name)
    }
}

/// A handshake message as stored in, and drained from, a mailbox.
///
/// `timestamp` is the creation time in milliseconds since the Unix epoch.
/// It orders messages inside a mailbox and is part of the dedup key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    #[serde(rename = "fromParticipant")]
    pub from: ParticipantId,
    pub message: HandshakeMessage,
    pub timestamp: i64,
}

impl Signal {
    pub fn new(from: ParticipantId, message: HandshakeMessage) -> Self {
        Self {
            from,
            message,
            timestamp: now_millis(),
        }
    }

    pub fn kind(&self) -> HandshakeKind {
        self.message.kind()
    }
}
