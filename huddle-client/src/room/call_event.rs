use crate::peer_link::{LinkRole, LinkState};
use huddle_core::{ParticipantId, RoomCode, Roster};

/// Notifications for the embedding UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    RosterChanged {
        room: RoomCode,
        roster: Roster,
    },
    CallStarted {
        room: RoomCode,
    },
    CallEnded {
        room: RoomCode,
    },
    LinkStateChanged {
        room: RoomCode,
        participant: ParticipantId,
        state: LinkState,
    },
    /// Every other call member is unreachable.
    Degraded {
        room: RoomCode,
    },
    Recovered {
        room: RoomCode,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSummary {
    pub participant: ParticipantId,
    pub role: LinkRole,
    pub state: LinkState,
}

/// Point-in-time view of one room session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSnapshot {
    pub room: RoomCode,
    pub roster: Roster,
    pub in_call: bool,
    pub degraded: bool,
    pub links: Vec<LinkSummary>,
}

impl CallSnapshot {
    pub fn link(&self, participant: &ParticipantId) -> Option<&LinkSummary> {
        self.links.iter().find(|l| &l.participant == participant)
    }

    pub fn connected_peers(&self) -> usize {
        self.links
            .iter()
            .filter(|l| l.state == LinkState::Connected)
            .count()
    }
}
