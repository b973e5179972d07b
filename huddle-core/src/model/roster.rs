use crate::model::participant::{Participant, ParticipantId};
use crate::model::room::RoomCode;
use serde::{Deserialize, Serialize};

/// One member of a room roster.
///
/// `call_seq` is the roster version at which the member entered the call,
/// `None` while they are in the room but not in the call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    #[serde(flatten)]
    pub participant: Participant,
    #[serde(default)]
    pub call_seq: Option<u64>,
}

impl RosterEntry {
    pub fn new(participant: Participant) -> Self {
        Self {
            participant,
            call_seq: None,
        }
    }

    pub fn id(&self) -> &ParticipantId {
        &self.participant.id
    }

    pub fn in_call(&self) -> bool {
        self.call_seq.is_some()
    }
}

/// Versioned snapshot of a room's members, in join order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Roster {
    pub room: RoomCode,
    pub version: u64,
    pub members: Vec<RosterEntry>,
}

impl Roster {
    pub fn empty(room: RoomCode) -> Self {
        Self {
            room,
            version: 0,
            members: Vec::new(),
        }
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&RosterEntry> {
        self.members.iter().find(|m| m.id() == id)
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ParticipantId> {
        self.members.iter().map(RosterEntry::id)
    }

    /// Members currently in the call, in join order.
    pub fn call_members(&self) -> impl Iterator<Item = &RosterEntry> {
        self.members.iter().filter(|m| m.in_call())
    }

    pub fn call_seq_of(&self, id: &ParticipantId) -> Option<u64> {
        self.get(id).and_then(|m| m.call_seq)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
