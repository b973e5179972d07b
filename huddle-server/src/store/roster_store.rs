use dashmap::DashMap;
use huddle_core::{Participant, ParticipantId, RoomCode, Roster, RosterEntry};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

struct Member {
    entry: RosterEntry,
    last_seen: Instant,
}

/// Members of one room. `version` grows on every membership or call change.
#[derive(Default)]
struct RoomRoster {
    version: u64,
    members: Vec<Member>,
}

impl RoomRoster {
    fn position(&self, id: &ParticipantId) -> Option<usize> {
        self.members.iter().position(|m| m.entry.id() == id)
    }

    fn snapshot(&self, room: &RoomCode) -> Roster {
        Roster {
            room: room.clone(),
            version: self.version,
            members: self.members.iter().map(|m| m.entry.clone()).collect(),
        }
    }
}

/// Authoritative room rosters, shared by every request handler.
///
/// All mutations touch a single room entry, which `DashMap` locks for the
/// duration of the call, so concurrent joins and leaves never need a global
/// lock.
#[derive(Clone, Default)]
pub struct RosterStore {
    rooms: Arc<DashMap<RoomCode, RoomRoster>>,
}

impl RosterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `participant` to `room`. Re-joining is a no-op apart from
    /// refreshing the display name and liveness.
    pub fn join(&self, room: &RoomCode, participant: Participant) -> Roster {
        let mut roster = self.rooms.entry(room.clone()).or_default();

        match roster.position(&participant.id) {
            Some(idx) => {
                let member = &mut roster.members[idx];
                member.last_seen = Instant::now();
                if !participant.display_name.is_empty() {
                    member.entry.participant.display_name = participant.display_name;
                }
            }
            None => {
                info!(room = %room, participant = %participant.id, "Participant joined room");
                roster.version += 1;
                roster.members.push(Member {
                    entry: RosterEntry::new(participant),
                    last_seen: Instant::now(),
                });
            }
        }

        roster.snapshot(room)
    }

    /// Removes `id` from `room`. Returns whether anything was removed.
    pub fn leave(&self, room: &RoomCode, id: &ParticipantId) -> bool {
        let Some(mut roster) = self.rooms.get_mut(room) else {
            return false;
        };
        let Some(idx) = roster.position(id) else {
            return false;
        };

        roster.members.remove(idx);
        roster.version += 1;
        info!(room = %room, participant = %id, "Participant left room");
        true
    }

    /// Marks `id` as in or out of the room's call. Activating a participant
    /// that is not a member joins them first, using the id as display name.
    pub fn set_call_status(&self, room: &RoomCode, id: &ParticipantId, active: bool) -> Roster {
        let mut roster = if active {
            self.rooms.entry(room.clone()).or_default()
        } else {
            match self.rooms.get_mut(room) {
                Some(roster) => roster,
                None => return Roster::empty(room.clone()),
            }
        };

        let idx = match roster.position(id) {
            Some(idx) => idx,
            None if active => {
                roster.version += 1;
                roster.members.push(Member {
                    entry: RosterEntry::new(Participant::new(id.clone(), id.to_string())),
                    last_seen: Instant::now(),
                });
                roster.members.len() - 1
            }
            None => return roster.snapshot(room),
        };

        let in_call = roster.members[idx].entry.in_call();
        if in_call != active {
            roster.version += 1;
            let version = roster.version;
            let member = &mut roster.members[idx];
            member.entry.call_seq = active.then_some(version);
            member.last_seen = Instant::now();
            info!(room = %room, participant = %id, active, "Call status changed");
        }

        roster.snapshot(room)
    }

    pub fn is_member(&self, room: &RoomCode, id: &ParticipantId) -> bool {
        self.rooms
            .get(room)
            .is_some_and(|roster| roster.position(id).is_some())
    }

    /// Current roster of `room`; an unknown room yields an empty roster.
    pub fn snapshot(&self, room: &RoomCode) -> Roster {
        self.rooms
            .get(room)
            .map(|roster| roster.snapshot(room))
            .unwrap_or_else(|| Roster::empty(room.clone()))
    }

    /// Refreshes the liveness of a member. Returns false for non-members.
    pub fn touch(&self, room: &RoomCode, id: &ParticipantId) -> bool {
        let Some(mut roster) = self.rooms.get_mut(room) else {
            return false;
        };
        match roster.position(id) {
            Some(idx) => {
                roster.members[idx].last_seen = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Removes every member not seen within `ttl`.
    pub fn reap_stale(&self, ttl: Duration) -> Vec<(RoomCode, ParticipantId)> {
        let mut reaped = Vec::new();

        for mut room in self.rooms.iter_mut() {
            let code = room.key().clone();
            let before = room.members.len();
            room.members.retain(|m| {
                let alive = m.last_seen.elapsed() < ttl;
                if !alive {
                    reaped.push((code.clone(), m.entry.id().clone()));
                }
                alive
            });
            if room.members.len() != before {
                room.version += 1;
            }
        }

        if !reaped.is_empty() {
            debug!(count = reaped.len(), "Reaped stale roster members");
        }
        reaped
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
