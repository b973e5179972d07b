use crate::peer_link::LinkRole;
use huddle_core::{ParticipantId, Roster};
use std::collections::{HashMap, HashSet};

/// Link changes derived from one roster snapshot. Apply `remove` first.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Peers that left the call; their links must be closed.
    pub remove: Vec<ParticipantId>,
    /// Peers that rejoined the call under the same id. Their old link is
    /// closed and a fresh one appears in `create`.
    pub restarted: Vec<ParticipantId>,
    /// Peers that need a fresh link, with our role on it.
    pub create: Vec<(ParticipantId, LinkRole)>,
    /// The local participant is missing from the call roster.
    pub local_missing: bool,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty()
            && self.restarted.is_empty()
            && self.create.is_empty()
            && !self.local_missing
    }
}

/// Diffs successive call rosters against the previous one.
///
/// A peer counts as departed when it is absent from the new roster or its
/// call sequence changed, which is how a rejoin under the same identity
/// shows up. The same peer then reappears as arrived.
#[derive(Debug)]
pub struct Reconciler {
    local: ParticipantId,
    baseline: HashMap<ParticipantId, u64>,
}

impl Reconciler {
    pub fn new(local: ParticipantId) -> Self {
        Self {
            local,
            baseline: HashMap::new(),
        }
    }

    /// Compares `roster` with the previous one. `linked` names the peers
    /// that currently have an open link; present peers without one get a
    /// link created as well.
    pub fn plan(&mut self, roster: &Roster, linked: &HashSet<ParticipantId>) -> ReconcilePlan {
        let Some(local_seq) = roster.call_seq_of(&self.local) else {
            self.baseline.clear();
            return ReconcilePlan {
                remove: sorted(linked.iter().cloned()),
                local_missing: true,
                ..ReconcilePlan::default()
            };
        };

        let current: Vec<(ParticipantId, u64)> = roster
            .call_members()
            .filter(|entry| entry.id() != &self.local)
            .filter_map(|entry| entry.call_seq.map(|seq| (entry.id().clone(), seq)))
            .collect();
        let current_map: HashMap<&ParticipantId, u64> =
            current.iter().map(|(id, seq)| (id, *seq)).collect();

        let mut remove = Vec::new();
        let mut restarted = Vec::new();
        for (id, seq) in &self.baseline {
            match current_map.get(id) {
                None => remove.push(id.clone()),
                Some(now) if now != seq => restarted.push(id.clone()),
                Some(_) => {}
            }
        }
        // Links to peers that never made it into the baseline.
        for id in linked {
            if !current_map.contains_key(id) && !self.baseline.contains_key(id) {
                remove.push(id.clone());
            }
        }
        remove.sort();
        remove.dedup();
        restarted.sort();

        let create = current
            .iter()
            .filter(|(id, _)| restarted.contains(id) || !linked.contains(id))
            .map(|(id, seq)| (id.clone(), initiator_role(&self.local, local_seq, id, *seq)))
            .collect();

        self.baseline = current.into_iter().collect();

        ReconcilePlan {
            remove,
            restarted,
            create,
            local_missing: false,
        }
    }

    /// Forgets the previous roster, e.g. when the local call ends.
    pub fn reset(&mut self) {
        self.baseline.clear();
    }
}

/// The member that entered the call first sends the offer.
pub fn initiator_role(
    local: &ParticipantId,
    local_seq: u64,
    remote: &ParticipantId,
    remote_seq: u64,
) -> LinkRole {
    if (local_seq, local) < (remote_seq, remote) {
        LinkRole::Initiator
    } else {
        LinkRole::Responder
    }
}

fn sorted(ids: impl Iterator<Item = ParticipantId>) -> Vec<ParticipantId> {
    let mut ids: Vec<_> = ids.collect();
    ids.sort();
    ids
}
