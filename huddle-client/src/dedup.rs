use huddle_core::{HandshakeKind, ParticipantId, Signal};
use std::collections::{HashSet, VecDeque};

/// Identity of a handshake message for duplicate suppression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub from: ParticipantId,
    pub kind: HandshakeKind,
    pub timestamp: i64,
}

impl From<&Signal> for DedupKey {
    fn from(signal: &Signal) -> Self {
        Self {
            from: signal.from.clone(),
            kind: signal.kind(),
            timestamp: signal.timestamp,
        }
    }
}

/// Bounded memory of recently processed handshake keys.
///
/// Once `capacity` keys are held, remembering a new one evicts the oldest.
#[derive(Debug)]
pub struct DedupGuard {
    capacity: usize,
    order: VecDeque<DedupKey>,
    seen: HashSet<DedupKey>,
}

impl DedupGuard {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    /// Returns `true` the first time `signal` is seen and remembers it.
    /// A signal whose key is still remembered returns `false`.
    pub fn admit(&mut self, signal: &Signal) -> bool {
        let key = DedupKey::from(signal);
        if self.seen.contains(&key) {
            return false;
        }

        if self.order.len() == self.capacity
            && let Some(oldest) = self.order.pop_front()
        {
            self.seen.remove(&oldest);
        }
        self.order.push_back(key.clone());
        self.seen.insert(key);
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
