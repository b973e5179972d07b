mod handshake;
mod participant;
mod room;
mod roster;

pub use handshake::{HandshakeKind, HandshakeMessage, IceCandidate, Signal};
pub use participant::{Participant, ParticipantId};
pub use room::RoomCode;
pub use roster::{Roster, RosterEntry};
