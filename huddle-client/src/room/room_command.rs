use crate::error::CallError;
use crate::room::CallSnapshot;
use tokio::sync::oneshot;

/// Requests from a [`HuddleClient`](crate::HuddleClient) to one room session.
#[derive(Debug)]
pub enum RoomCommand {
    /// Acquire the microphone and enter the room's call.
    StartCall {
        reply: oneshot::Sender<Result<(), CallError>>,
    },

    /// Close every peer link and leave the call, staying in the room.
    EndCall {
        reply: oneshot::Sender<Result<(), CallError>>,
    },

    /// End any call, leave the room and stop the session.
    Leave { reply: oneshot::Sender<()> },

    Snapshot { reply: oneshot::Sender<CallSnapshot> },
}
