mod active_call;
mod call_event;
mod room_command;
mod room_session;

pub use call_event::{CallEvent, CallSnapshot, LinkSummary};
pub use room_command::RoomCommand;
pub use room_session::{RoomSession, SessionServices};
