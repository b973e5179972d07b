pub use huddle_core::model::{ParticipantId, RoomCode};

pub mod model {
    pub use huddle_core::model::*;
}

pub mod wire {
    pub use huddle_core::wire::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use huddle_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use huddle_client::*;
}
