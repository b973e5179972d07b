mod client;
mod config;
mod dedup;
mod error;
mod media;
mod peer_link;
mod reconcile;
mod relay;
mod room;
mod transport;

pub use client::*;
pub use config::*;
pub use dedup::*;
pub use error::*;
pub use media::*;
pub use peer_link::*;
pub use reconcile::*;
pub use relay::*;
pub use room::*;
pub use transport::*;
