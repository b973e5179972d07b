mod roster_store;
mod signal_mailbox;

pub use roster_store::*;
pub use signal_mailbox::*;
