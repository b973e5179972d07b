use chrono::Utc;
use std::time::Duration;

pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun1.l.google.com:19302";

/// Poll period for roster refresh and mailbox draining.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// How many recent handshake keys the client remembers.
pub const DEFAULT_DEDUP_CAPACITY: usize = 100;

pub const DEFAULT_NEGOTIATION_TIMEOUT: Duration = Duration::from_secs(30);

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
