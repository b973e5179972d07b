use crate::media::AudioConstraints;
use crate::transport::TransportConfig;
use huddle_core::utils::{
    DEFAULT_DEDUP_CAPACITY, DEFAULT_NEGOTIATION_TIMEOUT, DEFAULT_TICK_INTERVAL,
};
use std::time::Duration;

pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings for a [`HuddleClient`](crate::HuddleClient) and every room session it runs.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub relay_url: String,
    /// Period of the roster poll and mailbox drain.
    pub tick_interval: Duration,
    pub dedup_capacity: usize,
    /// A link still negotiating after this long is torn down and recreated.
    pub negotiation_timeout: Duration,
    pub request_timeout: Duration,
    pub audio: AudioConstraints,
    pub transport: TransportConfig,
}

impl ClientConfig {
    pub fn with_relay_url(relay_url: impl Into<String>) -> Self {
        Self {
            relay_url: relay_url.into(),
            ..Self::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_url: DEFAULT_RELAY_URL.to_owned(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
            negotiation_timeout: DEFAULT_NEGOTIATION_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            audio: AudioConstraints::default(),
            transport: TransportConfig::default(),
        }
    }
}
