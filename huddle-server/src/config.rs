use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Relay server configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Members unseen for this long are removed from their rooms.
    /// `None` disables liveness tracking entirely.
    pub member_ttl: Option<Duration>,
    pub reap_interval: Duration,
}

impl RelayConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            member_ttl: None,
            reap_interval: Duration::from_secs(10),
        }
    }
}
