use crate::media::{MediaConstraints, default_ladder};
use scanlink_core::Role;
use std::time::Duration;
use url::Url;

/// Everything one session needs up front. Role is a required input here —
/// the orchestrator never invents one.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket endpoint of the signaling relay, e.g. `ws://host:3000/ws`.
    pub server_url: String,
    pub room_id: String,
    pub display_name: String,
    pub role: Role,
    pub ice_servers: Vec<String>,

    /// Per-attempt signaling handshake timeout.
    pub connect_timeout: Duration,
    pub connect_attempts: u32,
    pub retry_delay: Duration,
    /// How long to wait for the relay to confirm room membership.
    pub join_timeout: Duration,
    pub heartbeat_interval: Duration,

    /// Capability sets tried in order until one is granted.
    pub media_ladder: Vec<MediaConstraints>,
    /// Surface the local preview even for audio-only captures.
    pub always_show_local_preview: bool,
}

impl SessionConfig {
    pub fn new(
        server_url: impl Into<String>,
        room_id: impl Into<String>,
        display_name: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            room_id: room_id.into(),
            display_name: display_name.into(),
            role,
            ice_servers: Vec::new(),
            connect_timeout: Duration::from_secs(30),
            connect_attempts: 5,
            retry_delay: Duration::from_secs(2),
            join_timeout: Duration::from_secs(15),
            heartbeat_interval: Duration::from_secs(30),
            media_ladder: default_ladder(),
            always_show_local_preview: false,
        }
    }

    /// The relay's health endpoint, derived from the signaling URL. Used as
    /// the `server_reachable` diagnostic probe.
    pub fn health_url(&self) -> Option<String> {
        let mut url = Url::parse(&self.server_url).ok()?;
        let scheme = match url.scheme() {
            "wss" | "https" => "https",
            _ => "http",
        };
        url.set_scheme(scheme).ok()?;
        url.set_path("/health");
        url.set_query(None);
        Some(url.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_url_derived_from_ws_url() {
        let config = SessionConfig::new("ws://relay:3000/ws", "R1", "Alice", Role::Host);
        assert_eq!(
            config.health_url().as_deref(),
            Some("http://relay:3000/health")
        );

        let secure = SessionConfig::new("wss://relay/ws", "R1", "Alice", Role::Host);
        assert_eq!(secure.health_url().as_deref(), Some("https://relay/health"));
    }
}
