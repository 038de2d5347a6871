use crate::error::ErrorContext;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// The six boolean milestones used to explain connection problems. Travels
/// with every surfaced error and is readable at any time through the
/// session handle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticsSnapshot {
    pub server_reachable: bool,
    pub socket_connected: bool,
    pub room_joined: bool,
    pub media_granted: bool,
    pub peer_connected: bool,
    pub ice_connected: bool,
}

/// Context-keyed remediation text shown next to a surfaced error.
pub fn remediation(context: ErrorContext) -> Vec<String> {
    let suggestions: &[&str] = match context {
        ErrorContext::SignalingConnect => &[
            "Check that the signaling server address is correct and the server is running",
            "Verify the network allows WebSocket connections to the server port",
            "If the page is served over https, the signaling URL must use wss://",
        ],
        ErrorContext::RoomJoin => &[
            "Confirm the room identifier matches the one the other party is using",
            "The server accepted the connection but never confirmed membership; check server logs",
        ],
        ErrorContext::MediaAccess => &[
            "Allow camera and microphone access in the browser or OS settings",
            "Close other applications that may be holding the camera",
            "Try again with a different capture device selected",
        ],
        ErrorContext::PeerNegotiation => &[
            "Both parties may be behind restrictive NATs; configure a TURN server",
            "Rejoin the room to restart negotiation from a clean state",
        ],
        ErrorContext::Signaling => &[
            "The signaling connection dropped; check network stability and rejoin",
        ],
    };
    suggestions.iter().map(|s| s.to_string()).collect()
}

/// Connectivity self-check against the relay's health endpoint. Feeds the
/// `server_reachable` flag when diagnosing failures.
pub async fn probe_health(url: &str) -> bool {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
    {
        Ok(client) => client,
        Err(_) => return false,
    };

    match client.get(url).send().await {
        Ok(response) => response.status().is_success(),
        Err(e) => {
            debug!("health probe failed: {e}");
            false
        }
    }
}
