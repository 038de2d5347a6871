use crate::error::SessionFailure;
use crate::peer::RemoteStream;
use scanlink_core::{ConnectionId, MediaInfo, RoomStats, ScanType};
use std::fmt;
use std::time::Duration;

/// The session's linear happy path plus its side states. Only errors move
/// it backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    ConnectingSignaling,
    SignalingConnected,
    JoiningRoom,
    RoomJoined,
    RequestingMedia,
    MediaReady,
    CreatingPeerConnection,
    PeerConnected,
    Ready,
    Error,
    Disconnected,
    ConnectionFailed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::ConnectingSignaling => "connecting_signaling",
            SessionState::SignalingConnected => "signaling_connected",
            SessionState::JoiningRoom => "joining_room",
            SessionState::RoomJoined => "room_joined",
            SessionState::RequestingMedia => "requesting_media",
            SessionState::MediaReady => "media_ready",
            SessionState::CreatingPeerConnection => "creating_peer_connection",
            SessionState::PeerConnected => "peer_connected",
            SessionState::Ready => "ready",
            SessionState::Error => "error",
            SessionState::Disconnected => "disconnected",
            SessionState::ConnectionFailed => "connection_failed",
        };
        write!(f, "{name}")
    }
}

/// A scan notification as surfaced to the consumer. The receiver owns the
/// display countdown; `duration` is only the sender's suggestion.
#[derive(Debug, Clone)]
pub struct ScanEvent {
    pub scan_type: ScanType,
    pub message: String,
    pub from: ConnectionId,
    pub from_name: String,
    pub duration: Duration,
    pub timestamp: i64,
}

/// What the presentation layer consumes. It never sees the orchestrator's
/// internals, only these.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    Roster {
        participants: Vec<String>,
        stats: RoomStats,
    },
    LocalPreview(MediaInfo),
    /// `None` means the remote stream went away.
    RemoteStream(Option<RemoteStream>),
    ScanReceived(ScanEvent),
    Failed(SessionFailure),
}
