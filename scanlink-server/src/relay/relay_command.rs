use crate::room::RegistrySnapshot;
use scanlink_core::{ClientSignal, ConnectionId, MediaInfo, Role, ScanType};
use tokio::sync::oneshot;

/// Commands entering the relay from signaling connections (and the
/// introspection surface). One mpsc feeds one relay task, which is what
/// serializes all room mutations.
#[derive(Debug)]
pub enum RelayCommand {
    Join {
        from: ConnectionId,
        room: String,
        user_name: String,
        role: Role,
    },
    Offer {
        from: ConnectionId,
        room: String,
        sdp: String,
    },
    Answer {
        from: ConnectionId,
        room: String,
        sdp: String,
    },
    IceCandidate {
        from: ConnectionId,
        room: String,
        candidate: String,
        sdp_mid: Option<String>,
        sdp_m_line_index: Option<u16>,
    },
    MediaReady {
        from: ConnectionId,
        room: String,
        media_info: MediaInfo,
    },
    ScanNotification {
        from: ConnectionId,
        room: String,
        scan_type: Option<ScanType>,
        message: Option<String>,
        duration_ms: Option<u64>,
    },
    Heartbeat {
        from: ConnectionId,
        timestamp: i64,
    },
    /// Transport-level disconnect; the relay turns it into a leave.
    Disconnect {
        from: ConnectionId,
    },
    Snapshot {
        reply: oneshot::Sender<RegistrySnapshot>,
    },
}

/// Maps a parsed inbound signal to its relay command. Shared between the
/// WebSocket handler and in-process test transports.
pub fn command_for(from: ConnectionId, signal: ClientSignal) -> RelayCommand {
    match signal {
        ClientSignal::JoinRoom {
            room,
            user_name,
            role,
            ..
        } => RelayCommand::Join {
            from,
            room,
            user_name,
            role,
        },
        ClientSignal::Offer { room, sdp } => RelayCommand::Offer { from, room, sdp },
        ClientSignal::Answer { room, sdp } => RelayCommand::Answer { from, room, sdp },
        ClientSignal::IceCandidate {
            room,
            candidate,
            sdp_mid,
            sdp_m_line_index,
        } => RelayCommand::IceCandidate {
            from,
            room,
            candidate,
            sdp_mid,
            sdp_m_line_index,
        },
        ClientSignal::MediaReady {
            room, media_info, ..
        } => RelayCommand::MediaReady {
            from,
            room,
            media_info,
        },
        ClientSignal::ScanNotification {
            room,
            scan_type,
            message,
            duration_ms,
        } => RelayCommand::ScanNotification {
            from,
            room,
            scan_type,
            message,
            duration_ms,
        },
        ClientSignal::Heartbeat { timestamp, .. } => RelayCommand::Heartbeat { from, timestamp },
    }
}
