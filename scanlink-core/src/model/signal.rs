use crate::model::connection::ConnectionId;
use crate::model::participant::{MediaInfo, Role};
use crate::model::room::RoomStats;
use crate::model::scan::ScanType;
use serde::{Deserialize, Serialize};

/// Everything a client may send over the signaling channel. Every variant
/// except the initial join names the room it concerns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", content = "d", rename_all = "kebab-case")]
pub enum ClientSignal {
    JoinRoom {
        room: String,
        user_name: String,
        role: Role,
        timestamp: i64,
    },
    Offer {
        room: String,
        sdp: String,
    },
    Answer {
        room: String,
        sdp: String,
    },
    IceCandidate {
        room: String,
        candidate: String,
        sdp_mid: Option<String>,
        sdp_m_line_index: Option<u16>,
    },
    MediaReady {
        room: String,
        media_info: MediaInfo,
        timestamp: i64,
    },
    /// `scan_type` and `message` are required by the relay but optional at
    /// the parse layer, so an incomplete payload can be dropped silently
    /// instead of tearing down the whole message.
    ScanNotification {
        room: String,
        scan_type: Option<ScanType>,
        message: Option<String>,
        #[serde(default)]
        duration_ms: Option<u64>,
    },
    Heartbeat {
        room: Option<String>,
        role: Role,
        timestamp: i64,
    },
}

/// Everything the relay may push to a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", content = "d", rename_all = "kebab-case")]
pub enum ServerSignal {
    /// First message after upgrade: the transport-assigned connection id.
    Welcome {
        connection_id: ConnectionId,
    },
    MembershipChanged {
        user_id: ConnectionId,
        user_name: String,
        role: Role,
        participants: Vec<String>,
        participant_count: usize,
        room_stats: RoomStats,
    },
    UserLeft {
        user_id: ConnectionId,
        user_name: String,
        role: Role,
        participants: Vec<String>,
        participant_count: usize,
        room_stats: RoomStats,
    },
    Offer {
        sdp: String,
        from: ConnectionId,
    },
    Answer {
        sdp: String,
        from: ConnectionId,
    },
    IceCandidate {
        candidate: String,
        sdp_mid: Option<String>,
        sdp_m_line_index: Option<u16>,
        from: ConnectionId,
    },
    PeerMediaReady {
        user_id: ConnectionId,
        user_name: String,
        role: Role,
        media_info: MediaInfo,
    },
    ScanNotification {
        scan_type: ScanType,
        message: String,
        duration_ms: u64,
        from: ConnectionId,
        from_name: String,
        timestamp: i64,
    },
    HeartbeatAck {
        timestamp: i64,
        connection_id: ConnectionId,
        server_time: i64,
    },
}
