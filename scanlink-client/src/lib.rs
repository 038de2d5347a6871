mod config;
mod diagnostics;
mod error;
mod media;
mod orchestrator;
mod peer;
mod signaling;
mod state;

pub use config::SessionConfig;
pub use diagnostics::{DiagnosticsSnapshot, probe_health, remediation};
pub use error::{ErrorContext, SessionError, SessionFailure};
pub use media::{
    LocalMedia, MediaConstraints, MediaError, MediaSource, SampleMediaSource, default_ladder,
};
pub use orchestrator::{SessionCommand, SessionHandle, spawn_session, spawn_session_with};
pub use peer::{PeerConnection, PeerEvent, RemoteStream};
pub use signaling::{
    HandshakeMeta, SignalingConnection, SignalingConnector, SignalingSender, WsConnector,
};
pub use state::{ScanEvent, SessionEvent, SessionState};
