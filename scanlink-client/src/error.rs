use crate::diagnostics::{DiagnosticsSnapshot, remediation};
use scanlink_core::Role;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Stable tag identifying which stage an error came out of. Keys the
/// remediation suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorContext {
    SignalingConnect,
    RoomJoin,
    MediaAccess,
    PeerNegotiation,
    Signaling,
}

impl ErrorContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorContext::SignalingConnect => "signaling-connect",
            ErrorContext::RoomJoin => "room-join",
            ErrorContext::MediaAccess => "media-access",
            ErrorContext::PeerNegotiation => "peer-negotiation",
            ErrorContext::Signaling => "signaling",
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("signaling server unreachable after {attempts} attempts: {reason}")]
    Connectivity { attempts: u32, reason: String },

    #[error("room join was not confirmed within {timeout:?}")]
    RoomJoinTimeout { timeout: Duration },

    /// The user (or platform) denied capture outright.
    #[error("camera/microphone access was denied")]
    MediaDenied,

    /// Every rung of the constraint ladder failed for a recoverable reason.
    #[error("no usable media configuration ({tried} constraint sets failed)")]
    MediaExhausted { tried: usize },

    #[error("peer negotiation failed: {0}")]
    PeerNegotiation(String),

    #[error("signaling transport error: {0}")]
    Transport(String),
}

impl SessionError {
    pub fn context(&self) -> ErrorContext {
        match self {
            SessionError::Connectivity { .. } => ErrorContext::SignalingConnect,
            SessionError::RoomJoinTimeout { .. } => ErrorContext::RoomJoin,
            SessionError::MediaDenied | SessionError::MediaExhausted { .. } => {
                ErrorContext::MediaAccess
            }
            SessionError::PeerNegotiation(_) => ErrorContext::PeerNegotiation,
            SessionError::Transport(_) => ErrorContext::Signaling,
        }
    }

    pub fn recoverable(&self) -> bool {
        !matches!(self, SessionError::MediaDenied)
    }
}

/// The payload every surfaced failure carries, enough for a presentation
/// layer to render actionable guidance without knowing the core.
#[derive(Debug, Clone)]
pub struct SessionFailure {
    pub context: ErrorContext,
    pub message: String,
    pub recoverable: bool,
    pub role: Role,
    pub diagnostics: DiagnosticsSnapshot,
    pub suggestions: Vec<String>,
}

impl SessionFailure {
    pub fn from_error(error: &SessionError, role: Role, diagnostics: DiagnosticsSnapshot) -> Self {
        let context = error.context();
        Self {
            context,
            message: error.to_string(),
            recoverable: error.recoverable(),
            role,
            diagnostics,
            suggestions: remediation(context),
        }
    }
}
