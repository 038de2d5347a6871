mod config;
mod http;
mod relay;
mod room;
mod signaling;

pub use config::ServerConfig;
pub use http::{AppState, router};
pub use relay::{Relay, RelayCommand, RelayHandle, command_for, spawn_relay};
pub use room::{
    MediaReadyBroadcast, Participant, RegistrySnapshot, Room, RoomRegistry, RoomSummary,
    RosterBroadcast, SweepOutcome,
};
pub use signaling::{SignalingService, SignalingSink, ws_handler};
