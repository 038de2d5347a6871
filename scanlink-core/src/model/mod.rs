mod connection;
mod participant;
mod room;
mod scan;
mod signal;
mod time;

pub use connection::ConnectionId;
pub use participant::{MediaInfo, MediaState, Role};
pub use room::RoomStats;
pub use scan::{DEFAULT_SCAN_DURATION_MS, ScanType};
pub use signal::{ClientSignal, ServerSignal};
pub use time::epoch_millis;
