pub mod model;

pub use model::{
    ClientSignal, ConnectionId, DEFAULT_SCAN_DURATION_MS, MediaInfo, MediaState, Role, RoomStats,
    ScanType, ServerSignal, epoch_millis,
};
