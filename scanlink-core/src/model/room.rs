use serde::{Deserialize, Serialize};

/// Per-role membership totals, recomputed from the participant list on every
/// roster broadcast.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomStats {
    pub hosts: usize,
    pub guests: usize,
    pub total: usize,
}
