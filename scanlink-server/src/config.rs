use std::time::Duration;

/// Knobs for the relay's bookkeeping loops. Defaults match the documented
/// sweep cadence: stale participants after 5 minutes without a heartbeat,
/// abandoned-empty rooms after an hour, checked every 2 minutes.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub sweep_interval: Duration,
    pub stale_participant_after: Duration,
    pub empty_room_after: Duration,
    /// Capacity of the relay command channel.
    pub command_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(120),
            stale_participant_after: Duration::from_secs(300),
            empty_room_after: Duration::from_secs(3600),
            command_buffer: 256,
        }
    }
}
