use crate::config::ServerConfig;
use crate::relay::RelayCommand;
use crate::room::{RegistrySnapshot, RoomRegistry, RosterBroadcast};
use crate::signaling::SignalingSink;
use scanlink_core::{
    ConnectionId, DEFAULT_SCAN_DURATION_MS, MediaInfo, Role, ScanType, ServerSignal, epoch_millis,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Cloneable sender half of the relay. Everything that wants to talk to the
/// registry goes through this.
#[derive(Clone)]
pub struct RelayHandle {
    tx: mpsc::Sender<RelayCommand>,
}

impl RelayHandle {
    pub async fn send(&self, command: RelayCommand) {
        if self.tx.send(command).await.is_err() {
            warn!("relay task is gone, dropping command");
        }
    }

    pub async fn snapshot(&self) -> Option<RegistrySnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(RelayCommand::Snapshot { reply }).await;
        rx.await.ok()
    }
}

/// The signaling relay: one task owning the room registry, draining commands
/// one at a time and fanning resulting signals out through the sink. The
/// sweep shares the same loop, so no mutation ever interleaves with another
/// on the same registry.
pub struct Relay {
    registry: RoomRegistry,
    command_rx: mpsc::Receiver<RelayCommand>,
    sink: Arc<dyn SignalingSink>,
    config: ServerConfig,
}

/// Builds the relay around a fresh registry and spawns its event loop,
/// returning the handle commands are sent through.
pub fn spawn_relay(config: ServerConfig, sink: Arc<dyn SignalingSink>) -> RelayHandle {
    let (tx, rx) = mpsc::channel(config.command_buffer);
    let relay = Relay::new(RoomRegistry::new(), rx, sink, config);
    tokio::spawn(relay.run());
    RelayHandle { tx }
}

impl Relay {
    pub fn new(
        registry: RoomRegistry,
        command_rx: mpsc::Receiver<RelayCommand>,
        sink: Arc<dyn SignalingSink>,
        config: ServerConfig,
    ) -> Self {
        Self {
            registry,
            command_rx,
            sink,
            config,
        }
    }

    pub async fn run(mut self) {
        info!("relay event loop started");

        let mut sweep = tokio::time::interval(self.config.sweep_interval);
        sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // the first tick of an interval fires immediately
        sweep.tick().await;

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("command channel closed, shutting relay down");
                            break;
                        }
                    }
                }

                _ = sweep.tick() => {
                    self.sweep().await;
                }
            }
        }

        info!("relay event loop finished");
    }

    async fn handle_command(&mut self, command: RelayCommand) {
        match command {
            RelayCommand::Join {
                from,
                room,
                user_name,
                role,
            } => self.handle_join(from, room, user_name, role).await,

            RelayCommand::Offer { from, room, sdp } => {
                debug!(%from, room = %room, "relaying offer");
                self.forward(&from, &room, ServerSignal::Offer {
                    sdp,
                    from: from.clone(),
                })
                .await;
            }

            RelayCommand::Answer { from, room, sdp } => {
                debug!(%from, room = %room, "relaying answer");
                self.forward(&from, &room, ServerSignal::Answer {
                    sdp,
                    from: from.clone(),
                })
                .await;
            }

            RelayCommand::IceCandidate {
                from,
                room,
                candidate,
                sdp_mid,
                sdp_m_line_index,
            } => {
                self.forward(&from, &room, ServerSignal::IceCandidate {
                    candidate,
                    sdp_mid,
                    sdp_m_line_index,
                    from: from.clone(),
                })
                .await;
            }

            RelayCommand::MediaReady {
                from,
                room,
                media_info,
            } => self.handle_media_ready(from, room, media_info).await,

            RelayCommand::ScanNotification {
                from,
                room,
                scan_type,
                message,
                duration_ms,
            } => {
                self.handle_scan(from, room, scan_type, message, duration_ms)
                    .await
            }

            RelayCommand::Heartbeat { from, timestamp } => {
                self.registry.heartbeat(&from, Instant::now());
                self.sink
                    .deliver(from.clone(), ServerSignal::HeartbeatAck {
                        timestamp,
                        connection_id: from,
                        server_time: epoch_millis(),
                    })
                    .await;
            }

            RelayCommand::Disconnect { from } => {
                info!(%from, "connection closed");
                if let Some(broadcast) = self.registry.leave(&from, Instant::now()) {
                    self.broadcast_user_left(broadcast).await;
                }
            }

            RelayCommand::Snapshot { reply } => {
                let _ = reply.send(self.registry.snapshot());
            }
        }
    }

    async fn handle_join(&mut self, from: ConnectionId, room: String, user_name: String, role: Role) {
        info!(%from, room = %room, user = %user_name, %role, "join request");

        let (prior_leave, joined) =
            self.registry
                .join(from, &room, user_name, role, Instant::now());

        if let Some(broadcast) = prior_leave {
            self.broadcast_user_left(broadcast).await;
        }

        let Some(broadcast) = joined else { return };
        let signal = ServerSignal::MembershipChanged {
            user_id: broadcast.user_id,
            user_name: broadcast.user_name,
            role: broadcast.role,
            participants: broadcast.participants,
            participant_count: broadcast.participant_count,
            room_stats: broadcast.room_stats,
        };
        self.broadcast(&broadcast.recipients, signal).await;
    }

    async fn handle_media_ready(&mut self, from: ConnectionId, room: String, media_info: MediaInfo) {
        if !self.registry.is_member(&from, &room) {
            debug!(%from, room = %room, "media-ready from non-member dropped");
            return;
        }
        let Some(broadcast) = self.registry.set_media_ready(&from, media_info) else {
            return;
        };
        let signal = ServerSignal::PeerMediaReady {
            user_id: broadcast.user_id,
            user_name: broadcast.user_name,
            role: broadcast.role,
            media_info: broadcast.media_info,
        };
        self.broadcast(&broadcast.recipients, signal).await;
    }

    /// Scan notifications are best-effort: a payload from a non-member or
    /// one missing its type or message is dropped without any reply.
    async fn handle_scan(
        &mut self,
        from: ConnectionId,
        room: String,
        scan_type: Option<ScanType>,
        message: Option<String>,
        duration_ms: Option<u64>,
    ) {
        if !self.registry.is_member(&from, &room) {
            debug!(%from, room = %room, "scan from non-member dropped");
            return;
        }
        let (Some(scan_type), Some(message)) = (scan_type, message) else {
            debug!(%from, "scan missing required fields, dropped");
            return;
        };
        if message.is_empty() {
            debug!(%from, "scan with empty message dropped");
            return;
        }

        let from_name = self.registry.display_name(&from).unwrap_or_default();
        let recipients = self.registry.relay_targets(&from, &room);
        debug!(%from, %scan_type, recipients = recipients.len(), "relaying scan notification");

        let signal = ServerSignal::ScanNotification {
            scan_type,
            message,
            duration_ms: duration_ms.unwrap_or(DEFAULT_SCAN_DURATION_MS),
            from,
            from_name,
            timestamp: epoch_millis(),
        };
        self.broadcast(&recipients, signal).await;
    }

    async fn sweep(&mut self) {
        let outcome = self.registry.sweep(
            Instant::now(),
            self.config.stale_participant_after,
            self.config.empty_room_after,
        );
        for broadcast in outcome.stale_leaves {
            self.broadcast_user_left(broadcast).await;
        }
    }

    /// Sends a relayed payload to every other member of the sender's room.
    /// Senders never hear their own traffic back.
    async fn forward(&self, from: &ConnectionId, room: &str, signal: ServerSignal) {
        let recipients = self.registry.relay_targets(from, room);
        if recipients.is_empty() {
            debug!(%from, room = %room, "no relay targets, dropping payload");
            return;
        }
        self.broadcast(&recipients, signal).await;
    }

    async fn broadcast(&self, recipients: &[ConnectionId], signal: ServerSignal) {
        for recipient in recipients {
            self.sink.deliver(recipient.clone(), signal.clone()).await;
        }
    }

    async fn broadcast_user_left(&self, broadcast: RosterBroadcast) {
        let signal = ServerSignal::UserLeft {
            user_id: broadcast.user_id,
            user_name: broadcast.user_name,
            role: broadcast.role,
            participants: broadcast.participants,
            participant_count: broadcast.participant_count,
            room_stats: broadcast.room_stats,
        };
        self.broadcast(&broadcast.recipients, signal).await;
    }
}
