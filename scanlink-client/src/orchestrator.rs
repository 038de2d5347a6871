use crate::config::SessionConfig;
use crate::diagnostics::{DiagnosticsSnapshot, probe_health};
use crate::error::{SessionError, SessionFailure};
use crate::media::{LocalMedia, MediaSource, SampleMediaSource};
use crate::peer::{PeerConnection, PeerEvent, RemoteStream};
use crate::signaling::{
    HandshakeMeta, SignalingConnection, SignalingConnector, SignalingSender, WsConnector,
};
use crate::state::{ScanEvent, SessionEvent, SessionState};
use scanlink_core::{
    ClientSignal, ConnectionId, RoomStats, ScanType, ServerSignal, epoch_millis,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;

#[derive(Debug)]
pub enum SessionCommand {
    SendScan {
        scan_type: ScanType,
        message: String,
        duration_ms: Option<u64>,
    },
    Shutdown,
}

/// The consumer's grip on a running session. Dropping it tears the session
/// down.
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    state_rx: watch::Receiver<SessionState>,
    diagnostics_rx: watch::Receiver<DiagnosticsSnapshot>,
    events: Option<mpsc::UnboundedReceiver<SessionEvent>>,
    disposed: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        *self.diagnostics_rx.borrow()
    }

    /// The session's event stream. Yields `None` after the first call.
    pub fn events(&mut self) -> Option<mpsc::UnboundedReceiver<SessionEvent>> {
        self.events.take()
    }

    pub fn send_scan(&self, scan_type: ScanType, message: impl Into<String>) {
        self.send_scan_with_duration(scan_type, message, None);
    }

    pub fn send_scan_with_duration(
        &self,
        scan_type: ScanType,
        message: impl Into<String>,
        duration_ms: Option<u64>,
    ) {
        let _ = self.commands.send(SessionCommand::SendScan {
            scan_type,
            message: message.into(),
            duration_ms,
        });
    }

    pub fn shutdown(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        let _ = self.commands.send(SessionCommand::Shutdown);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Blocks (asynchronously) until the session reaches `target`, or the
    /// timeout passes. Convenience for consumers and tests.
    pub async fn wait_for_state(&mut self, target: SessionState, timeout: Duration) -> bool {
        let reached = tokio::time::timeout(timeout, async {
            loop {
                if *self.state_rx.borrow() == target {
                    return;
                }
                if self.state_rx.changed().await.is_err() {
                    return;
                }
            }
        })
        .await;
        reached.is_ok() && self.state() == target
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.disposed.store(true, Ordering::SeqCst);
        self.task.abort();
    }
}

/// Starts a session on the production transports.
pub fn spawn_session(config: SessionConfig) -> SessionHandle {
    let connector = Arc::new(WsConnector::new(config.server_url.clone()));
    spawn_session_with(config, connector, Arc::new(SampleMediaSource))
}

/// Starts a session with explicit transport and capture seams. Tests and
/// alternative integrations come in through here.
pub fn spawn_session_with(
    config: SessionConfig,
    connector: Arc<dyn SignalingConnector>,
    media_source: Arc<dyn MediaSource>,
) -> SessionHandle {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(SessionState::Idle);
    let (diagnostics_tx, diagnostics_rx) = watch::channel(DiagnosticsSnapshot::default());
    let (peer_event_tx, peer_event_rx) = mpsc::channel(64);
    let disposed = Arc::new(AtomicBool::new(false));

    let orchestrator = Orchestrator {
        config,
        connector,
        media_source,
        disposed: disposed.clone(),
        state: SessionState::Idle,
        state_tx,
        diagnostics: DiagnosticsSnapshot::default(),
        diagnostics_tx,
        events: event_tx,
        commands: Some(command_rx),
        peer_event_tx,
        peer_event_rx: Some(peer_event_rx),
        sender: None,
        connection_attempts: 0,
        connection_id: None,
        participants: Vec::new(),
        participant_count: 0,
        room_stats: RoomStats::default(),
        local_media: None,
        peer: None,
        remote_peer: None,
        is_initiator: false,
        pending_remote: None,
        pending_offer: None,
        pending_candidates: Vec::new(),
        remote_tracks: Vec::new(),
        recreations: 0,
    };

    let task = tokio::spawn(orchestrator.run());

    SessionHandle {
        commands: command_tx,
        state_rx,
        diagnostics_rx,
        events: Some(event_rx),
        disposed,
        task,
    }
}

/// Drives one user's session end to end: transport connect, room join,
/// media acquisition, peer negotiation, steady state. Logically
/// single-threaded — every inbound event is applied atomically against the
/// current state, while the slow stages run as sub-tasks reporting back
/// through channels.
struct Orchestrator {
    config: SessionConfig,
    connector: Arc<dyn SignalingConnector>,
    media_source: Arc<dyn MediaSource>,
    disposed: Arc<AtomicBool>,

    state: SessionState,
    state_tx: watch::Sender<SessionState>,
    diagnostics: DiagnosticsSnapshot,
    diagnostics_tx: watch::Sender<DiagnosticsSnapshot>,
    events: mpsc::UnboundedSender<SessionEvent>,
    commands: Option<mpsc::UnboundedReceiver<SessionCommand>>,
    peer_event_tx: mpsc::Sender<PeerEvent>,
    peer_event_rx: Option<mpsc::Receiver<PeerEvent>>,
    sender: Option<SignalingSender>,

    connection_attempts: u32,
    connection_id: Option<ConnectionId>,
    participants: Vec<String>,
    participant_count: usize,
    room_stats: RoomStats,

    local_media: Option<LocalMedia>,
    peer: Option<PeerConnection>,
    remote_peer: Option<ConnectionId>,
    is_initiator: bool,
    /// Remote we should initiate toward once media is granted.
    pending_remote: Option<ConnectionId>,
    /// Offer that arrived before our media was granted.
    pending_offer: Option<(ConnectionId, String)>,
    /// Candidates that arrived before the peer transport existed.
    pending_candidates: Vec<(String, Option<String>, Option<u16>)>,
    remote_tracks: Vec<Arc<webrtc::track::track_remote::TrackRemote>>,
    recreations: u32,
}

impl Orchestrator {
    async fn run(mut self) {
        let Some(mut commands) = self.commands.take() else {
            return;
        };
        let Some(mut peer_events) = self.peer_event_rx.take() else {
            return;
        };

        info!(
            role = %self.config.role,
            room = %self.config.room_id,
            "session starting"
        );
        self.transition(SessionState::ConnectingSignaling);

        let mut signaling = match self.connect_with_retry().await {
            Ok(connection) => connection,
            Err(err) => {
                self.fail_connectivity(err).await;
                return;
            }
        };
        self.sender = Some(signaling.sender());
        self.set_diag(|d| d.socket_connected = true);
        self.transition(SessionState::SignalingConnected);

        if let Err(err) = self.join_room(&mut signaling).await {
            self.fail(&err);
            return;
        }

        self.transition(SessionState::RequestingMedia);
        let (media_tx, mut media_results) = mpsc::channel(1);
        self.spawn_media_stage(media_tx);

        let mut heartbeat = tokio::time::interval(self.config.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        heartbeat.tick().await;

        loop {
            if self.disposed.load(Ordering::SeqCst) || self.terminal() {
                break;
            }

            tokio::select! {
                signal = signaling.recv() => {
                    match signal {
                        Some(signal) => self.handle_signal(signal).await,
                        None => {
                            if !self.disposed.load(Ordering::SeqCst) {
                                warn!(role = %self.config.role, "signaling transport lost");
                                self.transition(SessionState::Disconnected);
                            }
                            break;
                        }
                    }
                }

                Some(result) = media_results.recv() => {
                    self.handle_media_outcome(result).await;
                }

                Some(event) = peer_events.recv() => {
                    self.handle_peer_event(event).await;
                }

                command = commands.recv() => {
                    match command {
                        Some(command) => {
                            if !self.handle_command(command) {
                                break;
                            }
                        }
                        None => break,
                    }
                }

                _ = heartbeat.tick() => {
                    if self.diagnostics.room_joined {
                        self.send_signal(ClientSignal::Heartbeat {
                            room: Some(self.config.room_id.clone()),
                            role: self.config.role,
                            timestamp: epoch_millis(),
                        });
                    }
                }
            }
        }

        self.disposed.store(true, Ordering::SeqCst);
        if let Some(peer) = self.peer.take() {
            peer.close().await;
        }
        info!(role = %self.config.role, "session closed");
    }

    fn terminal(&self) -> bool {
        matches!(
            self.state,
            SessionState::Error | SessionState::Disconnected | SessionState::ConnectionFailed
        )
    }

    /// Bounded, explicit retry loop: each attempt gets the full handshake
    /// timeout, failures wait out the retry delay, and the attempt counter
    /// rides along in the handshake metadata.
    async fn connect_with_retry(&mut self) -> Result<SignalingConnection, SessionError> {
        let mut last_reason = String::from("no attempt made");

        for attempt in 1..=self.config.connect_attempts {
            if self.disposed.load(Ordering::SeqCst) {
                return Err(SessionError::Transport("session disposed".to_string()));
            }

            self.connection_attempts = attempt;
            info!(role = %self.config.role, attempt, "connecting to signaling server");

            let meta = HandshakeMeta {
                role: self.config.role,
                attempt,
            };
            match tokio::time::timeout(self.config.connect_timeout, self.connector.connect(meta))
                .await
            {
                Ok(Ok(connection)) => return Ok(connection),
                Ok(Err(e)) => {
                    last_reason = e.to_string();
                    warn!(role = %self.config.role, attempt, "connect failed: {last_reason}");
                }
                Err(_) => {
                    last_reason =
                        format!("handshake timed out after {:?}", self.config.connect_timeout);
                    warn!(role = %self.config.role, attempt, "{last_reason}");
                }
            }

            if attempt < self.config.connect_attempts {
                tokio::time::sleep(self.config.retry_delay).await;
            }
        }

        Err(SessionError::Connectivity {
            attempts: self.config.connect_attempts,
            reason: last_reason,
        })
    }

    /// Waits for the relay's welcome, emits the join request and waits for
    /// the membership event naming this connection. No auto-retry here: a
    /// timeout surfaces immediately.
    async fn join_room(
        &mut self,
        signaling: &mut SignalingConnection,
    ) -> Result<(), SessionError> {
        let deadline = tokio::time::Instant::now() + self.config.join_timeout;

        while self.connection_id.is_none() {
            let signal = self.recv_until(signaling, deadline).await?;
            if let ServerSignal::Welcome { connection_id } = signal {
                debug!(role = %self.config.role, %connection_id, "welcome received");
                self.connection_id = Some(connection_id);
            }
        }

        self.transition(SessionState::JoiningRoom);
        self.send_signal(ClientSignal::JoinRoom {
            room: self.config.room_id.clone(),
            user_name: self.config.display_name.clone(),
            role: self.config.role,
            timestamp: epoch_millis(),
        });

        while !self.diagnostics.room_joined {
            let signal = self.recv_until(signaling, deadline).await?;
            self.handle_signal(signal).await;
        }
        Ok(())
    }

    async fn recv_until(
        &self,
        signaling: &mut SignalingConnection,
        deadline: tokio::time::Instant,
    ) -> Result<ServerSignal, SessionError> {
        tokio::time::timeout_at(deadline, signaling.recv())
            .await
            .map_err(|_| SessionError::RoomJoinTimeout {
                timeout: self.config.join_timeout,
            })?
            .ok_or_else(|| {
                SessionError::Transport("signaling connection closed during join".to_string())
            })
    }

    /// The constraint ladder runs as its own task so roster and scan
    /// traffic keeps flowing while capture is negotiated.
    fn spawn_media_stage(&self, results: mpsc::Sender<Result<LocalMedia, SessionError>>) {
        let source = self.media_source.clone();
        let ladder = self.config.media_ladder.clone();
        let disposed = self.disposed.clone();
        let role = self.config.role;

        tokio::spawn(async move {
            let mut tried = 0;
            for constraints in &ladder {
                if disposed.load(Ordering::SeqCst) {
                    return;
                }
                match source.acquire(constraints).await {
                    Ok(media) => {
                        info!(%role, label = constraints.label, "media acquired");
                        let _ = results.send(Ok(media)).await;
                        return;
                    }
                    Err(e) if e.is_hard_denial() => {
                        warn!(%role, "media permission denied, aborting ladder");
                        let _ = results.send(Err(SessionError::MediaDenied)).await;
                        return;
                    }
                    Err(e) => {
                        tried += 1;
                        debug!(%role, label = constraints.label, "constraint set failed: {e}");
                    }
                }
            }
            let _ = results.send(Err(SessionError::MediaExhausted { tried })).await;
        });
    }

    async fn handle_media_outcome(&mut self, result: Result<LocalMedia, SessionError>) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }
        match result {
            Ok(media) => {
                let info = media.info;
                self.local_media = Some(media);
                self.set_diag(|d| d.media_granted = true);
                self.transition(SessionState::MediaReady);

                if self.config.always_show_local_preview || info.video {
                    self.emit(SessionEvent::LocalPreview(info));
                }

                self.send_signal(ClientSignal::MediaReady {
                    room: self.config.room_id.clone(),
                    media_info: info,
                    timestamp: epoch_millis(),
                });

                if let Some(remote) = self.pending_remote.take() {
                    self.start_peer_as_initiator(remote).await;
                } else if let Some((from, sdp)) = self.pending_offer.take() {
                    self.answer_offer(from, sdp).await;
                }
            }
            Err(err) => self.fail(&err),
        }
    }

    async fn handle_signal(&mut self, signal: ServerSignal) {
        match signal {
            ServerSignal::Welcome { connection_id } => {
                // normally consumed during the join phase
                if self.connection_id.is_none() {
                    self.connection_id = Some(connection_id);
                }
            }

            ServerSignal::MembershipChanged {
                user_id,
                user_name,
                participants,
                participant_count,
                room_stats,
                ..
            } => {
                info!(
                    role = %self.config.role,
                    user = %user_name,
                    count = participant_count,
                    "membership changed"
                );
                self.participants = participants.clone();
                self.participant_count = participant_count;
                self.room_stats = room_stats;
                self.emit(SessionEvent::Roster {
                    participants,
                    stats: room_stats,
                });

                if Some(&user_id) == self.connection_id.as_ref() {
                    if !self.diagnostics.room_joined {
                        self.set_diag(|d| d.room_joined = true);
                        self.transition(SessionState::RoomJoined);
                    }
                    // we joined an occupied room: the earlier member
                    // initiates, we wait for their offer
                } else if participant_count >= 2 && self.remote_peer.is_none() {
                    if self.local_media.is_some() {
                        self.start_peer_as_initiator(user_id).await;
                    } else {
                        self.pending_remote = Some(user_id);
                    }
                }
            }

            ServerSignal::UserLeft {
                user_id,
                user_name,
                participants,
                participant_count,
                room_stats,
                ..
            } => {
                info!(
                    role = %self.config.role,
                    user = %user_name,
                    count = participant_count,
                    "user left"
                );
                self.participants = participants.clone();
                self.participant_count = participant_count;
                self.room_stats = room_stats;
                self.emit(SessionEvent::Roster {
                    participants,
                    stats: room_stats,
                });

                if self.pending_remote.as_ref() == Some(&user_id) {
                    self.pending_remote = None;
                }
                if self
                    .pending_offer
                    .as_ref()
                    .is_some_and(|(from, _)| from == &user_id)
                {
                    self.pending_offer = None;
                }
                if self.remote_peer.as_ref() == Some(&user_id) {
                    if let Some(peer) = self.peer.take() {
                        peer.close().await;
                    }
                    self.remote_peer = None;
                    self.is_initiator = false;
                    self.remote_tracks.clear();
                    self.pending_candidates.clear();
                    self.set_diag(|d| {
                        d.peer_connected = false;
                        d.ice_connected = false;
                    });
                    self.emit(SessionEvent::RemoteStream(None));
                }
            }

            ServerSignal::Offer { sdp, from } => {
                debug!(role = %self.config.role, %from, "offer received");
                if self.local_media.is_some() {
                    self.answer_offer(from, sdp).await;
                } else {
                    self.pending_offer = Some((from, sdp));
                }
            }

            ServerSignal::Answer { sdp, from } => {
                debug!(role = %self.config.role, %from, "answer received");
                let Some(peer) = &self.peer else { return };
                if peer.remote() != &from {
                    debug!(%from, "answer from unexpected peer ignored");
                    return;
                }
                if let Err(e) = peer.apply_answer(sdp).await {
                    self.fail(&SessionError::PeerNegotiation(e.to_string()));
                }
            }

            ServerSignal::IceCandidate {
                candidate,
                sdp_mid,
                sdp_m_line_index,
                from,
            } => {
                if let Some(peer) = &self.peer {
                    if peer.remote() == &from {
                        if let Err(e) = peer
                            .add_remote_candidate(candidate, sdp_mid, sdp_m_line_index)
                            .await
                        {
                            warn!(role = %self.config.role, "failed to add candidate: {e}");
                        }
                        return;
                    }
                }
                self.pending_candidates
                    .push((candidate, sdp_mid, sdp_m_line_index));
            }

            ServerSignal::PeerMediaReady {
                user_name,
                media_info,
                ..
            } => {
                debug!(
                    role = %self.config.role,
                    user = %user_name,
                    ?media_info,
                    "peer media ready"
                );
            }

            ServerSignal::ScanNotification {
                scan_type,
                message,
                duration_ms,
                from,
                from_name,
                timestamp,
            } => {
                // guard against accidental self-delivery
                if Some(&from) == self.connection_id.as_ref() {
                    debug!(role = %self.config.role, "ignoring own scan notification");
                    return;
                }
                info!(role = %self.config.role, %scan_type, from = %from_name, "scan received");
                self.emit(SessionEvent::ScanReceived(ScanEvent {
                    scan_type,
                    message,
                    from,
                    from_name,
                    duration: Duration::from_millis(duration_ms),
                    timestamp,
                }));
            }

            ServerSignal::HeartbeatAck { .. } => {
                if !self.diagnostics.server_reachable {
                    self.set_diag(|d| d.server_reachable = true);
                }
            }
        }
    }

    async fn handle_peer_event(&mut self, event: PeerEvent) {
        match event {
            PeerEvent::StateChanged(state) => {
                info!(role = %self.config.role, transport = %state, "peer transport state");
                match state {
                    RTCPeerConnectionState::Connected => {
                        self.set_diag(|d| d.peer_connected = true);
                        if self.state == SessionState::CreatingPeerConnection {
                            self.transition(SessionState::PeerConnected);
                            self.transition(SessionState::Ready);
                        }
                    }
                    RTCPeerConnectionState::Failed => {
                        self.recreate_peer().await;
                    }
                    _ => {}
                }
            }

            PeerEvent::IceStateChanged(state) => {
                debug!(role = %self.config.role, ice = %state, "ice state");
                match state {
                    RTCIceConnectionState::Connected | RTCIceConnectionState::Completed => {
                        self.set_diag(|d| d.ice_connected = true);
                    }
                    RTCIceConnectionState::Failed => {
                        self.restart_ice().await;
                    }
                    _ => {}
                }
            }

            PeerEvent::CandidateGenerated {
                candidate,
                sdp_mid,
                sdp_m_line_index,
            } => {
                debug!(role = %self.config.role, "sending ice candidate");
                self.send_signal(ClientSignal::IceCandidate {
                    room: self.config.room_id.clone(),
                    candidate,
                    sdp_mid,
                    sdp_m_line_index,
                });
            }

            PeerEvent::RemoteTrack(track) => {
                let Some(peer) = self.remote_peer.clone() else {
                    return;
                };
                self.remote_tracks.push(track);
                self.emit(SessionEvent::RemoteStream(Some(RemoteStream {
                    peer,
                    tracks: self.remote_tracks.clone(),
                })));
            }
        }
    }

    /// Returns false when the session should stop.
    fn handle_command(&mut self, command: SessionCommand) -> bool {
        match command {
            SessionCommand::SendScan {
                scan_type,
                message,
                duration_ms,
            } => {
                if self.participant_count <= 1 {
                    // alone in the room: silent no-op, not an error
                    debug!(role = %self.config.role, "scan skipped, nobody else in the room");
                    return true;
                }
                info!(role = %self.config.role, %scan_type, "sending scan notification");
                self.send_signal(ClientSignal::ScanNotification {
                    room: self.config.room_id.clone(),
                    scan_type: Some(scan_type),
                    message: Some(message),
                    duration_ms,
                });
                true
            }
            SessionCommand::Shutdown => {
                info!(role = %self.config.role, "shutdown requested");
                false
            }
        }
    }

    async fn start_peer_as_initiator(&mut self, remote: ConnectionId) {
        self.transition(SessionState::CreatingPeerConnection);
        self.is_initiator = true;
        self.remote_peer = Some(remote.clone());

        if let Err(err) = self.create_peer(remote).await {
            self.fail(&err);
            return;
        }
        self.drain_pending_candidates().await;

        let Some(peer) = &self.peer else { return };
        match peer.create_offer().await {
            Ok(sdp) => {
                info!(role = %self.config.role, "sending offer");
                self.send_signal(ClientSignal::Offer {
                    room: self.config.room_id.clone(),
                    sdp,
                });
            }
            Err(e) => self.fail(&SessionError::PeerNegotiation(e.to_string())),
        }
    }

    async fn answer_offer(&mut self, from: ConnectionId, sdp: String) {
        if self.peer.is_none() {
            self.transition(SessionState::CreatingPeerConnection);
            self.is_initiator = false;
            self.remote_peer = Some(from.clone());
            if let Err(err) = self.create_peer(from.clone()).await {
                self.fail(&err);
                return;
            }
        }

        let Some(peer) = &self.peer else { return };
        if peer.remote() != &from {
            debug!(%from, "offer from unexpected peer ignored");
            return;
        }
        match peer.accept_offer(sdp).await {
            Ok(answer) => {
                info!(role = %self.config.role, "sending answer");
                self.send_signal(ClientSignal::Answer {
                    room: self.config.room_id.clone(),
                    sdp: answer,
                });
            }
            Err(e) => {
                self.fail(&SessionError::PeerNegotiation(e.to_string()));
                return;
            }
        }
        self.drain_pending_candidates().await;
    }

    async fn create_peer(&mut self, remote: ConnectionId) -> Result<(), SessionError> {
        let tracks = self
            .local_media
            .as_ref()
            .map(|media| media.tracks.clone())
            .unwrap_or_default();

        match PeerConnection::new(
            remote,
            self.config.ice_servers.clone(),
            tracks,
            self.peer_event_tx.clone(),
        )
        .await
        {
            Ok(peer) => {
                self.peer = Some(peer);
                Ok(())
            }
            Err(e) => Err(SessionError::PeerNegotiation(e.to_string())),
        }
    }

    async fn drain_pending_candidates(&mut self) {
        let Some(peer) = &self.peer else { return };
        for (candidate, sdp_mid, sdp_m_line_index) in self.pending_candidates.drain(..) {
            if let Err(e) = peer
                .add_remote_candidate(candidate, sdp_mid, sdp_m_line_index)
                .await
            {
                warn!(role = %self.config.role, "failed to add queued candidate: {e}");
            }
        }
    }

    /// Full-transport failure: throw the connection away and build a new
    /// one. Not bounded; every round is logged, and it only surfaces if
    /// the rebuild itself fails.
    async fn recreate_peer(&mut self) {
        let Some(remote) = self.remote_peer.clone() else {
            return;
        };
        self.recreations += 1;
        warn!(
            role = %self.config.role,
            attempt = self.recreations,
            "peer transport failed, recreating"
        );

        if let Some(old) = self.peer.take() {
            old.close().await;
        }
        self.set_diag(|d| {
            d.peer_connected = false;
            d.ice_connected = false;
        });
        if !self.remote_tracks.is_empty() {
            self.remote_tracks.clear();
            self.emit(SessionEvent::RemoteStream(None));
        }

        if let Err(err) = self.create_peer(remote).await {
            self.fail(&err);
            return;
        }

        if self.is_initiator {
            let Some(peer) = &self.peer else { return };
            match peer.create_offer().await {
                Ok(sdp) => {
                    info!(role = %self.config.role, "sending offer after recreation");
                    self.send_signal(ClientSignal::Offer {
                        room: self.config.room_id.clone(),
                        sdp,
                    });
                }
                Err(e) => self.fail(&SessionError::PeerNegotiation(e.to_string())),
            }
        }
    }

    /// ICE-only failure: restart gathering on the existing transport
    /// instead of discarding it. The initiator drives the restart offer;
    /// the responder picks it up through the normal offer path.
    async fn restart_ice(&mut self) {
        if !self.is_initiator {
            info!(role = %self.config.role, "ice failed, waiting for initiator restart");
            return;
        }
        warn!(role = %self.config.role, "ice failed, restarting on existing transport");
        self.set_diag(|d| d.ice_connected = false);

        let Some(peer) = &self.peer else { return };
        match peer.restart_ice().await {
            Ok(sdp) => {
                self.send_signal(ClientSignal::Offer {
                    room: self.config.room_id.clone(),
                    sdp,
                });
            }
            Err(e) => {
                warn!(role = %self.config.role, "ice restart failed: {e}, recreating transport");
                self.recreate_peer().await;
            }
        }
    }

    /// Retry budget spent: the distinct terminal state, with a probed
    /// diagnostics snapshot and remediation for the presentation layer.
    async fn fail_connectivity(&mut self, err: SessionError) {
        if let Some(url) = self.config.health_url() {
            let reachable = probe_health(&url).await;
            self.set_diag(|d| d.server_reachable = reachable);
        }
        let failure =
            SessionFailure::from_error(&err, self.config.role, self.diagnostics);
        error!(
            role = %self.config.role,
            context = %failure.context,
            attempts = self.connection_attempts,
            "connection failed: {}",
            failure.message
        );
        self.transition(SessionState::ConnectionFailed);
        self.emit(SessionEvent::Failed(failure));
    }

    fn fail(&mut self, err: &SessionError) {
        let failure = SessionFailure::from_error(err, self.config.role, self.diagnostics);
        error!(
            role = %self.config.role,
            context = %failure.context,
            "session error: {}",
            failure.message
        );
        self.transition(SessionState::Error);
        self.emit(SessionEvent::Failed(failure));
    }

    fn transition(&mut self, to: SessionState) {
        if self.state == to {
            return;
        }
        let from = self.state;
        info!(
            role = %self.config.role,
            from = %from,
            to = %to,
            timestamp = epoch_millis(),
            "state transition"
        );
        self.state = to;
        let _ = self.state_tx.send(to);
        self.emit(SessionEvent::StateChanged { from, to });
    }

    fn set_diag(&mut self, update: impl FnOnce(&mut DiagnosticsSnapshot)) {
        update(&mut self.diagnostics);
        let _ = self.diagnostics_tx.send(self.diagnostics);
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    fn send_signal(&self, signal: ClientSignal) {
        let Some(sender) = &self.sender else { return };
        if let Err(e) = sender.send(signal) {
            warn!(role = %self.config.role, "failed to send signal: {e}");
        }
    }
}
