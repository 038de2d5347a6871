use anyhow::{Context, Result};
use scanlink_core::ConnectionId;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::offer_answer_options::RTCOfferOptions;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

/// Transport-level happenings, pushed into the orchestrator's event loop.
pub enum PeerEvent {
    StateChanged(RTCPeerConnectionState),
    IceStateChanged(RTCIceConnectionState),
    CandidateGenerated {
        candidate: String,
        sdp_mid: Option<String>,
        sdp_m_line_index: Option<u16>,
    },
    RemoteTrack(Arc<TrackRemote>),
}

impl fmt::Debug for PeerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerEvent::StateChanged(s) => write!(f, "StateChanged({s})"),
            PeerEvent::IceStateChanged(s) => write!(f, "IceStateChanged({s})"),
            PeerEvent::CandidateGenerated { .. } => write!(f, "CandidateGenerated"),
            PeerEvent::RemoteTrack(track) => write!(f, "RemoteTrack({})", track.kind()),
        }
    }
}

/// All remote tracks of one peer, aggregated into a single handle for the
/// consumer's callback.
#[derive(Clone)]
pub struct RemoteStream {
    pub peer: ConnectionId,
    pub tracks: Vec<Arc<TrackRemote>>,
}

impl fmt::Debug for RemoteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteStream")
            .field("peer", &self.peer)
            .field("tracks", &self.tracks.len())
            .finish()
    }
}

/// Exactly one direct media transport toward one remote peer. The relay is
/// only its side-channel; media content never passes through here untyped.
pub struct PeerConnection {
    remote: ConnectionId,
    pc: Arc<RTCPeerConnection>,
}

impl PeerConnection {
    /// Builds the transport and attaches every local track before any
    /// negotiation message can exist.
    pub async fn new(
        remote: ConnectionId,
        ice_servers: Vec<String>,
        local_tracks: Vec<Arc<dyn TrackLocal + Send + Sync>>,
        event_tx: mpsc::Sender<PeerEvent>,
    ) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let ice_servers = if ice_servers.is_empty() {
            vec![]
        } else {
            vec![RTCIceServer {
                urls: ice_servers,
                ..Default::default()
            }]
        };

        let rtc_config = RTCConfiguration {
            ice_servers,
            ..Default::default()
        };

        let pc = Arc::new(api.new_peer_connection(rtc_config).await?);

        for track in &local_tracks {
            pc.add_track(Arc::clone(track))
                .await
                .context("failed to attach local track")?;
        }

        let state_tx = event_tx.clone();
        pc.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
            let tx = state_tx.clone();
            Box::pin(async move {
                debug!("peer connection state: {s}");
                let _ = tx.send(PeerEvent::StateChanged(s)).await;
            })
        }));

        let ice_state_tx = event_tx.clone();
        pc.on_ice_connection_state_change(Box::new(move |s: RTCIceConnectionState| {
            let tx = ice_state_tx.clone();
            Box::pin(async move {
                let _ = tx.send(PeerEvent::IceStateChanged(s)).await;
            })
        }));

        // Trickle ICE: each candidate travels as soon as it is produced.
        let candidate_tx = event_tx.clone();
        pc.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = candidate_tx.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let _ = tx
                    .send(PeerEvent::CandidateGenerated {
                        candidate: init.candidate,
                        sdp_mid: init.sdp_mid,
                        sdp_m_line_index: init.sdp_mline_index,
                    })
                    .await;
            })
        }));

        let track_tx = event_tx.clone();
        pc.on_track(Box::new(move |track, _receiver, _transceiver| {
            let tx = track_tx.clone();
            Box::pin(async move {
                info!(kind = %track.kind(), "remote track received");
                let _ = tx.send(PeerEvent::RemoteTrack(track)).await;
            })
        }));

        Ok(Self { remote, pc })
    }

    pub fn remote(&self) -> &ConnectionId {
        &self.remote
    }

    /// Initiator half: produce an offer and pin it as the local description.
    pub async fn create_offer(&self) -> Result<String> {
        let offer = self
            .pc
            .create_offer(None)
            .await
            .context("failed to create offer")?;
        self.pc
            .set_local_description(offer.clone())
            .await
            .context("failed to set local description")?;
        Ok(offer.sdp)
    }

    /// Responder half: apply the remote offer and answer it.
    pub async fn accept_offer(&self, sdp: String) -> Result<String> {
        let offer = RTCSessionDescription::offer(sdp)?;
        self.pc
            .set_remote_description(offer)
            .await
            .context("failed to set remote offer")?;

        let answer = self
            .pc
            .create_answer(None)
            .await
            .context("failed to create answer")?;
        self.pc
            .set_local_description(answer.clone())
            .await
            .context("failed to set local description")?;
        Ok(answer.sdp)
    }

    pub async fn apply_answer(&self, sdp: String) -> Result<()> {
        let answer = RTCSessionDescription::answer(sdp)?;
        self.pc
            .set_remote_description(answer)
            .await
            .context("failed to set remote answer")?;
        Ok(())
    }

    pub async fn add_remote_candidate(
        &self,
        candidate: String,
        sdp_mid: Option<String>,
        sdp_m_line_index: Option<u16>,
    ) -> Result<()> {
        self.pc
            .add_ice_candidate(RTCIceCandidateInit {
                candidate,
                sdp_mid,
                sdp_mline_index: sdp_m_line_index,
                username_fragment: None,
            })
            .await
            .context("failed to add remote candidate")?;
        Ok(())
    }

    /// Restart ICE gathering on the existing transport, without discarding
    /// it. The fresh offer travels through the relay like the first one.
    pub async fn restart_ice(&self) -> Result<String> {
        let offer = self
            .pc
            .create_offer(Some(RTCOfferOptions {
                ice_restart: true,
                ..Default::default()
            }))
            .await
            .context("failed to create ice-restart offer")?;
        self.pc
            .set_local_description(offer.clone())
            .await
            .context("failed to set ice-restart description")?;
        Ok(offer.sdp)
    }

    pub async fn close(&self) {
        if let Err(e) = self.pc.close().await {
            debug!("error closing peer connection: {e}");
        }
    }
}
