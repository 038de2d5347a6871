use crate::error::SessionError;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use scanlink_core::{ClientSignal, Role, ServerSignal, epoch_millis};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};
use url::Url;

/// Diagnostic metadata tacked onto the handshake URL. Never authorization.
#[derive(Debug, Clone, Copy)]
pub struct HandshakeMeta {
    pub role: Role,
    pub attempt: u32,
}

/// Cloneable send half of a signaling connection.
#[derive(Clone)]
pub struct SignalingSender {
    tx: mpsc::UnboundedSender<ClientSignal>,
}

impl SignalingSender {
    pub fn send(&self, signal: ClientSignal) -> Result<(), SessionError> {
        self.tx
            .send(signal)
            .map_err(|_| SessionError::Transport("signaling channel closed".to_string()))
    }
}

/// One live signaling channel: a sink of outbound signals and a stream of
/// inbound ones. The transport behind it is invisible to the orchestrator;
/// tests hand it bare channel pairs.
pub struct SignalingConnection {
    out_tx: mpsc::UnboundedSender<ClientSignal>,
    in_rx: mpsc::UnboundedReceiver<ServerSignal>,
    tasks: Vec<JoinHandle<()>>,
}

impl SignalingConnection {
    /// Wrap raw channel halves; used by in-process transports.
    pub fn from_channels(
        out_tx: mpsc::UnboundedSender<ClientSignal>,
        in_rx: mpsc::UnboundedReceiver<ServerSignal>,
    ) -> Self {
        Self {
            out_tx,
            in_rx,
            tasks: Vec::new(),
        }
    }

    pub fn sender(&self) -> SignalingSender {
        SignalingSender {
            tx: self.out_tx.clone(),
        }
    }

    pub fn send(&self, signal: ClientSignal) -> Result<(), SessionError> {
        self.sender().send(signal)
    }

    /// `None` means the transport is gone.
    pub async fn recv(&mut self) -> Option<ServerSignal> {
        self.in_rx.recv().await
    }
}

impl Drop for SignalingConnection {
    fn drop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

/// Seam the orchestrator dials through, so tests can swap the network out.
#[async_trait]
pub trait SignalingConnector: Send + Sync {
    async fn connect(&self, meta: HandshakeMeta) -> Result<SignalingConnection, SessionError>;
}

/// Production connector: a tokio-tungstenite WebSocket with a writer task
/// draining the outbound queue and a reader task parsing inbound signals.
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl SignalingConnector for WsConnector {
    async fn connect(&self, meta: HandshakeMeta) -> Result<SignalingConnection, SessionError> {
        let url = handshake_url(&self.url, meta)?;
        let (ws, _) = connect_async(url.as_str()).await.map_err(|e| {
            SessionError::Transport(format!("websocket connect failed: {e}"))
        })?;
        debug!(%url, "signaling websocket connected");

        let (mut write, mut read) = ws.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientSignal>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<ServerSignal>();

        let writer = tokio::spawn(async move {
            while let Some(signal) = out_rx.recv().await {
                let Ok(text) = serde_json::to_string(&signal) else {
                    continue;
                };
                if write.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        });

        let reader = tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ServerSignal>(&text) {
                            Ok(signal) => {
                                if in_tx.send(signal).is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!("unparseable server signal dropped: {e}"),
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        debug!("signaling websocket error: {e}");
                        break;
                    }
                }
            }
            // in_tx drops here; the orchestrator reads the closed stream
            // as transport loss
        });

        Ok(SignalingConnection {
            out_tx,
            in_rx,
            tasks: vec![writer, reader],
        })
    }
}

fn handshake_url(base: &str, meta: HandshakeMeta) -> Result<Url, SessionError> {
    let mut url = Url::parse(base)
        .map_err(|e| SessionError::Transport(format!("invalid signaling url {base}: {e}")))?;
    url.query_pairs_mut()
        .append_pair("client", "scanlink-client")
        .append_pair("role", &meta.role.to_string())
        .append_pair("timestamp", &epoch_millis().to_string())
        .append_pair("attempt", &meta.attempt.to_string());
    Ok(url)
}
