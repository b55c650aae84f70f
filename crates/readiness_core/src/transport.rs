//! socket.io (Engine.IO v4) over a plain websocket.
//!
//! Only what the model needs: open the default namespace, answer pings, surface named
//! events, and emit outbound events. Reconnecting is left to whoever owns the transport.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use shared::protocol::{
    decode_frame, Frame, OutboundMessage, ENGINE_PONG_FRAME, SOCKET_CONNECT_FRAME,
};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::ConnectionError;

const INBOUND_BUFFER: usize = 256;

/// Notifications the transport hands to the model, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected,
    Disconnected { reason: String },
    Event { name: String, payload: Value },
}

/// The outbound half of the connection collaborator.
#[async_trait]
pub trait Outbound: Send + Sync {
    fn is_connected(&self) -> bool;
    async fn emit(&self, message: OutboundMessage) -> Result<(), ConnectionError>;
    async fn close(&self) {}
}

pub fn socket_io_url(host: &str, port: u16) -> Result<Url, ConnectionError> {
    let invalid = |reason: String| ConnectionError::InvalidEndpoint {
        host: host.to_string(),
        port,
        reason,
    };
    if host.trim().is_empty() {
        return Err(invalid("host is empty".to_string()));
    }
    let mut url = Url::parse(&format!("ws://{}:{port}/socket.io/", host.trim()))
        .map_err(|err| invalid(err.to_string()))?;
    url.query_pairs_mut()
        .append_pair("EIO", "4")
        .append_pair("transport", "websocket");
    Ok(url)
}

pub struct SocketIoTransport {
    url: Url,
    writer: mpsc::UnboundedSender<Message>,
    connected: Arc<AtomicBool>,
}

impl SocketIoTransport {
    /// Opens the websocket and starts the reader and writer tasks. Inbound notifications
    /// arrive on the returned receiver until the socket ends.
    pub async fn connect(
        host: &str,
        port: u16,
    ) -> Result<(Arc<Self>, mpsc::Receiver<TransportEvent>)> {
        let url = socket_io_url(host, port)?;
        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .with_context(|| format!("failed to connect websocket: {url}"))?;
        info!(%url, "transport: websocket opened");
        let (mut ws_writer, mut ws_reader) = ws_stream.split();

        let (writer, mut outgoing) = mpsc::unbounded_channel::<Message>();
        let (events, inbound) = mpsc::channel(INBOUND_BUFFER);
        let connected = Arc::new(AtomicBool::new(false));

        tokio::spawn(async move {
            while let Some(message) = outgoing.recv().await {
                let closing = matches!(message, Message::Close(_));
                if let Err(err) = ws_writer.send(message).await {
                    warn!(%err, "transport: websocket send failed");
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        let reader_writer = writer.clone();
        let reader_connected = Arc::clone(&connected);
        let reader_url = url.clone();
        tokio::spawn(async move {
            let mut reason = "websocket closed".to_string();
            while let Some(msg) = ws_reader.next().await {
                match msg {
                    Ok(Message::Text(text)) => match decode_frame(&text) {
                        Ok(frame) => {
                            if let Some(ended) = handle_frame(
                                frame,
                                &reader_writer,
                                &reader_connected,
                                &events,
                            )
                            .await
                            {
                                reason = ended;
                                break;
                            }
                        }
                        Err(err) => warn!(%err, "transport: ignoring undecodable frame"),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        error!(%err, "transport: websocket receive failed");
                        reason = format!("websocket receive failed: {err}");
                        break;
                    }
                }
            }
            reader_connected.store(false, Ordering::SeqCst);
            warn!(url = %reader_url, %reason, "transport: disconnected");
            let _ = events.send(TransportEvent::Disconnected { reason }).await;
        });

        Ok((
            Arc::new(Self {
                url,
                writer,
                connected,
            }),
            inbound,
        ))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn send_text(&self, text: String) -> Result<(), ConnectionError> {
        self.writer
            .send(Message::Text(text))
            .map_err(|_| ConnectionError::Closed)
    }
}

/// Returns `Some(reason)` once the session is over.
async fn handle_frame(
    frame: Frame,
    writer: &mpsc::UnboundedSender<Message>,
    connected: &AtomicBool,
    events: &mpsc::Sender<TransportEvent>,
) -> Option<String> {
    match frame {
        Frame::Open(handshake) => {
            debug!(%handshake, "transport: engine.io handshake");
            if writer
                .send(Message::Text(SOCKET_CONNECT_FRAME.to_string()))
                .is_err()
            {
                return Some("websocket writer has shut down".to_string());
            }
        }
        Frame::Ping(_) => {
            if writer
                .send(Message::Text(ENGINE_PONG_FRAME.to_string()))
                .is_err()
            {
                return Some("websocket writer has shut down".to_string());
            }
        }
        Frame::Connect(_) => {
            connected.store(true, Ordering::SeqCst);
            info!("transport: socket.io namespace connected");
            if events.send(TransportEvent::Connected).await.is_err() {
                return Some("model stopped listening".to_string());
            }
        }
        Frame::Event { name, payload } => {
            if events
                .send(TransportEvent::Event { name, payload })
                .await
                .is_err()
            {
                return Some("model stopped listening".to_string());
            }
        }
        Frame::ConnectError(details) => {
            error!(%details, "transport: socket.io connect error");
            return Some(format!("connect error: {details}"));
        }
        Frame::Disconnect => return Some("server disconnected the namespace".to_string()),
        Frame::Close => return Some("server closed the engine.io session".to_string()),
        Frame::Pong(_) | Frame::Noop | Frame::Ack => {}
    }
    None
}

#[async_trait]
impl Outbound for SocketIoTransport {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn emit(&self, message: OutboundMessage) -> Result<(), ConnectionError> {
        if !self.is_connected() {
            return Err(ConnectionError::NotConnected);
        }
        debug!(event = message.event, "transport: emit");
        self.send_text(message.encode())
    }

    async fn close(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            let _ = self.send_text("41".to_string());
        }
        let _ = self.writer.send(Message::Close(None));
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
