//! WebSocket host channel: the production transport adapter.
//!
//! This module adapts the generic `HostChannel` contract — send an
//! envelope, observe every inbound message, learn about teardown — to
//! the concrete host API available to an out-of-page client: a
//! WebSocket connection speaking JSON text frames.
//!
//! # Per-connection anatomy
//!
//! The connected stream is split into independently owned halves:
//!
//! - The **sink** (write half) lives behind an async mutex so any
//!   session can send; envelopes are serialized to JSON text frames.
//! - The **read loop** runs on its own task: every inbound text frame
//!   is parsed to raw JSON and fanned out on a broadcast stream that
//!   all sessions subscribe to.  Undecodable frames are logged and
//!   dropped; the channel survives them.
//! - When the host closes the connection (Close frame, protocol end,
//!   or read error), the read loop flips the teardown watch exactly
//!   once and exits.  Sends attempted after that fail with
//!   [`ChannelError::Closed`].

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch, Mutex};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message as WsMessage},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

use sdui_core::OutboundEnvelope;

use crate::application::transport::{ChannelError, HostChannel};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Serializes an envelope into the text frame the host expects.
fn envelope_to_frame(envelope: &OutboundEnvelope) -> Result<WsMessage, ChannelError> {
    serde_json::to_string(envelope)
        .map(WsMessage::Text)
        .map_err(|e| ChannelError::Send(format!("envelope serialization failed: {e}")))
}

/// The WebSocket-backed host channel shared by all sessions in the
/// process.
pub struct WsHostChannel {
    sink: Mutex<WsSink>,
    inbound: broadcast::Sender<Value>,
    teardown: watch::Sender<bool>,
}

impl WsHostChannel {
    /// Connects to the host channel endpoint and starts the read loop.
    ///
    /// `inbound_capacity` bounds the broadcast backlog per subscriber;
    /// a session that falls further behind loses the oldest messages
    /// (and logs it).
    ///
    /// # Errors
    ///
    /// Returns an error when the WebSocket handshake with `url` fails.
    pub async fn connect(url: &str, inbound_capacity: usize) -> anyhow::Result<Arc<Self>> {
        let (ws_stream, _) = connect_async(url)
            .await
            .with_context(|| format!("WebSocket handshake with host channel {url} failed"))?;

        info!("host channel connected: {url}");

        // Split so sessions can send while the read loop receives.
        let (sink, stream) = ws_stream.split();

        let (inbound, _) = broadcast::channel(inbound_capacity);
        let (teardown, _) = watch::channel(false);

        let channel = Arc::new(Self {
            sink: Mutex::new(sink),
            inbound,
            teardown,
        });

        tokio::spawn(Self::read_loop(Arc::clone(&channel), stream));

        Ok(channel)
    }

    /// Reads frames until the host goes away, fanning raw JSON out to
    /// the subscribers, then signals teardown.
    async fn read_loop(channel: Arc<Self>, mut stream: WsStream) {
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(WsMessage::Text(text)) => match serde_json::from_str::<Value>(&text) {
                    // Zero subscribers is fine; the message is simply
                    // traffic nobody listens to.
                    Ok(raw) => {
                        let _ = channel.inbound.send(raw);
                    }
                    Err(e) => warn!("undecodable inbound frame dropped: {e}"),
                },

                Ok(WsMessage::Binary(_)) => {
                    // The host protocol is JSON text only.
                    warn!("unexpected binary frame on host channel (ignored)");
                }

                // Protocol-level ping/pong replies are handled by
                // tokio-tungstenite when the sink is written.
                Ok(WsMessage::Ping(_)) | Ok(WsMessage::Pong(_)) => {}

                Ok(WsMessage::Close(_)) => {
                    debug!("host channel sent Close frame");
                    break;
                }

                Ok(WsMessage::Frame(_)) => {
                    debug!("raw frame on host channel (ignored)");
                }

                Err(WsError::ConnectionClosed | WsError::Protocol(_)) => {
                    debug!("host channel closed");
                    break;
                }

                Err(e) => {
                    warn!("host channel read error: {e}");
                    break;
                }
            }
        }

        let _ = channel.teardown.send(true);
        debug!("host channel read loop ended");
    }
}

#[async_trait]
impl HostChannel for WsHostChannel {
    async fn send(&self, envelope: OutboundEnvelope) -> Result<(), ChannelError> {
        if *self.teardown.borrow() {
            return Err(ChannelError::Closed);
        }

        debug!("{}: sending {}", envelope.view_id(), envelope.kind_name());
        let frame = envelope_to_frame(&envelope)?;

        let mut sink = self.sink.lock().await;
        sink.send(frame)
            .await
            .map_err(|e| ChannelError::Send(e.to_string()))
    }

    fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.inbound.subscribe()
    }

    fn teardown(&self) -> watch::Receiver<bool> {
        self.teardown.subscribe()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
