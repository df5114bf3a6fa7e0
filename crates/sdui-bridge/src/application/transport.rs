//! The transport abstraction over the host channel.
//!
//! The host page offers one shared, bidirectional messaging channel
//! with three primitives: send a message, observe every inbound
//! message, and learn when the channel is being torn down.  The bridge
//! depends on exactly that capability set — the [`HostChannel`] trait —
//! rather than on any concrete host API, so sessions can be driven by a
//! WebSocket in production and by an in-process loopback in tests.
//!
//! # Sharing semantics
//!
//! One channel serves *all* views in the process.  Inbound traffic is
//! therefore a broadcast: every subscriber sees every message and
//! discards what is not addressed to it.  Demultiplexing by view
//! identity is the only coordination between sessions.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{broadcast, watch};

use sdui_core::OutboundEnvelope;

/// Errors surfaced by a host channel on the outbound path.
///
/// A send failure means the transport itself is unusable, so it is
/// propagated to whoever triggered the send — retrying is the host
/// channel layer's business, not the bridge's.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The channel was torn down before or during the send.
    #[error("host channel is closed")]
    Closed,
    /// The underlying transport failed to deliver the envelope.
    #[error("failed to deliver envelope to host: {0}")]
    Send(String),
}

/// The capability set the bridge requires from a host channel.
///
/// Implementations live in the infrastructure layer; see
/// `WsHostChannel` (production) and `LoopbackChannel` (tests and
/// single-process embeddings).
#[async_trait]
pub trait HostChannel: Send + Sync {
    /// Delivers one outbound envelope to the host.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] when the transport cannot deliver; the
    /// bridge never retries.
    async fn send(&self, envelope: OutboundEnvelope) -> Result<(), ChannelError>;

    /// Subscribes to the shared inbound message stream.
    ///
    /// Every subscriber sees every inbound message as raw JSON, in the
    /// order the host delivered them.  Filtering by view identity is
    /// the subscriber's job.
    fn subscribe(&self) -> broadcast::Receiver<Value>;

    /// Returns a watch that flips to `true` (exactly once) when the
    /// host tears the channel down.
    fn teardown(&self) -> watch::Receiver<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_error_messages_are_descriptive() {
        assert_eq!(ChannelError::Closed.to_string(), "host channel is closed");
        assert!(
            ChannelError::Send("connection reset".into())
                .to_string()
                .contains("connection reset")
        );
    }
}
