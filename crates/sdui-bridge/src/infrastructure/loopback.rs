//! In-process host channel.
//!
//! # Why a loopback channel?
//!
//! The production channel (`WsHostChannel`) needs a live WebSocket
//! endpoint, which tests do not have and single-process embeddings do
//! not want.  The `LoopbackChannel` implements the same `HostChannel`
//! capability set entirely in memory:
//!
//! - Outbound envelopes are recorded in order, so assertions can
//!   inspect exactly what a session sent and when.
//! - Inbound messages are injected by the test (or the embedding host)
//!   and fan out to every subscriber, exactly like shared-channel
//!   traffic from a real host.
//! - Teardown is triggered explicitly.
//!
//! # `fail_sends` flag
//!
//! Flip it to make every send fail with a `ChannelError`, to exercise
//! the error paths of callers without needing a broken transport.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{broadcast, watch};

use sdui_core::OutboundEnvelope;

use crate::application::transport::{ChannelError, HostChannel};

/// An in-memory host channel that records sends and fans out injected
/// inbound traffic.
pub struct LoopbackChannel {
    /// Every envelope sent over the channel, in send order.
    sent: Mutex<Vec<OutboundEnvelope>>,
    inbound: broadcast::Sender<Value>,
    teardown: watch::Sender<bool>,
    /// When `true`, every send fails with [`ChannelError::Send`].
    fail_sends: AtomicBool,
}

impl LoopbackChannel {
    /// Creates a loopback channel with a default inbound capacity.
    pub fn new() -> Arc<Self> {
        Self::with_capacity(128)
    }

    /// Creates a loopback channel with the given inbound capacity.
    pub fn with_capacity(inbound_capacity: usize) -> Arc<Self> {
        let (inbound, _) = broadcast::channel(inbound_capacity);
        let (teardown, _) = watch::channel(false);
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            inbound,
            teardown,
            fail_sends: AtomicBool::new(false),
        })
    }

    /// Delivers a raw inbound message to every current subscriber.
    ///
    /// Messages injected while nobody subscribes are dropped, like
    /// traffic on a channel nobody listens to.
    pub fn inject(&self, raw: Value) {
        let _ = self.inbound.send(raw);
    }

    /// Returns a snapshot of every envelope sent so far, in order.
    pub fn sent(&self) -> Vec<OutboundEnvelope> {
        self.sent.lock().unwrap().clone()
    }

    /// Makes subsequent sends fail (or succeed again).
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::Relaxed);
    }

    /// Signals host-initiated teardown to every observer.
    ///
    /// The channel itself stays usable for the farewell envelope, the
    /// way a host that is unmounting a view (but not closing the pipe)
    /// behaves.
    pub fn trigger_teardown(&self) {
        let _ = self.teardown.send(true);
    }
}

#[async_trait]
impl HostChannel for LoopbackChannel {
    async fn send(&self, envelope: OutboundEnvelope) -> Result<(), ChannelError> {
        if self.fail_sends.load(Ordering::Relaxed) {
            return Err(ChannelError::Send("loopback send failure".into()));
        }
        self.sent.lock().unwrap().push(envelope);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.inbound.subscribe()
    }

    fn teardown(&self) -> watch::Receiver<bool> {
        self.teardown.subscribe()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use sdui_core::ViewId;
    use serde_json::json;

    #[tokio::test]
    async fn test_sends_are_recorded_in_order() {
        let channel = LoopbackChannel::new();

        channel.send(OutboundEnvelope::client_ready(ViewId(0))).await.unwrap();
        channel
            .send(OutboundEnvelope::dom_event(ViewId(0), json!({"n": 1})))
            .await
            .unwrap();

        let sent = channel.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].kind_name(), "client-ready");
        assert_eq!(sent[1].kind_name(), "dom-event");
    }

    #[tokio::test]
    async fn test_fail_sends_produces_channel_error_and_records_nothing() {
        let channel = LoopbackChannel::new();
        channel.set_fail_sends(true);

        let result = channel.send(OutboundEnvelope::client_ready(ViewId(0))).await;

        assert!(matches!(result, Err(ChannelError::Send(_))));
        assert!(channel.sent().is_empty());
    }

    #[tokio::test]
    async fn test_injected_traffic_reaches_every_subscriber() {
        let channel = LoopbackChannel::new();
        let mut first = channel.subscribe();
        let mut second = channel.subscribe();

        channel.inject(json!({"viewID": 1, "data": {}}));

        // The shared channel broadcasts: both subscribers see the message.
        assert_eq!(first.recv().await.unwrap()["viewID"], 1);
        assert_eq!(second.recv().await.unwrap()["viewID"], 1);
    }

    #[tokio::test]
    async fn test_inject_without_subscribers_is_harmless() {
        let channel = LoopbackChannel::new();
        channel.inject(json!({"viewID": 1}));
    }

    #[tokio::test]
    async fn test_teardown_flips_the_watch_once() {
        let channel = LoopbackChannel::new();
        let rx = channel.teardown();
        assert!(!*rx.borrow());

        channel.trigger_teardown();

        assert!(*rx.borrow());
        // Sends still succeed afterwards (the farewell envelope).
        channel.send(OutboundEnvelope::client_removed(ViewId(0))).await.unwrap();
    }
}
