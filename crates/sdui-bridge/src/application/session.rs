//! The per-view protocol state machine.
//!
//! Every mounted view owns one [`ViewSession`].  The session is the
//! only thing that talks to the host channel on the view's behalf, and
//! it enforces the protocol's lifecycle invariants:
//!
//! ```text
//! Created ──ready()──► Ready ──remove()──► Removed (terminal)
//! ```
//!
//! - `client-ready` is sent exactly once, on the `Created → Ready`
//!   transition.
//! - No `dom-event` leaves the session before `client-ready` has been
//!   sent (attempting one is an error, not a reorder).
//! - `client-removed` is sent exactly once, on the transition into
//!   `Removed`; afterwards the session ignores all inbound traffic and
//!   accepts outbound sends as no-ops, tolerating late teardown races.
//!
//! Inbound routing runs on a dedicated task per session: every message
//! on the shared channel is inspected, messages addressed to other
//! views are discarded silently, and matching updates are forwarded to
//! the rendering runtime's update queue in arrival order.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use sdui_core::{protocol::envelope::addressed_view_id, OutboundEnvelope, ServerUpdate, ViewId};

use crate::application::transport::{ChannelError, HostChannel};

// ── State & errors ────────────────────────────────────────────────────────────

/// Lifecycle state of one view session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, handshake not yet sent.
    Created,
    /// `client-ready` sent; events and updates flow.
    Ready,
    /// `client-removed` sent; terminal.
    Removed,
}

/// Errors surfaced by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A DOM event was emitted before the readiness handshake.
    ///
    /// The ordering invariant (`client-ready` strictly before any
    /// `dom-event`) is enforced here rather than assumed of callers.
    #[error("view session is not ready; the ready signal must precede any event")]
    NotReady,

    /// The host channel failed to deliver the envelope.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

// ── ViewSession ───────────────────────────────────────────────────────────────

/// One view's identity, handshake state, and message routing.
pub struct ViewSession {
    id: ViewId,
    channel: Arc<dyn HostChannel>,
    // The state lock is held across channel sends so outbound envelopes
    // for this identity leave in state-machine order.
    state: Mutex<SessionState>,
    removed: watch::Sender<bool>,
}

impl ViewSession {
    /// Creates a session for `id` in the `Created` state.
    ///
    /// The identity must come from the process-wide allocator; the
    /// session assumes it is unique and never reused.
    pub fn new(id: ViewId, channel: Arc<dyn HostChannel>) -> Arc<Self> {
        let (removed, _) = watch::channel(false);
        Arc::new(Self {
            id,
            channel,
            state: Mutex::new(SessionState::Created),
            removed,
        })
    }

    /// Returns this session's view identity.
    pub fn id(&self) -> ViewId {
        self.id
    }

    /// Returns the current lifecycle state.
    pub async fn state(&self) -> SessionState {
        *self.state.lock().await
    }

    /// Returns a watch that flips to `true` when the session is removed.
    pub fn removed_signal(&self) -> watch::Receiver<bool> {
        self.removed.subscribe()
    }

    /// Signals that the rendering runtime completed its initial setup.
    ///
    /// The first call sends `client-ready` and moves the session to
    /// `Ready`.  Later calls (and calls after removal) are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Channel`] when the handshake envelope
    /// cannot be delivered; the session then stays in `Created` so a
    /// working channel could still complete the handshake.
    pub async fn ready(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        match *state {
            SessionState::Created => {
                self.channel
                    .send(OutboundEnvelope::client_ready(self.id))
                    .await?;
                *state = SessionState::Ready;
                debug!("{}: ready", self.id);
                Ok(())
            }
            SessionState::Ready | SessionState::Removed => {
                debug!("{}: duplicate ready signal ignored", self.id);
                Ok(())
            }
        }
    }

    /// Emits a DOM event raised inside the rendered document.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotReady`] before the readiness handshake;
    /// [`SessionError::Channel`] when the transport fails.  After
    /// removal the send is accepted as a no-op — unmount races deliver
    /// their last events late, and that is not the caller's fault.
    pub async fn emit_event(&self, data: Value) -> Result<(), SessionError> {
        let state = self.state.lock().await;
        match *state {
            SessionState::Created => Err(SessionError::NotReady),
            SessionState::Ready => {
                self.channel
                    .send(OutboundEnvelope::dom_event(self.id, data))
                    .await?;
                Ok(())
            }
            SessionState::Removed => {
                debug!("{}: event after removal dropped", self.id);
                Ok(())
            }
        }
    }

    /// Tears the session down.
    ///
    /// The first call sends `client-removed` and moves the session to
    /// `Removed`; any later call is a no-op.  The state changes *before*
    /// the envelope leaves, so a failing channel can never cause a
    /// second removal envelope on retry.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Channel`] when the removal envelope
    /// cannot be delivered.  The session is removed regardless.
    pub async fn remove(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        if *state == SessionState::Removed {
            debug!("{}: duplicate teardown ignored", self.id);
            return Ok(());
        }
        *state = SessionState::Removed;
        // Wake the routing task and anything splicing on our behalf.
        let _ = self.removed.send(true);

        self.channel
            .send(OutboundEnvelope::client_removed(self.id))
            .await?;
        debug!("{}: removed", self.id);
        Ok(())
    }

    /// Spawns the inbound routing task for this session.
    ///
    /// The task subscribes to the shared channel and forwards the
    /// payload of every update addressed to this view into `update_tx`,
    /// preserving host delivery order.  It ends when the session is
    /// removed, the channel closes, or the runtime drops its receiver.
    pub fn spawn_routing(self: &Arc<Self>, update_tx: mpsc::Sender<Value>) -> JoinHandle<()> {
        let session = Arc::clone(self);
        let mut inbound = session.channel.subscribe();
        let mut removed = session.removed.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = removed.changed() => {
                        if changed.is_err() || *removed.borrow() {
                            break;
                        }
                    }
                    msg = inbound.recv() => match msg {
                        Ok(raw) => {
                            if !session.route_inbound(raw, &update_tx).await {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            // The channel outpaced this session; updates were
                            // lost.  Log and keep routing what remains.
                            warn!("{}: inbound stream lagged, {skipped} messages skipped", session.id);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
            debug!("{}: inbound routing stopped", session.id);
        })
    }

    /// Routes one raw inbound message.  Returns `false` when routing
    /// should stop (runtime went away).
    async fn route_inbound(&self, raw: Value, update_tx: &mpsc::Sender<Value>) -> bool {
        // The channel is shared by all sessions in the process: traffic
        // for other views (or for no view at all) is not ours to judge.
        if addressed_view_id(&raw) != Some(self.id) {
            return true;
        }

        // Late inbound traffic after removal is ignored, not an error.
        if *self.state.lock().await == SessionState::Removed {
            return true;
        }

        match serde_json::from_value::<ServerUpdate>(raw) {
            Ok(update) => update_tx.send(update.data).await.is_ok(),
            Err(e) => {
                // Malformed payload: drop this message, keep the session.
                warn!("{}: malformed inbound update dropped: {e}", self.id);
                true
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
