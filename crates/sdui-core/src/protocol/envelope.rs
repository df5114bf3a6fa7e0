//! JSON envelope types for the shared host channel.
//!
//! Every view of a server-driven document shares one bidirectional
//! messaging channel with every other view in the process.  Envelopes
//! carry the sending/receiving view's identity so each side can pick
//! out the traffic addressed to it.
//!
//! # Wire shape
//!
//! Outbound messages are JSON objects with a `"type"` discriminant; all
//! other fields are flattened into the same object:
//!
//! ```json
//! {"type":"client-ready","viewID":0,"data":null}
//! {"type":"dom-event","viewID":0,"data":{"target":"…","event":{…}}}
//! {"type":"client-removed","viewID":0,"data":null}
//! ```
//!
//! Serde's `#[serde(tag = "type")]` attribute handles the discriminant
//! automatically; `rename_all = "kebab-case"` produces the lowercase
//! hyphenated names the host expects.
//!
//! Inbound updates from the host have no `"type"` field at all — the
//! host delivers arbitrary custom messages, and anything shaped like
//! `{"viewID": n, "data": …}` is an update for view `n`:
//!
//! ```json
//! {"viewID":0,"data":{"path":"","model":{…}}}
//! ```
//!
//! # Why separate outbound and inbound types?
//!
//! The two directions carry different information: the client *sends*
//! lifecycle signals and DOM events, the host *sends* document updates.
//! Using distinct Rust types makes it a compile-time error to push an
//! inbound update back out over the channel, and vice versa.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::view_id::ViewId;

// ── Client → Host envelopes ───────────────────────────────────────────────────

/// All messages the client bridge sends to the host over the shared channel.
///
/// Each variant carries the identity of the view it belongs to; the host
/// uses it to route the message to the right server-side view record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
// `tag = "type"` means serde emits/expects a `"type"` field in the JSON
// object to identify the variant; `rename_all = "kebab-case"` maps
// `ClientReady` to `"client-ready"` and so on.
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutboundEnvelope {
    /// The rendering runtime finished its initial setup for this view.
    ///
    /// Sent exactly once per view, before any other outbound traffic for
    /// that view.  The host answers with a full document snapshot.
    ClientReady {
        /// Identity of the view that became ready.
        #[serde(rename = "viewID")]
        view_id: ViewId,
        /// Always `null`; present so every envelope has the same shape.
        data: Value,
    },

    /// A user interaction inside the rendered document.
    ///
    /// The payload is opaque to the bridge: the rendering runtime
    /// produces it and the server-side document consumes it.
    DomEvent {
        /// Identity of the view the event originated in.
        #[serde(rename = "viewID")]
        view_id: ViewId,
        /// Runtime-defined event payload.
        data: Value,
    },

    /// The view is being torn down.
    ///
    /// Sent exactly once per view, after which the view emits nothing
    /// further.  The host drops the view from its routing table.
    ClientRemoved {
        /// Identity of the view being removed.
        #[serde(rename = "viewID")]
        view_id: ViewId,
        /// Always `null`; present so every envelope has the same shape.
        data: Value,
    },
}

impl OutboundEnvelope {
    /// Builds a `client-ready` envelope for `view_id`.
    pub fn client_ready(view_id: ViewId) -> Self {
        Self::ClientReady {
            view_id,
            data: Value::Null,
        }
    }

    /// Builds a `dom-event` envelope carrying `data` for `view_id`.
    pub fn dom_event(view_id: ViewId, data: Value) -> Self {
        Self::DomEvent { view_id, data }
    }

    /// Builds a `client-removed` envelope for `view_id`.
    pub fn client_removed(view_id: ViewId) -> Self {
        Self::ClientRemoved {
            view_id,
            data: Value::Null,
        }
    }

    /// Returns the identity of the view this envelope belongs to.
    pub fn view_id(&self) -> ViewId {
        match self {
            Self::ClientReady { view_id, .. }
            | Self::DomEvent { view_id, .. }
            | Self::ClientRemoved { view_id, .. } => *view_id,
        }
    }

    /// Returns the wire name of the envelope kind.
    ///
    /// Used in log messages so payload contents (which may echo user
    /// input) never end up in the diagnostic stream.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::ClientReady { .. } => "client-ready",
            Self::DomEvent { .. } => "dom-event",
            Self::ClientRemoved { .. } => "client-removed",
        }
    }
}

// ── Host → Client updates ─────────────────────────────────────────────────────

/// A document update addressed to one view.
///
/// The host channel is shared, so every session sees every inbound
/// message; a message only becomes a `ServerUpdate` for a session after
/// its `viewID` matched that session's identity.  The payload stays an
/// opaque [`Value`] — the rendering runtime interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerUpdate {
    /// Identity of the view this update is addressed to.
    #[serde(rename = "viewID")]
    pub view_id: ViewId,
    /// Runtime-defined update payload (e.g. a document patch).
    pub data: Value,
}

/// Extracts the `viewID` a raw inbound message is addressed to, if any.
///
/// Hosts may deliver arbitrary custom messages on the shared channel.
/// A message without a numeric `viewID` field is addressed to nobody and
/// is discarded silently by every session — that is not an error, just
/// traffic for some other consumer of the channel.
pub fn addressed_view_id(raw: &Value) -> Option<ViewId> {
    raw.get("viewID").and_then(Value::as_u64).map(ViewId)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
