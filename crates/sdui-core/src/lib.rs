//! # sdui-core
//!
//! Shared protocol vocabulary for the sdui client bridge: the envelope
//! types exchanged with the host channel, view-identity allocation, and
//! the URL path resolution used to locate remotely hosted component
//! modules.
//!
//! This crate has zero dependencies on I/O, async runtimes, or UI
//! frameworks.  It is consumed by `sdui-bridge` (and by any host-side
//! process that wants to speak the same wire protocol).
//!
//! # Architecture overview
//!
//! A server-driven UI document lives on a server; a thin client bridge
//! renders it inside a host page.  The host page offers exactly one
//! shared, bidirectional messaging channel, so every mounted view of a
//! document multiplexes over it.  This crate defines:
//!
//! - **`protocol`** – What travels over the channel.  Outbound messages
//!   (`client-ready`, `dom-event`, `client-removed`) are JSON objects
//!   tagged with a `"type"` discriminant and the sending view's
//!   identity; inbound updates are `{viewID, data}` objects addressed
//!   to one view.
//!
//! - **`urlpath`** – How a module name plus a host base URL become one
//!   fetchable absolute path: a pure `/`-segment join with permissive
//!   `.`/`..` collapse.

pub mod protocol;
pub mod urlpath;

// Re-export the most-used types at the crate root so callers can write
// `sdui_core::ViewId` instead of `sdui_core::protocol::view_id::ViewId`.
pub use protocol::envelope::{OutboundEnvelope, ServerUpdate};
pub use protocol::view_id::{ViewId, ViewIdAllocator};
pub use urlpath::resolve;
