//! Infrastructure layer: concrete implementations of the application
//! seams.
//!
//! - [`ws_channel`] – the production host channel over WebSocket.
//! - [`loopback`] – an in-process host channel for tests and
//!   single-process embeddings.
//! - [`http_fetch`] – the HTTP module source fetcher.

pub mod http_fetch;
pub mod loopback;
pub mod ws_channel;

pub use http_fetch::HttpSourceFetcher;
pub use loopback::LoopbackChannel;
pub use ws_channel::WsHostChannel;
