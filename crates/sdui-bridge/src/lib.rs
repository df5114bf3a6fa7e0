//! sdui-bridge library crate.
//!
//! This crate provides the client-side protocol bridge that lets a
//! server-driven UI runtime render and update live documents inside a
//! host page, when all the host offers is one shared bidirectional
//! messaging channel and a mount point.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Host page (shared channel + mount tree)
//!         ↕
//! [sdui-bridge]
//!   ├── domain/          Pure types: BridgeConfig, ModuleRef, mount tree
//!   ├── application/     ViewSession state machine, module loader,
//!   │                    element waiter, Bridge composition root
//!   └── infrastructure/
//!         ├── ws_channel/  WebSocket host channel (tokio-tungstenite)
//!         ├── loopback/    In-process host channel (tests, embeddings)
//!         └── http_fetch/  HTTP module source fetcher (reqwest)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no network dependencies (it does use
//!   `tokio::sync::watch` for mutation signaling, which is pure
//!   in-memory synchronisation).
//! - `application` depends on `domain` and `sdui-core` only; all
//!   external capabilities are traits (`HostChannel`, `ModuleImporter`,
//!   `SourceFetcher`, `SubWidgetResolver`).
//! - `infrastructure` depends on all other layers plus the concrete
//!   transports (`tokio-tungstenite`, `reqwest`).
//!
//! # Why this structure?
//!
//! The bridge's business logic — handshake ordering, demultiplexing,
//! teardown idempotency — must be testable without a real host page or
//! a real network.  Keeping the channel behind a trait means a test can
//! drive a session through an in-process loopback channel, while a
//! deployment swaps in the WebSocket adapter without touching the
//! session code.

/// Domain layer: configuration, module references, mount tree.
pub mod domain;

/// Application layer: session state machine, loader, waiter, bridge.
pub mod application;

/// Infrastructure layer: concrete channel adapters and the HTTP fetcher.
pub mod infrastructure;
