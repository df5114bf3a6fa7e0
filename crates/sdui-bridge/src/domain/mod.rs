//! Domain layer: pure bridge vocabulary with no I/O.
//!
//! - [`config`] – runtime settings and host-page base-URL discovery.
//! - [`module_ref`] – references to remotely hosted component modules.
//! - [`dom`] – the minimal mount tree the bridge queries and splices.

pub mod config;
pub mod dom;
pub mod module_ref;

pub use config::{BridgeConfig, LoadStrategy};
pub use dom::{Element, MountTree, Selector};
pub use module_ref::ModuleRef;
