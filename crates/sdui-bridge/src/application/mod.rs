//! Application layer: the bridge's behavior, expressed over trait seams.
//!
//! - [`transport`] – the `HostChannel` capability set the bridge needs
//!   from the host (send / subscribe / teardown).
//! - [`session`] – the per-view protocol state machine.
//! - [`loader`] – module loading with the direct / fetch-then-import
//!   strategies.
//! - [`waiter`] – asynchronous wait for elements matching a selector.
//! - [`bridge`] – the composition root tying all of the above to one
//!   mounted view.

pub mod bridge;
pub mod loader;
pub mod session;
pub mod transport;
pub mod waiter;

pub use bridge::{Bridge, MountedView, RuntimeHandle, SubWidgetResolver};
pub use loader::{DynModule, ModuleImporter, ModuleLoadError, ModuleLoader, SourceFetcher};
pub use session::{SessionError, SessionState, ViewSession};
pub use transport::{ChannelError, HostChannel};
pub use waiter::wait_for_all;
