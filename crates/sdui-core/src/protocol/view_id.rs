//! View identities and their process-scoped allocator.
//!
//! # What is a view identity?
//!
//! The host channel is shared: every mounted view of every document in
//! the process sends and receives on the same pipe.  Each view is
//! therefore assigned a small integer identity at creation time, and
//! every envelope carries one.  Identities are:
//!
//! - **Monotonically increasing** – allocation order is observable,
//!   which makes interleaved logs easy to follow.
//! - **Unique per process** – an identity is never reused, even after
//!   its view is removed, so a late-arriving update for a dead view can
//!   never be misdelivered to a new one.
//!
//! # Thread safety
//!
//! The allocator uses `AtomicU64` internally, so two tasks can both call
//! [`ViewIdAllocator::next`] simultaneously without ever producing the
//! same identity twice.  `Ordering::Relaxed` is sufficient: identities
//! are used for addressing, not for memory synchronisation between
//! threads.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// The identity of one mounted view.
///
/// Serialized transparently as its integer value (the wire field name,
/// `viewID`, is applied by the envelope types that embed it).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ViewId(pub u64);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

/// A process-scoped allocator of [`ViewId`]s.
///
/// One allocator exists per bridge (and thus per process in the usual
/// single-bridge embedding); it is reset only at process start.
///
/// # Examples
///
/// ```rust
/// use sdui_core::protocol::view_id::ViewIdAllocator;
///
/// let allocator = ViewIdAllocator::new();
/// assert_eq!(allocator.next().0, 0);
/// assert_eq!(allocator.next().0, 1);
/// ```
pub struct ViewIdAllocator {
    inner: AtomicU64,
}

impl ViewIdAllocator {
    /// Creates a new allocator starting at 0.
    pub fn new() -> Self {
        Self {
            inner: AtomicU64::new(0),
        }
    }

    /// Returns the next identity and atomically advances the allocator.
    ///
    /// The first call returns `ViewId(0)`, the second `ViewId(1)`, and
    /// so on.
    pub fn next(&self) -> ViewId {
        // `fetch_add` atomically adds 1 and returns the value *before*
        // the addition, so concurrent callers each get a distinct id.
        ViewId(self.inner.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the number of identities allocated so far.
    ///
    /// Useful for diagnostics.  By the time the caller inspects the
    /// returned value another task may already have allocated further.
    pub fn allocated(&self) -> u64 {
        self.inner.load(Ordering::Relaxed)
    }
}

impl Default for ViewIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
