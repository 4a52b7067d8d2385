//! Call identifiers.
//!
//! Identifiers start at 0 and grow by one per call. They are never reused by
//! the allocator that produced them, which lets the listener tell a stale
//! response (id already issued) from a foreign one (id never issued).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier correlating one outbound call with its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(u64);

impl CallId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CallId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Monotonic source of call identifiers, one per router instance.
#[derive(Debug, Default)]
pub struct CallIdAllocator {
    next: AtomicU64,
}

impl CallIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next identifier.
    pub fn next(&self) -> CallId {
        CallId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Whether `id` has been handed out by this allocator.
    pub fn was_issued(&self, id: CallId) -> bool {
        id.0 < self.next.load(Ordering::Relaxed)
    }

    /// Number of identifiers handed out so far.
    pub fn issued(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}
