//! Correlation handles.
//!
//! A handle is minted by the calling layer, travels with a request through
//! the bridge untouched, and comes back with the result so the caller can
//! match it to the call site that started it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// Opaque caller-assigned request key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestHandle(i64);

impl RequestHandle {
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for RequestHandle {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Mints handles that are never reused within the process.
#[derive(Debug)]
pub struct HandleAllocator {
    next: AtomicI64,
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleAllocator {
    pub const fn new() -> Self {
        Self::starting_at(1)
    }

    pub const fn starting_at(first: i64) -> Self {
        Self {
            next: AtomicI64::new(first),
        }
    }

    pub fn allocate(&self) -> RequestHandle {
        RequestHandle(self.next.fetch_add(1, Ordering::Relaxed))
    }
}
