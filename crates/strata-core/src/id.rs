//! Strongly-typed identifiers for regions, scopes, and recycling queues.
//!
//! Every identifier is allocated from a process-wide monotonic counter, so
//! two distinct resources never share an id even when one reuses the
//! memory of the other.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static REGION_COUNTER: AtomicU64 = AtomicU64::new(1);
static SCOPE_COUNTER: AtomicU64 = AtomicU64::new(1);
static QUEUE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identity of a memory region.
///
/// A region handed off to another thread, or rebuilt over a recycled
/// backing block, always receives a fresh id. Id `0` is reserved for the
/// universal no-access region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(u64);

impl RegionId {
    /// The id of the universal zero-length, no-access region.
    pub const NOTHING: RegionId = RegionId(0);

    /// Allocate a fresh, unique region id. Thread-safe.
    pub fn next() -> Self {
        Self(REGION_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "region#{}", self.0)
    }
}

/// Identity of an allocation scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u64);

impl ScopeId {
    /// Allocate a fresh, unique scope id. Thread-safe.
    pub fn next() -> Self {
        Self(SCOPE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// Identity of a recycling queue, used as the ownership tag of its entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueueId(u64);

impl QueueId {
    /// Allocate a fresh, unique queue id. Thread-safe.
    pub fn next() -> Self {
        Self(QUEUE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue#{}", self.0)
    }
}
