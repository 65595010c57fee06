//! Recycling queue for Strata allocation bookkeeping.
//!
//! [`RecyclingQueue`] is a LIFO free-list shared across threads. It is
//! guarded by a single compare-and-set flag instead of a blocking lock:
//! every critical section is an O(1) pointer swap, so waiters spin briefly
//! rather than park.
//!
//! Entries are tagged with the [`QueueId`](strata_core::QueueId) of the
//! queue that allocated them; returning an entry to a different queue is
//! rejected with an illegal-state error.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod queue;
mod spin;

pub use queue::{Entry, RecyclingQueue};
