//! Checked off-heap memory for Strata.
//!
//! Provides owned memory [`Region`]s, [`Address`]es into them, and
//! bump-allocating [`Scope`]s that release everything they allocated in
//! one step. Every dereference is checked: spatially (the access lies
//! inside the region view) and temporally (the region is still open and
//! the caller is on the owning thread). This crate is the only one in the
//! workspace that touches raw memory.
//!
//! # Architecture
//!
//! ```text
//! Scope (thread-confined, Bounded | Unbounded)
//! └── BlockChain → Block[] (bump-allocated native regions)
//!     └── Region views (READ | WRITE), Arc-shared RegionCore
//!         └── Address { region, offset }
//! BlockPool (RecyclingQueue<NativeBlock>, shared across threads)
//! ```
//!
//! # Backing kinds
//!
//! - **Native:** zeroed memory from the global allocator.
//! - **Heap:** a `Vec<u8>` moved into the region.
//! - **Mapped:** a file mapped into memory, with `force` to flush.
//!
//! # Temporal safety
//!
//! Closing a region (directly, through handoff, or by closing its scope)
//! flips a shared liveness flag before the backing storage is released.
//! Close is only permitted on the owning thread, which is also the only
//! thread allowed to access the memory, so no access can race a release.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod address;
pub mod block_pool;
pub mod carrier;
pub mod config;
pub mod handle;
pub mod mapped;
#[cfg_attr(unix, path = "mmap_unix.rs")]
#[cfg_attr(not(unix), path = "mmap_fallback.rs")]
mod mmap;
mod raw;
pub mod region;
pub mod scope;
mod segment;

// Public re-exports for the primary API surface.
pub use address::Address;
pub use block_pool::{BlockPool, SharedBlockPool};
pub use carrier::Carrier;
pub use config::ScopeConfig;
pub use handle::ValueHandle;
pub use mapped::MapMode;
pub use region::{BackingKind, Region};
pub use scope::{Scope, ScopeKind};
