//! Strata: declarative native memory layouts with checked off-heap access.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Strata sub-crates. For most users, adding `strata` as a single dependency
//! is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use strata::prelude::*;
//!
//! let x = Layout::of_value(32, ByteOrder::BigEndian).unwrap().with_name("x");
//! let y = Layout::of_value(32, ByteOrder::BigEndian).unwrap().with_name("y");
//! let point = Layout::of_struct([x, y]);
//! assert_eq!(point.bits_size().unwrap(), 64);
//! assert_eq!(point.bits_alignment(), 32);
//!
//! // A scope with room for exactly one point.
//! let mut scope = Scope::bounded(8).unwrap();
//! let region = scope.allocate(&point).unwrap();
//! let y = ValueHandle::new(&point, &[PathElement::member("y")]).unwrap();
//! y.set(&region.base_address(), 4u32).unwrap();
//! assert_eq!(region.get::<u32>(4, ByteOrder::BigEndian).unwrap(), 4);
//!
//! let err = scope.allocate(&point).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
//!
//! scope.close().unwrap();
//! assert_eq!(
//!     region.get::<u32>(0, ByteOrder::BigEndian).unwrap_err().kind(),
//!     ErrorKind::IllegalState
//! );
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `strata-core` | Errors, ids, byte order, access modes |
//! | [`layout`] | `strata-layout` | The layout algebra and layout paths |
//! | [`pool`] | `strata-pool` | The spin-locked recycling queue |
//! | [`memory`] | `strata-memory` | Regions, addresses, scopes, mapped files |
//! | [`link`] | `strata-link` | Function descriptors and call-buffer marshaling |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Errors, identities, byte order, and access modes (`strata-core`).
pub use strata_core as types;

/// The layout algebra (`strata-layout`).
///
/// [`layout::Layout`] values describe memory shapes; [`layout::PathElement`]
/// lists select nested members and compute their offsets.
pub use strata_layout as layout;

/// The recycling queue (`strata-pool`).
pub use strata_pool as pool;

/// Checked memory (`strata-memory`).
///
/// [`memory::Region`] and [`memory::Address`] for access,
/// [`memory::Scope`] for allocation, [`memory::BlockPool`] for block reuse.
pub use strata_memory as memory;

/// Linking façade (`strata-link`).
pub use strata_link as link;

/// Common imports for typical Strata usage.
///
/// ```rust
/// use strata::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use strata_core::{AccessModes, ByteOrder, ErrorKind, MemoryError, Result};

    // Layouts
    pub use strata_layout::{GroupKind, Layout, LayoutPath, PathElement};

    // Memory
    pub use strata_memory::{
        Address, BlockPool, MapMode, Region, Scope, ScopeConfig, SharedBlockPool, ValueHandle,
    };

    // Linking
    pub use strata_link::{Abi, FunctionDescriptor, Linker, LinkerConfig, SymbolLookup};
}
