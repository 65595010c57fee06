//! Core types for the Strata memory framework.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by every other Strata crate: resource
//! identifiers, byte order, region access modes, and the classified
//! [`MemoryError`] returned by every fallible operation.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod access;
pub mod error;
pub mod id;
pub mod order;

pub use access::AccessModes;
pub use error::{ErrorKind, MemoryError, Resource, Result};
pub use id::{QueueId, RegionId, ScopeId};
pub use order::ByteOrder;
