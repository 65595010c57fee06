//! The classified error returned by every fallible Strata operation.
//!
//! Failures are synchronous and never retried internally. Each variant
//! carries enough context (offsets, lengths, resource identity, owning
//! thread) to diagnose the misuse, and [`MemoryError::kind`] maps it onto
//! the five-way taxonomy callers branch on.

use std::fmt;
use std::thread::ThreadId;

use thiserror::Error;

use crate::id::{QueueId, RegionId, ScopeId};

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, MemoryError>;

/// A resource that can be closed or confined to a thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resource {
    /// A memory region.
    Region(RegionId),
    /// An allocation scope.
    Scope(ScopeId),
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Region(id) => write!(f, "{id}"),
            Self::Scope(id) => write!(f, "{id}"),
        }
    }
}

/// Coarse classification of a [`MemoryError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A malformed argument: bad alignment, disallowed size, incompatible
    /// rebase target, unknown layout path.
    InvalidArgument,
    /// Use of a closed resource, use from a non-owning thread, double close,
    /// or a foreign recycling entry.
    IllegalState,
    /// A bounded scope (or the system allocator) could not satisfy the request.
    CapacityExceeded,
    /// A spatial check failed.
    OutOfBounds,
    /// The region or layout does not support the requested operation.
    Unsupported,
    /// The operating system rejected a mapping or flush request.
    Io,
}

/// Errors produced by layouts, regions, scopes, and the recycling queue.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// A malformed argument, detected at the call that introduced it.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Human-readable description of the rejected value.
        reason: String,
    },

    /// The resource has been closed; closing is permanent.
    #[error("{resource} is already closed")]
    AlreadyClosed {
        /// The closed resource.
        resource: Resource,
    },

    /// The resource is confined to another thread.
    #[error("{resource} is confined to thread {owner:?} but was used from {accessor:?}")]
    WrongThread {
        /// The confined resource.
        resource: Resource,
        /// The thread that owns the resource.
        owner: ThreadId,
        /// The thread that attempted the access.
        accessor: ThreadId,
    },

    /// A bounded scope has no room left for the request.
    #[error(
        "capacity exceeded: requested {requested} bytes, {remaining} of {capacity} bytes remaining"
    )]
    CapacityExceeded {
        /// Bytes the request would have consumed, including alignment.
        requested: u64,
        /// Bytes still available.
        remaining: u64,
        /// Total reserved capacity.
        capacity: u64,
    },

    /// The system allocator returned no memory.
    #[error("native allocation of {bytes} bytes aligned to {alignment} failed")]
    AllocationFailed {
        /// Requested size in bytes.
        bytes: u64,
        /// Requested alignment in bytes.
        alignment: u64,
    },

    /// An access fell outside the region's bounds.
    #[error("out of bounds on {region}: offset {offset}, access size {size}, region length {length}")]
    OutOfBounds {
        /// The region being accessed.
        region: RegionId,
        /// Offset of the access, relative to the region view.
        offset: i64,
        /// Size of the access in bytes (negative counts are reported verbatim).
        size: i64,
        /// Length of the region view in bytes.
        length: u64,
    },

    /// The operation is not permitted on this region or layout.
    #[error("unsupported operation `{operation}`: {reason}")]
    Unsupported {
        /// Short operation name.
        operation: &'static str,
        /// Why the operation is not available.
        reason: String,
    },

    /// A recycling entry was returned to a queue that did not allocate it.
    #[error("entry does not belong to {queue}")]
    ForeignEntry {
        /// The queue that rejected the entry.
        queue: QueueId,
    },

    /// The operating system reported a failure.
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

impl MemoryError {
    /// Build an [`MemoryError::InvalidArgument`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Build an [`MemoryError::Unsupported`].
    pub fn unsupported(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            operation,
            reason: reason.into(),
        }
    }

    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::AlreadyClosed { .. } | Self::WrongThread { .. } | Self::ForeignEntry { .. } => {
                ErrorKind::IllegalState
            }
            Self::CapacityExceeded { .. } | Self::AllocationFailed { .. } => {
                ErrorKind::CapacityExceeded
            }
            Self::OutOfBounds { .. } => ErrorKind::OutOfBounds,
            Self::Unsupported { .. } => ErrorKind::Unsupported,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(MemoryError::invalid("x").kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            MemoryError::AlreadyClosed {
                resource: Resource::Scope(ScopeId::next())
            }
            .kind(),
            ErrorKind::IllegalState
        );
        assert_eq!(
            MemoryError::ForeignEntry {
                queue: QueueId::next()
            }
            .kind(),
            ErrorKind::IllegalState
        );
        assert_eq!(
            MemoryError::AllocationFailed {
                bytes: 1,
                alignment: 1
            }
            .kind(),
            ErrorKind::CapacityExceeded
        );
        assert_eq!(
            MemoryError::unsupported("write", "read-only").kind(),
            ErrorKind::Unsupported
        );
    }

    #[test]
    fn out_of_bounds_message_carries_context() {
        let err = MemoryError::OutOfBounds {
            region: RegionId::NOTHING,
            offset: 12,
            size: 8,
            length: 16,
        };
        let msg = err.to_string();
        assert!(msg.contains("region#0"));
        assert!(msg.contains("offset 12"));
        assert!(msg.contains("access size 8"));
        assert!(msg.contains("region length 16"));
        assert_eq!(err.kind(), ErrorKind::OutOfBounds);
    }

    #[test]
    fn wrong_thread_names_both_threads() {
        let owner = std::thread::current().id();
        let accessor = std::thread::spawn(|| std::thread::current().id())
            .join()
            .unwrap();
        let err = MemoryError::WrongThread {
            resource: Resource::Region(RegionId::NOTHING),
            owner,
            accessor,
        };
        assert!(err.to_string().contains("confined to thread"));
        assert_eq!(err.kind(), ErrorKind::IllegalState);
    }

    #[test]
    fn io_errors_convert() {
        let err: MemoryError = std::io::Error::other("boom").into();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
