//! Allocation scopes: thread-confined bump allocators released in one step.
//!
//! A scope hands out read-write regions carved from blocks it owns.
//! Closing the scope closes every block, which invalidates every region
//! carved from it. Bounded scopes reserve their whole capacity up front;
//! unbounded scopes chain blocks as they fill.

use std::fmt;
use std::thread::{self, ThreadId};

use log::{debug, warn};
use strata_core::{MemoryError, Resource, Result, ScopeId};
use strata_layout::Layout;

use crate::block_pool::SharedBlockPool;
use crate::config::ScopeConfig;
use crate::mmap;
use crate::raw::NativeBlock;
use crate::region::Region;
use crate::segment::{Block, BlockChain};

/// Allocation policy of a scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// A fixed reservation; allocations past it fail with capacity-exceeded.
    Bounded {
        /// Reserved bytes.
        capacity: u64,
    },
    /// Grows by chaining blocks as needed.
    Unbounded,
}

/// A thread-confined arena of native memory.
///
/// Every region a scope returns is confined to the scope's thread, carries
/// read and write modes only, and dies when the scope closes.
pub struct Scope {
    id: ScopeId,
    owner: ThreadId,
    kind: ScopeKind,
    chain: BlockChain,
    /// Bytes consumed by allocations, alignment padding included.
    allocated_bytes: u64,
    closed: bool,
}

fn to_usize(value: u64, what: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| MemoryError::invalid(format!("{what} {value} does not fit this target")))
}

impl Scope {
    /// A scope reserving exactly `capacity` bytes up front.
    pub fn bounded(capacity: u64) -> Result<Scope> {
        Self::bounded_with(capacity, ScopeConfig::default())
    }

    /// A bounded scope configured by `config`.
    ///
    /// The reservation is aligned to at least a page, so any allocation
    /// aligned up to that much needs exactly the padding its offset in the
    /// scope implies.
    pub fn bounded_with(capacity: u64, config: ScopeConfig) -> Result<Scope> {
        config.validate()?;
        let align = config.block_alignment.max(mmap::page_size());
        let native = NativeBlock::allocate(to_usize(capacity, "capacity")?, align)?;
        let chain = BlockChain::single(Block::new(native), config);
        Ok(Self::open(ScopeKind::Bounded { capacity }, chain))
    }

    /// A growable scope with the default configuration.
    pub fn unbounded() -> Scope {
        Self::open(ScopeKind::Unbounded, BlockChain::new(ScopeConfig::default(), None))
    }

    /// A growable scope with a custom configuration.
    pub fn unbounded_with(config: ScopeConfig) -> Result<Scope> {
        config.validate()?;
        Ok(Self::open(ScopeKind::Unbounded, BlockChain::new(config, None)))
    }

    /// A growable scope that takes blocks from, and returns them to, `pool`.
    pub fn unbounded_pooled(config: ScopeConfig, pool: SharedBlockPool) -> Result<Scope> {
        config.validate()?;
        Ok(Self::open(
            ScopeKind::Unbounded,
            BlockChain::new(config, Some(pool)),
        ))
    }

    fn open(kind: ScopeKind, chain: BlockChain) -> Scope {
        let scope = Scope {
            id: ScopeId::next(),
            owner: thread::current().id(),
            kind,
            chain,
            allocated_bytes: 0,
            closed: false,
        };
        debug!("opened {} ({:?})", scope.id, scope.kind);
        scope
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(MemoryError::AlreadyClosed {
                resource: Resource::Scope(self.id),
            });
        }
        let accessor = thread::current().id();
        if accessor != self.owner {
            return Err(MemoryError::WrongThread {
                resource: Resource::Scope(self.id),
                owner: self.owner,
                accessor,
            });
        }
        Ok(())
    }

    /// Allocate a region sized and aligned for `layout`.
    ///
    /// Unsized layouts and layouts that are not a whole number of bytes
    /// are unsupported.
    pub fn allocate(&mut self, layout: &Layout) -> Result<Region> {
        self.check_open()?;
        let size = layout.bytes_size()?;
        self.allocate_bytes(size, layout.bytes_alignment())
    }

    /// Allocate `count` consecutive copies of `element`.
    pub fn allocate_array(&mut self, element: &Layout, count: u64) -> Result<Region> {
        let array = Layout::of_sequence(element.clone(), count)?;
        self.allocate(&array)
    }

    /// Allocate `size` zeroed bytes aligned to `alignment` bytes.
    ///
    /// `alignment` must be a power of two. A bounded scope without room
    /// fails with capacity-exceeded and is left exactly as it was; it also
    /// rejects alignments beyond its reservation's alignment (a page) as
    /// invalid-argument.
    pub fn allocate_bytes(&mut self, size: u64, alignment: u64) -> Result<Region> {
        self.check_open()?;
        if !alignment.is_power_of_two() {
            return Err(MemoryError::invalid(format!(
                "alignment {alignment} is not a power of two"
            )));
        }
        let size = to_usize(size, "size")?;
        let align = to_usize(alignment, "alignment")?;
        let (region, consumed) = match self.kind {
            ScopeKind::Bounded { capacity } => {
                let limit = self.chain.current().map_or(usize::MAX, Block::alignment);
                if align > limit {
                    return Err(MemoryError::invalid(format!(
                        "alignment {alignment} exceeds the {limit}-byte alignment of a bounded scope"
                    )));
                }
                match self.chain.bump(size, align) {
                    Some(carved) => carved,
                    None => {
                        let (requested, remaining) = self
                            .chain
                            .current()
                            .map(|block| (block.demand(size, align), block.remaining() as u64))
                            .unwrap_or((size as u64, 0));
                        return Err(MemoryError::CapacityExceeded {
                            requested,
                            remaining,
                            capacity,
                        });
                    }
                }
            }
            ScopeKind::Unbounded => match self.chain.bump(size, align) {
                Some(carved) => carved,
                None => self.chain.grow(size, align)?,
            },
        };
        self.allocated_bytes += consumed as u64;
        Ok(region)
    }

    /// Allocate a byte-aligned copy of `bytes`.
    pub fn allocate_copy(&mut self, bytes: &[u8]) -> Result<Region> {
        let region = self.allocate_bytes(bytes.len() as u64, 1)?;
        region.write_bytes(0, bytes)?;
        Ok(region)
    }

    /// Close the scope and every region allocated from it.
    ///
    /// Blocks are released newest first. Closing twice is an illegal-state
    /// error, as is closing from another thread.
    pub fn close(&mut self) -> Result<()> {
        self.check_open()?;
        self.closed = true;
        let blocks = self.chain.release_all();
        debug!(
            "closed {} ({} bytes allocated across {blocks} blocks)",
            self.id, self.allocated_bytes
        );
        Ok(())
    }

    /// This scope's identity.
    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Allocation policy.
    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// The thread this scope is confined to.
    pub fn owner_thread(&self) -> ThreadId {
        self.owner
    }

    /// Whether [`close`](Self::close) has not run yet.
    pub fn is_alive(&self) -> bool {
        !self.closed
    }

    /// Reserved capacity of a bounded scope; `None` when unbounded.
    pub fn byte_size(&self) -> Option<u64> {
        match self.kind {
            ScopeKind::Bounded { capacity } => Some(capacity),
            ScopeKind::Unbounded => None,
        }
    }

    /// Bytes still available in a bounded scope; `None` when unbounded.
    pub fn remaining_capacity(&self) -> Option<u64> {
        match self.kind {
            ScopeKind::Bounded { .. } => Some(
                self.chain
                    .current()
                    .map_or(0, |block| block.remaining() as u64),
            ),
            ScopeKind::Unbounded => None,
        }
    }

    /// Bytes consumed by allocations so far, alignment padding included.
    ///
    /// Keeps its value after close.
    pub fn allocated_bytes(&self) -> u64 {
        self.allocated_bytes
    }

    /// Bytes reserved from the allocator (or pool) by open blocks.
    pub fn reserved_bytes(&self) -> u64 {
        self.chain.reserved_bytes() as u64
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if thread::current().id() == self.owner {
            if let Err(err) = self.close() {
                warn!("failed to close {} on drop: {err}", self.id);
            }
        } else {
            warn!(
                "{} dropped open on a foreign thread; its memory is freed with the last region view",
                self.id
            );
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("allocated_bytes", &self.allocated_bytes)
            .field("blocks", &self.chain.block_count())
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block_pool::BlockPool;
    use strata_core::{ByteOrder, ErrorKind};

    fn int(bits: u64) -> Layout {
        Layout::of_value(bits, ByteOrder::BigEndian).unwrap()
    }

    fn point() -> Layout {
        Layout::of_struct([int(32).with_name("x"), int(32).with_name("y")])
    }

    #[test]
    fn bounded_scope_fits_exactly_its_capacity() {
        let mut scope = Scope::bounded(8).unwrap();
        let first = scope.allocate(&point()).unwrap();
        assert_eq!(first.byte_size(), 8);
        assert_eq!(scope.remaining_capacity(), Some(0));
        let err = scope.allocate(&point()).unwrap_err();
        assert!(matches!(
            err,
            MemoryError::CapacityExceeded {
                requested: 8,
                remaining: 0,
                capacity: 8
            }
        ));
        assert_eq!(scope.allocated_bytes(), 8);
        assert!(first.is_alive());
    }

    #[test]
    fn over_aligned_allocation_fits_exact_capacity() {
        for _ in 0..64 {
            let mut scope = Scope::bounded(64).unwrap();
            let region = scope.allocate_bytes(64, 64).unwrap();
            assert_eq!(region.raw_start() % 64, 0);
            assert_eq!(scope.remaining_capacity(), Some(0));

            let mut scope = Scope::bounded(8).unwrap();
            let region = scope.allocate(&point().align_to(512).unwrap()).unwrap();
            assert_eq!(region.raw_start() % 64, 0);
            assert_eq!(scope.allocated_bytes(), 8);
        }
    }

    #[test]
    fn alignment_beyond_reservation_is_invalid() {
        let mut scope = Scope::bounded(64).unwrap();
        let too_wide = (mmap::page_size() * 2) as u64;
        assert_eq!(
            scope.allocate_bytes(8, too_wide).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(scope.allocated_bytes(), 0);
        assert_eq!(scope.remaining_capacity(), Some(64));
    }

    #[test]
    fn failed_allocation_leaves_scope_unchanged() {
        let mut scope = Scope::bounded(16).unwrap();
        scope.allocate_bytes(1, 1).unwrap();
        // Needs 7 bytes of padding plus 16.
        assert!(scope.allocate_bytes(16, 8).is_err());
        assert_eq!(scope.allocated_bytes(), 1);
        assert_eq!(scope.remaining_capacity(), Some(15));
        // Still usable for something that fits.
        scope.allocate_bytes(8, 8).unwrap();
        assert_eq!(scope.allocated_bytes(), 16);
    }

    #[test]
    fn allocations_are_aligned_and_zeroed() {
        let mut scope = Scope::unbounded();
        scope.allocate_bytes(3, 1).unwrap();
        let region = scope.allocate_bytes(16, 16).unwrap();
        assert_eq!(region.raw_start() % 16, 0);
        assert_eq!(region.to_vec().unwrap(), vec![0u8; 16]);
    }

    #[test]
    fn bad_alignment_is_invalid() {
        let mut scope = Scope::unbounded();
        assert_eq!(
            scope.allocate_bytes(8, 3).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            scope.allocate_bytes(8, 0).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn unsized_layout_is_unsupported() {
        let mut scope = Scope::unbounded();
        let open = Layout::of_open_sequence(int(8));
        assert_eq!(scope.allocate(&open).unwrap_err().kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn unbounded_scope_chains_blocks_and_keeps_old_regions() {
        let config = ScopeConfig {
            initial_block_bytes: 32,
            max_block_bytes: 128,
            ..ScopeConfig::new()
        };
        let mut scope = Scope::unbounded_with(config).unwrap();
        let regions: Vec<Region> = (0..10)
            .map(|i| {
                let region = scope.allocate_bytes(16, 8).unwrap();
                region.set(0, ByteOrder::LittleEndian, i as u64).unwrap();
                region
            })
            .collect();
        for (i, region) in regions.iter().enumerate() {
            assert_eq!(region.get::<u64>(0, ByteOrder::LittleEndian).unwrap(), i as u64);
        }
        assert_eq!(scope.allocated_bytes(), 160);
        assert!(scope.reserved_bytes() >= 160);
        let big = scope.allocate_bytes(1000, 8).unwrap();
        assert_eq!(big.byte_size(), 1000);
        assert_eq!(scope.byte_size(), None);
        assert_eq!(scope.remaining_capacity(), None);
    }

    #[test]
    fn array_allocation_uses_element_alignment() {
        let mut scope = Scope::unbounded();
        let region = scope.allocate_array(&int(64), 4).unwrap();
        assert_eq!(region.byte_size(), 32);
        assert_eq!(region.raw_start() % 8, 0);
    }

    #[test]
    fn allocate_copy_holds_bytes() {
        let mut scope = Scope::unbounded();
        let region = scope.allocate_copy(b"strata").unwrap();
        assert_eq!(region.to_vec().unwrap(), b"strata");
    }

    #[test]
    fn close_invalidates_regions_and_is_not_repeatable() {
        let mut scope = Scope::bounded(64).unwrap();
        let region = scope.allocate(&point()).unwrap();
        let addr = region.base_address();
        scope.close().unwrap();
        assert!(!scope.is_alive());
        assert_eq!(
            addr.get::<u32>(ByteOrder::BigEndian).unwrap_err().kind(),
            ErrorKind::IllegalState
        );
        assert_eq!(scope.close().unwrap_err().kind(), ErrorKind::IllegalState);
        assert_eq!(scope.allocate(&point()).unwrap_err().kind(), ErrorKind::IllegalState);
        assert_eq!(scope.allocated_bytes(), 8);
    }

    #[test]
    fn scope_regions_cannot_be_closed_individually() {
        let mut scope = Scope::unbounded();
        let region = scope.allocate_bytes(8, 8).unwrap();
        assert_eq!(region.close().unwrap_err().kind(), ErrorKind::Unsupported);
        assert_eq!(
            region.handoff(thread::current().id()).unwrap_err().kind(),
            ErrorKind::Unsupported
        );
    }

    #[test]
    fn foreign_thread_is_rejected() {
        let mut scope = Scope::unbounded();
        let err = thread::scope(|s| s.spawn(|| scope.allocate_bytes(8, 8)).join().unwrap())
            .unwrap_err();
        assert!(matches!(err, MemoryError::WrongThread { .. }));
        let err = thread::scope(|s| s.spawn(|| scope.close()).join().unwrap()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalState);
        assert!(scope.close().is_ok());
    }

    #[test]
    fn drop_on_owner_thread_closes() {
        let region = {
            let mut scope = Scope::unbounded();
            scope.allocate_bytes(8, 8).unwrap()
        };
        assert!(!region.is_alive());
    }

    #[test]
    fn pooled_scopes_reuse_blocks_with_fresh_identity() {
        let pool = BlockPool::new(4).into_shared();
        let mut first = Scope::unbounded_pooled(ScopeConfig::new(), pool.clone()).unwrap();
        let old = first.allocate_bytes(64, 8).unwrap();
        old.fill(0xAB).unwrap();
        first.close().unwrap();
        assert_eq!(pool.retained(), 1);

        let mut second = Scope::unbounded_pooled(ScopeConfig::new(), pool.clone()).unwrap();
        let new = second.allocate_bytes(64, 8).unwrap();
        assert_eq!(pool.retained(), 0);
        assert_ne!(new.id(), old.id());
        assert_eq!(new.to_vec().unwrap(), vec![0u8; 64]);
        assert_eq!(old.get::<u8>(0, ByteOrder::LittleEndian).unwrap_err().kind(), ErrorKind::IllegalState);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn bounded_scope_never_overcommits(
                capacity in 0u64..256,
                requests in proptest::collection::vec((0u64..64, 0u32..10), 0..32),
            ) {
                let mut scope = Scope::bounded(capacity).unwrap();
                for (size, align_log) in requests {
                    let before = scope.allocated_bytes();
                    match scope.allocate_bytes(size, 1 << align_log) {
                        Ok(region) => {
                            prop_assert_eq!(region.byte_size(), size);
                            prop_assert_eq!(region.raw_start() % (1 << align_log), 0);
                        }
                        Err(err) => {
                            prop_assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
                            prop_assert_eq!(scope.allocated_bytes(), before);
                        }
                    }
                    prop_assert!(scope.allocated_bytes() <= capacity);
                    prop_assert_eq!(
                        scope.remaining_capacity(),
                        Some(capacity - scope.allocated_bytes())
                    );
                }
            }
        }
    }
}
