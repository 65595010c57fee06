//! Bump-allocated native blocks and the growable chains scopes carve from.
//!
//! A [`Block`] is one native region with a cursor. A [`BlockChain`] is the
//! list of blocks a scope owns; unbounded scopes append to it when the
//! current block is full, bounded scopes never do.

use log::{debug, trace};
use strata_core::{AccessModes, MemoryError, Result};

use crate::block_pool::SharedBlockPool;
use crate::config::ScopeConfig;
use crate::raw::NativeBlock;
use crate::region::{Backing, Region};

/// A single native region with bump allocation.
///
/// Alignment is computed against the absolute address, so an allocation
/// aligned to more than the block's own alignment still lands correctly.
/// Up to [`alignment`](Self::alignment) the padding depends only on the
/// cursor, never on where the allocator placed the block.
pub(crate) struct Block {
    /// Root view with every access mode; never handed out.
    region: Region,
    /// Bytes consumed so far, padding included.
    cursor: usize,
    align: usize,
}

impl Block {
    pub(crate) fn new(native: NativeBlock) -> Self {
        let align = native.align();
        Self {
            region: Region::from_native(native, AccessModes::FULL),
            cursor: 0,
            align,
        }
    }

    /// Alignment the block start is guaranteed to have.
    pub(crate) fn alignment(&self) -> usize {
        self.align
    }

    /// `(start, end)` of an allocation placed at the cursor, if it fits.
    fn fit(&self, size: usize, align: usize) -> Option<(usize, usize)> {
        let base = self.region.raw_start();
        let here = base.checked_add(self.cursor)?;
        let aligned = here.checked_add(align - 1)? & !(align - 1);
        let start = aligned - base;
        let end = start.checked_add(size)?;
        (end <= self.capacity()).then_some((start, end))
    }

    /// Carve `size` bytes aligned to `align`.
    ///
    /// Returns the read-write view and the bytes consumed (alignment
    /// padding included), or `None` if the block is too full. Nothing
    /// changes on failure.
    pub(crate) fn bump(&mut self, size: usize, align: usize) -> Option<(Region, usize)> {
        let (start, end) = self.fit(size, align)?;
        let consumed = end - self.cursor;
        self.cursor = end;
        Some((self.region.subregion(start, size, AccessModes::READ_WRITE), consumed))
    }

    /// Bytes an allocation at the cursor would consume, whether or not it fits.
    pub(crate) fn demand(&self, size: usize, align: usize) -> u64 {
        let here = self.region.raw_start() as u64 + self.cursor as u64;
        let padding = here.wrapping_neg() & (align as u64 - 1);
        padding.saturating_add(size as u64)
    }

    pub(crate) fn used(&self) -> usize {
        self.cursor
    }

    pub(crate) fn capacity(&self) -> usize {
        self.region.byte_size() as usize
    }

    pub(crate) fn remaining(&self) -> usize {
        self.capacity() - self.cursor
    }

    /// Close the block's region, invalidating every view carved from it.
    fn release(self) -> Option<Backing> {
        self.region.release()
    }
}

/// The blocks owned by one scope.
///
/// The last block is the one being filled. Growth doubles the block size
/// up to `max_block_bytes`; oversized requests get a dedicated block that
/// is slotted in before the current one.
pub(crate) struct BlockChain {
    blocks: Vec<Block>,
    next_block_bytes: usize,
    config: ScopeConfig,
    pool: Option<SharedBlockPool>,
}

impl BlockChain {
    /// An empty chain; the first block is reserved on first growth.
    pub(crate) fn new(config: ScopeConfig, pool: Option<SharedBlockPool>) -> Self {
        Self {
            blocks: Vec::new(),
            next_block_bytes: config.initial_block_bytes,
            config,
            pool,
        }
    }

    /// A chain holding exactly `block`.
    pub(crate) fn single(block: Block, config: ScopeConfig) -> Self {
        Self {
            blocks: vec![block],
            next_block_bytes: config.initial_block_bytes,
            config,
            pool: None,
        }
    }

    pub(crate) fn current(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Carve from the current block only.
    pub(crate) fn bump(&mut self, size: usize, align: usize) -> Option<(Region, usize)> {
        self.blocks.last_mut()?.bump(size, align)
    }

    /// Append a block large enough for the request and carve from it.
    pub(crate) fn grow(&mut self, size: usize, align: usize) -> Result<(Region, usize)> {
        let failed = || MemoryError::AllocationFailed {
            bytes: size as u64,
            alignment: align as u64,
        };
        let needed = size.checked_add(align - 1).ok_or_else(failed)?;

        if needed > self.config.max_block_bytes {
            let native = NativeBlock::allocate(size, align.max(self.config.block_alignment))?;
            let mut block = Block::new(native);
            let carved = block.bump(size, align).ok_or_else(failed)?;
            let at = self.blocks.len().saturating_sub(1);
            self.blocks.insert(at, block);
            debug!("reserved dedicated {size}-byte block");
            return Ok(carved);
        }

        let block_bytes = self.next_block_bytes.max(needed);
        self.next_block_bytes = block_bytes
            .saturating_mul(2)
            .min(self.config.max_block_bytes);
        let pooled = self
            .pool
            .as_ref()
            .and_then(|pool| pool.take(block_bytes, self.config.block_alignment));
        let native = match pooled {
            Some(native) => {
                trace!("reusing pooled {}-byte block", native.size());
                native
            }
            None => {
                debug!("reserving {block_bytes}-byte block");
                NativeBlock::allocate(block_bytes, self.config.block_alignment)?
            }
        };
        let mut block = Block::new(native);
        let carved = block.bump(size, align).ok_or_else(failed)?;
        self.blocks.push(block);
        Ok(carved)
    }

    /// Close every block, newest first, recycling what the pool will take.
    ///
    /// Returns the number of blocks released.
    pub(crate) fn release_all(&mut self) -> usize {
        let released = self.blocks.len();
        while let Some(block) = self.blocks.pop() {
            let backing = block.release();
            if let (Some(Backing::Native(native)), Some(pool)) = (backing, &self.pool) {
                if native.size() <= self.config.max_block_bytes {
                    pool.recycle(native);
                }
            }
        }
        released
    }

    pub(crate) fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Total bytes reserved across all blocks.
    pub(crate) fn reserved_bytes(&self) -> usize {
        self.blocks.iter().map(Block::capacity).sum()
    }
}
