//! A cross-thread pool of released native blocks.
//!
//! Closing a pooled scope hands its blocks back here instead of returning
//! them to the allocator; the next scope to grow takes one back out. The
//! pool is a [`RecyclingQueue`], so put and take never block on anything
//! heavier than a spin flag.
//!
//! Recycled blocks are always wrapped in a fresh region with a fresh
//! identity, so a view carved from the closed scope can never observe the
//! block's next life.

use std::fmt;
use std::sync::Arc;

use log::{trace, warn};
use strata_pool::RecyclingQueue;

use crate::config::ScopeConfig;
use crate::raw::NativeBlock;

/// Shared handle to a [`BlockPool`].
pub type SharedBlockPool = Arc<BlockPool>;

/// Released native blocks awaiting reuse.
pub struct BlockPool {
    queue: RecyclingQueue<NativeBlock>,
    max_retained: usize,
}

impl BlockPool {
    /// A pool keeping at most `max_retained` blocks (softly, under
    /// concurrent release).
    pub fn new(max_retained: usize) -> Self {
        Self {
            queue: RecyclingQueue::new(),
            max_retained,
        }
    }

    /// A pool sized by [`ScopeConfig::retain_blocks`].
    pub fn with_config(config: &ScopeConfig) -> Self {
        Self::new(config.retain_blocks)
    }

    /// Wrap the pool for sharing between scopes and threads.
    pub fn into_shared(self) -> SharedBlockPool {
        Arc::new(self)
    }

    /// Number of blocks currently retained. A snapshot.
    pub fn retained(&self) -> usize {
        self.queue.size()
    }

    /// The retention limit.
    pub fn max_retained(&self) -> usize {
        self.max_retained
    }

    /// Take the most recently released block if it is at least `min_size`
    /// bytes and aligned to at least `align`. The block is zeroed.
    ///
    /// An unsuitable head block is put back and `None` is returned.
    pub(crate) fn take(&self, min_size: usize, align: usize) -> Option<NativeBlock> {
        let entry = self.queue.poll_entry()?;
        if entry.get().size() < min_size || entry.get().align() < align {
            let size = entry.get().size();
            if let Err(err) = self.queue.put_entry(entry) {
                warn!("dropped unsuitable pooled block: {err}");
                return None;
            }
            trace!("pooled {size}-byte block unsuitable for {min_size} bytes aligned to {align}");
            return None;
        }
        let mut block = entry.into_inner();
        block.zero();
        Some(block)
    }

    /// Offer a block for reuse. Returns whether the pool kept it; a
    /// rejected block is freed.
    pub(crate) fn recycle(&self, block: NativeBlock) -> bool {
        if self.max_retained == 0 {
            return false;
        }
        let size = block.size();
        let entry = self.queue.allocate_entry(block);
        let kept = match self.queue.put_entry_if_size(entry, self.max_retained - 1) {
            Ok(kept) => kept,
            Err(err) => {
                warn!("failed to retain {size}-byte block: {err}");
                false
            }
        };
        trace!("recycled {size}-byte block: kept={kept}");
        kept
    }
}

impl Default for BlockPool {
    fn default() -> Self {
        Self::with_config(&ScopeConfig::default())
    }
}

impl fmt::Debug for BlockPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockPool")
            .field("retained", &self.retained())
            .field("max_retained", &self.max_retained)
            .finish()
    }
}
