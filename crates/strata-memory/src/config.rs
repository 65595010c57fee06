//! Scope configuration parameters.

use strata_core::{MemoryError, Result};

/// Configuration for unbounded scopes and their block pools.
///
/// Controls block sizing and how many released blocks a pool retains.
/// Checked by [`validate`](Self::validate) when a scope is built from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopeConfig {
    /// Size of the first block an unbounded scope reserves, in bytes.
    ///
    /// Default: 4096. Each following block doubles in size until
    /// `max_block_bytes` is reached.
    pub initial_block_bytes: usize,

    /// Largest block an unbounded scope grows to, in bytes.
    ///
    /// Default: 1 MiB. Requests that do not fit in a block of this size get
    /// a dedicated block of their own.
    pub max_block_bytes: usize,

    /// Alignment of every reserved block, in bytes.
    ///
    /// Default: 16. Must be a power of two.
    pub block_alignment: usize,

    /// How many released blocks a [`BlockPool`](crate::BlockPool) keeps for reuse.
    ///
    /// Default: 8. The limit is soft under concurrent release.
    pub retain_blocks: usize,
}

impl ScopeConfig {
    /// Default first block size.
    pub const DEFAULT_INITIAL_BLOCK_BYTES: usize = 4096;

    /// Default growth ceiling for a single block.
    pub const DEFAULT_MAX_BLOCK_BYTES: usize = 1 << 20;

    /// Default block alignment.
    pub const DEFAULT_BLOCK_ALIGNMENT: usize = 16;

    /// Default number of retained blocks per pool.
    pub const DEFAULT_RETAIN_BLOCKS: usize = 8;

    /// A config with every parameter at its default.
    pub fn new() -> Self {
        Self {
            initial_block_bytes: Self::DEFAULT_INITIAL_BLOCK_BYTES,
            max_block_bytes: Self::DEFAULT_MAX_BLOCK_BYTES,
            block_alignment: Self::DEFAULT_BLOCK_ALIGNMENT,
            retain_blocks: Self::DEFAULT_RETAIN_BLOCKS,
        }
    }

    /// Reject parameter combinations no scope can honor.
    pub fn validate(&self) -> Result<()> {
        if self.initial_block_bytes == 0 {
            return Err(MemoryError::invalid("initial_block_bytes must be non-zero"));
        }
        if self.max_block_bytes < self.initial_block_bytes {
            return Err(MemoryError::invalid(format!(
                "max_block_bytes ({}) is smaller than initial_block_bytes ({})",
                self.max_block_bytes, self.initial_block_bytes
            )));
        }
        if !self.block_alignment.is_power_of_two() {
            return Err(MemoryError::invalid(format!(
                "block_alignment {} is not a power of two",
                self.block_alignment
            )));
        }
        Ok(())
    }
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self::new()
    }
}
