//! Access modes carried by region views.

use bitflags::bitflags;

bitflags! {
    /// Operations a region view permits.
    ///
    /// Views derived from a region (slices, restricted views) may only
    /// narrow the set, never widen it.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct AccessModes: u8 {
        /// Reads and bulk copies out of the region.
        const READ = 1 << 0;
        /// Writes and bulk copies into the region.
        const WRITE = 1 << 1;
        /// Explicitly closing the region.
        const CLOSE = 1 << 2;
        /// Transferring the region to another thread.
        const HANDOFF = 1 << 3;
    }
}

impl AccessModes {
    /// Modes of a freshly allocated, fully owned region.
    pub const FULL: AccessModes = AccessModes::READ
        .union(AccessModes::WRITE)
        .union(AccessModes::CLOSE)
        .union(AccessModes::HANDOFF);

    /// Read and write, without lifecycle control.
    pub const READ_WRITE: AccessModes = AccessModes::READ.union(AccessModes::WRITE);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_contains_every_mode() {
        assert_eq!(AccessModes::FULL, AccessModes::all());
    }

    #[test]
    fn read_write_excludes_lifecycle() {
        assert!(!AccessModes::READ_WRITE.contains(AccessModes::CLOSE));
        assert!(AccessModes::FULL.contains(AccessModes::READ_WRITE));
    }
}
