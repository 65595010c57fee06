//! Owned raw storage and the unchecked byte primitives built on it.
//!
//! Nothing in this module validates bounds or liveness; callers in
//! `region` and `address` do that before reaching for these helpers.

#![allow(unsafe_code)]

use std::alloc::{self, Layout as AllocLayout};
use std::ptr::{self, NonNull};

use strata_core::{MemoryError, Result};

/// A zero-initialized allocation from the global allocator.
pub(crate) struct NativeBlock {
    ptr: NonNull<u8>,
    /// Requested size; the allocation itself is never smaller than one byte.
    size: usize,
    layout: AllocLayout,
}

// SAFETY: the block exclusively owns its allocation.
unsafe impl Send for NativeBlock {}
// SAFETY: no interior mutability is reachable through `&NativeBlock`.
unsafe impl Sync for NativeBlock {}

impl NativeBlock {
    /// Allocate `size` zeroed bytes aligned to `align`.
    pub(crate) fn allocate(size: usize, align: usize) -> Result<Self> {
        let failed = || MemoryError::AllocationFailed {
            bytes: size as u64,
            alignment: align as u64,
        };
        let layout = AllocLayout::from_size_align(size.max(1), align).map_err(|_| failed())?;
        // SAFETY: `layout` has a non-zero size.
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr).ok_or_else(failed)?;
        Ok(Self { ptr, size, layout })
    }

    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }

    pub(crate) fn align(&self) -> usize {
        self.layout.align()
    }

    /// Clear the block before it is handed out again.
    pub(crate) fn zero(&mut self) {
        // SAFETY: the allocation spans `layout.size()` writable bytes.
        unsafe { ptr::write_bytes(self.ptr.as_ptr(), 0, self.layout.size()) }
    }
}

impl Drop for NativeBlock {
    fn drop(&mut self) {
        // SAFETY: `ptr` was returned by `alloc_zeroed` with this layout.
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

/// A byte buffer moved off the Rust heap's ownership tracking so regions
/// can address it through a raw pointer.
pub(crate) struct HeapBlock {
    ptr: *mut u8,
    len: usize,
}

// SAFETY: the block exclusively owns its buffer.
unsafe impl Send for HeapBlock {}
// SAFETY: as for `NativeBlock`.
unsafe impl Sync for HeapBlock {}

impl HeapBlock {
    pub(crate) fn from_vec(bytes: Vec<u8>) -> Self {
        let boxed = bytes.into_boxed_slice();
        let len = boxed.len();
        let ptr = Box::into_raw(boxed) as *mut u8;
        Self { ptr, len }
    }

    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.ptr
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

impl Drop for HeapBlock {
    fn drop(&mut self) {
        // SAFETY: `ptr`/`len` describe the boxed slice leaked in `from_vec`.
        unsafe {
            drop(Box::from_raw(ptr::slice_from_raw_parts_mut(self.ptr, self.len)));
        }
    }
}

/// Copy `len` bytes, allowing the ranges to overlap.
///
/// # Safety
///
/// Both ranges must be valid for `len` bytes.
pub(crate) unsafe fn copy(src: *const u8, dst: *mut u8, len: usize) {
    ptr::copy(src, dst, len)
}

/// Read `dst.len()` bytes starting at `src`.
///
/// # Safety
///
/// `src` must be valid for reads of `dst.len()` bytes.
pub(crate) unsafe fn load(src: *const u8, dst: &mut [u8]) {
    ptr::copy_nonoverlapping(src, dst.as_mut_ptr(), dst.len())
}

/// Write `src` starting at `dst`.
///
/// # Safety
///
/// `dst` must be valid for writes of `src.len()` bytes.
pub(crate) unsafe fn store(src: &[u8], dst: *mut u8) {
    ptr::copy_nonoverlapping(src.as_ptr(), dst, src.len())
}

/// Set `len` bytes starting at `dst` to `value`.
///
/// # Safety
///
/// `dst` must be valid for writes of `len` bytes.
pub(crate) unsafe fn fill(dst: *mut u8, len: usize, value: u8) {
    ptr::write_bytes(dst, value, len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_block_is_zeroed_and_aligned() {
        let block = NativeBlock::allocate(100, 64).unwrap();
        assert_eq!(block.as_ptr() as usize % 64, 0);
        assert_eq!(block.size(), 100);
        assert_eq!(block.align(), 64);
        let mut bytes = [0xFFu8; 100];
        unsafe { load(block.as_ptr(), &mut bytes) };
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn zero_sized_native_block_allocates() {
        let block = NativeBlock::allocate(0, 8).unwrap();
        assert_eq!(block.size(), 0);
    }

    #[test]
    fn bad_alignment_fails_allocation() {
        let err = NativeBlock::allocate(8, 3).err().unwrap();
        assert!(matches!(err, MemoryError::AllocationFailed { alignment: 3, .. }));
    }

    #[test]
    fn zero_clears_previous_contents() {
        let mut block = NativeBlock::allocate(16, 8).unwrap();
        unsafe { fill(block.as_ptr(), 16, 0xAB) };
        block.zero();
        let mut bytes = [1u8; 16];
        unsafe { load(block.as_ptr(), &mut bytes) };
        assert_eq!(bytes, [0u8; 16]);
    }

    #[test]
    fn heap_block_keeps_contents() {
        let block = HeapBlock::from_vec(vec![1, 2, 3, 4]);
        assert_eq!(block.len(), 4);
        let mut out = [0u8; 4];
        unsafe { load(block.as_ptr(), &mut out) };
        assert_eq!(out, [1, 2, 3, 4]);
    }

    #[test]
    fn overlapping_copy_behaves_like_memmove() {
        let block = HeapBlock::from_vec((0u8..8).collect());
        unsafe { copy(block.as_ptr(), block.as_ptr().add(2), 6) };
        let mut out = [0u8; 8];
        unsafe { load(block.as_ptr(), &mut out) };
        assert_eq!(out, [0, 1, 0, 1, 2, 3, 4, 5]);
    }
}
