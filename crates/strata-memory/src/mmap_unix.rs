//! File mappings on unix via `mmap(2)`.

#![allow(unsafe_code)]

use std::fs::File;
use std::io;
use std::os::fd::AsRawFd;
use std::sync::OnceLock;

use crate::mapped::MapMode;

/// Map `len` bytes of `file` starting at the page-aligned `offset`.
///
/// Returns the base of the new mapping. `len` must be non-zero.
pub(crate) fn map(file: &File, offset: u64, len: usize, mode: MapMode) -> io::Result<*mut u8> {
    let (prot, flags) = match mode {
        MapMode::ReadOnly => (libc::PROT_READ, libc::MAP_SHARED),
        MapMode::ReadWrite => (libc::PROT_READ | libc::PROT_WRITE, libc::MAP_SHARED),
        MapMode::Private => (libc::PROT_READ | libc::PROT_WRITE, libc::MAP_PRIVATE),
    };
    let offset = libc::off_t::try_from(offset)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "file offset out of range"))?;
    // SAFETY: a fresh mapping at a kernel-chosen address aliases no Rust
    // object; the descriptor stays open for the duration of the call.
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            len,
            prot,
            flags,
            file.as_raw_fd(),
            offset,
        )
    };
    if ptr.is_null() || ptr == libc::MAP_FAILED {
        return Err(io::Error::last_os_error());
    }
    Ok(ptr.cast())
}

/// Remove a mapping created by [`map`].
///
/// # Safety
///
/// `ptr` and `len` must describe a live mapping returned by [`map`], and
/// nothing may access it afterwards.
pub(crate) unsafe fn unmap(ptr: *mut u8, len: usize) -> io::Result<()> {
    let res = unsafe { libc::munmap(ptr.cast(), len) };
    if res < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Synchronously write back the pages covering `[ptr, ptr + len)`.
///
/// # Safety
///
/// `ptr` must be page-aligned and the range must lie inside a live mapping.
pub(crate) unsafe fn flush(ptr: *mut u8, len: usize) -> io::Result<()> {
    let res = unsafe { libc::msync(ptr.cast(), len, libc::MS_SYNC) };
    if res < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// The system page size, cached after the first call.
pub(crate) fn page_size() -> usize {
    static PAGE_SIZE: OnceLock<usize> = OnceLock::new();
    *PAGE_SIZE.get_or_init(|| {
        // SAFETY: sysconf has no memory-safety preconditions.
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size > 0 {
            size as usize
        } else {
            4096
        }
    })
}
