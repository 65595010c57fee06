//! Platforms without `mmap(2)`: every mapping request fails.

#![allow(unsafe_code)]

use std::fs::File;
use std::io;

use crate::mapped::MapMode;

fn unsupported() -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        "memory-mapped files are not supported on this platform",
    )
}

pub(crate) fn map(_file: &File, _offset: u64, _len: usize, _mode: MapMode) -> io::Result<*mut u8> {
    Err(unsupported())
}

/// # Safety
///
/// Never called: [`map`] never succeeds here.
pub(crate) unsafe fn unmap(_ptr: *mut u8, _len: usize) -> io::Result<()> {
    Err(unsupported())
}

/// # Safety
///
/// Never called: [`map`] never succeeds here.
pub(crate) unsafe fn flush(_ptr: *mut u8, _len: usize) -> io::Result<()> {
    Err(unsupported())
}

pub(crate) fn page_size() -> usize {
    4096
}
