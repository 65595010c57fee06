//! Memory-mapped file backing for regions.

#![allow(unsafe_code)]

use std::fs::{File, OpenOptions};
use std::path::Path;

use log::{debug, warn};
use strata_core::{MemoryError, Result};

use crate::mmap;

/// How a file is mapped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MapMode {
    /// Shared, read-only. The resulting region has no write mode.
    ReadOnly,
    /// Shared, read-write. Writes reach the file; `force` flushes them.
    ReadWrite,
    /// Copy-on-write. Writes stay private to the mapping.
    Private,
}

impl MapMode {
    /// Whether regions over this mapping may be written.
    pub fn is_writable(self) -> bool {
        !matches!(self, Self::ReadOnly)
    }
}

/// A live file mapping. Unmapped on drop.
pub(crate) struct MappedFile {
    /// Page-aligned start of the mapping.
    map_ptr: *mut u8,
    map_len: usize,
    /// Offset of the requested range inside the mapping.
    lead: usize,
    mode: MapMode,
}

// SAFETY: the mapping is exclusively owned and only reachable via raw pointers
// handed out under the owning region's checks.
unsafe impl Send for MappedFile {}
// SAFETY: as above.
unsafe impl Sync for MappedFile {}

impl MappedFile {
    /// Map `len` bytes of the file at `path`, starting at byte `offset`.
    ///
    /// Read-write mappings grow the file to cover the range. Other modes
    /// reject ranges past the end of the file.
    pub(crate) fn open(path: &Path, offset: u64, len: u64, mode: MapMode) -> Result<Self> {
        if len == 0 {
            return Err(MemoryError::invalid("cannot map an empty range"));
        }
        let end = offset
            .checked_add(len)
            .ok_or_else(|| MemoryError::invalid("mapped range overflows"))?;
        let len = usize::try_from(len)
            .map_err(|_| MemoryError::invalid(format!("cannot map {len} bytes on this target")))?;

        let file = open_file(path, mode)?;
        let file_len = file.metadata()?.len();
        if file_len < end {
            if mode == MapMode::ReadWrite {
                file.set_len(end)?;
            } else {
                return Err(MemoryError::invalid(format!(
                    "range {offset}..{end} lies past the end of {} ({file_len} bytes)",
                    path.display()
                )));
            }
        }

        let page = mmap::page_size() as u64;
        let aligned_offset = offset & !(page - 1);
        let lead = (offset - aligned_offset) as usize;
        let map_len = len + lead;
        let map_ptr = mmap::map(&file, aligned_offset, map_len, mode)?;
        debug!(
            "mapped {} [{offset}..{end}) as {mode:?}",
            path.display()
        );
        Ok(Self {
            map_ptr,
            map_len,
            lead,
            mode,
        })
    }

    /// First byte of the requested range.
    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.map_ptr.wrapping_add(self.lead)
    }

    pub(crate) fn len(&self) -> usize {
        self.map_len - self.lead
    }

    pub(crate) fn mode(&self) -> MapMode {
        self.mode
    }

    /// Write back `[start, start + len)` of the requested range.
    ///
    /// The caller has already bounds-checked the range. A no-op for modes
    /// whose writes never reach the file.
    pub(crate) fn flush(&self, start: usize, len: usize) -> Result<()> {
        if self.mode != MapMode::ReadWrite || len == 0 {
            return Ok(());
        }
        let page = mmap::page_size();
        let first = self.lead + start;
        let aligned = first & !(page - 1);
        let span = first + len - aligned;
        // SAFETY: `aligned` is page-aligned, not before the mapping start
        // (which is itself page-aligned), and `aligned + span` stays within
        // `map_len` because the caller checked `start + len`.
        unsafe { mmap::flush(self.map_ptr.wrapping_add(aligned), span)? };
        debug!("flushed {span} mapped bytes at page offset {aligned}");
        Ok(())
    }
}

impl Drop for MappedFile {
    fn drop(&mut self) {
        // SAFETY: the mapping was created in `open` and is dropped once.
        if let Err(err) = unsafe { mmap::unmap(self.map_ptr, self.map_len) } {
            warn!("failed to unmap {} bytes: {err}", self.map_len);
        }
    }
}

fn open_file(path: &Path, mode: MapMode) -> Result<File> {
    let mut options = OpenOptions::new();
    options.read(true);
    if mode == MapMode::ReadWrite {
        options.write(true);
    }
    Ok(options.open(path)?)
}
