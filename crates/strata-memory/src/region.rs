//! Owned memory regions and the views that share them.
//!
//! A [`Region`] is a view (`start`, `len`, access modes) over a shared
//! [`RegionCore`] that owns the backing storage. Slices and restricted
//! views are cheap clones of the view; they all observe the same liveness
//! flag, so closing any of them invalidates the rest.
//!
//! Every access runs the same checks, in this order:
//!
//! 1. the region is still open,
//! 2. the caller is on the owning thread (unless the region is unconfined),
//! 3. the view carries the access mode the operation needs,
//! 4. the accessed range lies inside the view.

#![allow(unsafe_code)]

use std::fmt;
use std::path::Path;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

use log::{debug, trace};
use parking_lot::Mutex;
use strata_core::{AccessModes, ByteOrder, MemoryError, RegionId, Resource, Result};

use crate::address::Address;
use crate::carrier::Carrier;
use crate::mapped::{MapMode, MappedFile};
use crate::raw::{self, HeapBlock, NativeBlock};

/// What kind of storage sits behind a region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackingKind {
    /// The universal empty region that raw addresses are bound to.
    Nothing,
    /// Memory from the global allocator.
    Native,
    /// A byte vector moved into the region.
    Heap,
    /// A memory-mapped file.
    Mapped(MapMode),
}

impl BackingKind {
    /// Whether addresses into this storage have a meaningful absolute value.
    ///
    /// Heap regions are the only ones whose addresses are only meaningful
    /// relative to the region itself.
    pub fn is_off_heap(self) -> bool {
        !matches!(self, Self::Heap)
    }
}

pub(crate) enum Backing {
    Native(NativeBlock),
    Heap(HeapBlock),
    Mapped(MappedFile),
}

impl Backing {
    fn as_ptr(&self) -> *mut u8 {
        match self {
            Self::Native(block) => block.as_ptr(),
            Self::Heap(block) => block.as_ptr(),
            Self::Mapped(file) => file.as_ptr(),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Native(block) => block.size(),
            Self::Heap(block) => block.len(),
            Self::Mapped(file) => file.len(),
        }
    }

    fn kind(&self) -> BackingKind {
        match self {
            Self::Native(_) => BackingKind::Native,
            Self::Heap(_) => BackingKind::Heap,
            Self::Mapped(file) => BackingKind::Mapped(file.mode()),
        }
    }
}

/// Identity, confinement, and storage shared by every view of a region.
struct RegionCore {
    id: RegionId,
    base: *mut u8,
    size: usize,
    kind: BackingKind,
    /// `None` for the unconfined empty region.
    owner: Option<ThreadId>,
    closed: AtomicBool,
    /// Taken exactly once, by whichever close path wins `closed`.
    storage: Mutex<Option<Backing>>,
}

// SAFETY: `base` points into `storage`, which is only released after
// `closed` is set; memory behind `base` is only touched by the owner thread
// after a successful liveness check.
unsafe impl Send for RegionCore {}
// SAFETY: as above; the shared state is an atomic flag and a mutex.
unsafe impl Sync for RegionCore {}

impl RegionCore {
    fn new(backing: Backing, id: RegionId, owner: ThreadId) -> Self {
        Self {
            id,
            base: backing.as_ptr(),
            size: backing.len(),
            kind: backing.kind(),
            owner: Some(owner),
            closed: AtomicBool::new(false),
            storage: Mutex::new(Some(backing)),
        }
    }

    /// Mark the core closed and hand back its storage. Only the first call
    /// gets the storage.
    fn release(&self) -> Option<Backing> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return None;
        }
        self.storage.lock().take()
    }
}

/// A checked view over native, heap, or mapped memory.
///
/// Cloning a region clones the view, not the memory.
#[derive(Clone)]
pub struct Region {
    core: Arc<RegionCore>,
    /// Offset of this view from the start of the backing storage.
    start: usize,
    len: usize,
    modes: AccessModes,
}

fn to_usize(value: u64, what: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| MemoryError::invalid(format!("{what} {value} does not fit this target")))
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl Region {
    /// Allocate `size` zeroed bytes aligned to `alignment`, confined to the
    /// calling thread, with every access mode.
    pub fn allocate_native(size: u64, alignment: u64) -> Result<Region> {
        if !alignment.is_power_of_two() {
            return Err(MemoryError::invalid(format!(
                "alignment {alignment} is not a power of two"
            )));
        }
        let block = NativeBlock::allocate(to_usize(size, "size")?, to_usize(alignment, "alignment")?)?;
        Ok(Self::from_native(block, AccessModes::FULL))
    }

    pub(crate) fn from_native(block: NativeBlock, modes: AccessModes) -> Region {
        Self::from_backing(Backing::Native(block), modes)
    }

    /// Wrap a byte vector, confined to the calling thread, with every
    /// access mode. Addresses into it can only be rebased within it.
    pub fn from_vec(bytes: Vec<u8>) -> Region {
        Self::from_backing(Backing::Heap(HeapBlock::from_vec(bytes)), AccessModes::FULL)
    }

    /// Map `len` bytes of the file at `path`, starting at byte `offset`.
    ///
    /// Read-only mappings produce a region without write mode. Read-write
    /// mappings extend the file to cover the range.
    pub fn map_file(path: impl AsRef<Path>, offset: u64, len: u64, mode: MapMode) -> Result<Region> {
        let file = MappedFile::open(path.as_ref(), offset, len, mode)?;
        let modes = if mode.is_writable() {
            AccessModes::FULL
        } else {
            AccessModes::FULL - AccessModes::WRITE
        };
        Ok(Self::from_backing(Backing::Mapped(file), modes))
    }

    /// The empty, unconfined region with no access modes.
    ///
    /// Raw addresses are bound to it; nothing can be read or written
    /// through it, and it can never be closed.
    pub fn nothing() -> Region {
        static NOTHING: OnceLock<Region> = OnceLock::new();
        NOTHING
            .get_or_init(|| Region {
                core: Arc::new(RegionCore {
                    id: RegionId::NOTHING,
                    base: ptr::null_mut(),
                    size: 0,
                    kind: BackingKind::Nothing,
                    owner: None,
                    closed: AtomicBool::new(false),
                    storage: Mutex::new(None),
                }),
                start: 0,
                len: 0,
                modes: AccessModes::empty(),
            })
            .clone()
    }

    fn from_backing(backing: Backing, modes: AccessModes) -> Region {
        let len = backing.len();
        let core = RegionCore::new(backing, RegionId::next(), thread::current().id());
        trace!("created {} ({:?}, {len} bytes)", core.id, core.kind);
        Region {
            core: Arc::new(core),
            start: 0,
            len,
            modes,
        }
    }

    /// Identity of the underlying storage; shared by every view of it.
    pub fn id(&self) -> RegionId {
        self.core.id
    }

    /// Length of this view in bytes.
    pub fn byte_size(&self) -> u64 {
        self.len as u64
    }

    /// Operations this view permits.
    pub fn access_modes(&self) -> AccessModes {
        self.modes
    }

    /// Whether the region has not been closed.
    pub fn is_alive(&self) -> bool {
        !self.core.closed.load(Ordering::Acquire)
    }

    /// The thread allowed to access the region, or `None` if unconfined.
    pub fn owner_thread(&self) -> Option<ThreadId> {
        self.core.owner
    }

    /// Kind of storage behind the region.
    pub fn backing_kind(&self) -> BackingKind {
        self.core.kind
    }

    /// Whether this view lacks write mode.
    pub fn is_read_only(&self) -> bool {
        !self.modes.contains(AccessModes::WRITE)
    }

    /// Whether `other` is a view of the same storage.
    pub fn same_backing(&self, other: &Region) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }

    /// Address of the first byte of this view.
    pub fn base_address(&self) -> Address {
        Address::new(self.clone(), 0)
    }

    /// Address `offset` bytes into this view. Not checked until dereferenced.
    pub fn address_at(&self, offset: i64) -> Address {
        Address::new(self.clone(), offset)
    }

    /// Absolute position of this view's first byte.
    pub(crate) fn raw_start(&self) -> usize {
        self.core.base as usize + self.start
    }

    /// Offset of this view inside the backing storage.
    pub(crate) fn view_start(&self) -> usize {
        self.start
    }

    // ── checks ──────────────────────────────────────────────────

    pub(crate) fn check_alive(&self) -> Result<()> {
        if !self.is_alive() {
            return Err(MemoryError::AlreadyClosed {
                resource: Resource::Region(self.id()),
            });
        }
        if let Some(owner) = self.core.owner {
            let accessor = thread::current().id();
            if accessor != owner {
                return Err(MemoryError::WrongThread {
                    resource: Resource::Region(self.id()),
                    owner,
                    accessor,
                });
            }
        }
        Ok(())
    }

    pub(crate) fn check_modes(&self, needed: AccessModes, operation: &'static str) -> Result<()> {
        if self.modes.contains(needed) {
            return Ok(());
        }
        Err(MemoryError::unsupported(
            operation,
            format!(
                "{} view permits {:?}, needs {:?}",
                self.id(),
                self.modes,
                needed
            ),
        ))
    }

    /// Check that the view can be read right now, from this thread: open,
    /// confined here (or unconfined), with read mode. Bounds are checked
    /// per access.
    pub fn check_readable(&self) -> Result<()> {
        self.check_alive()?;
        self.check_modes(AccessModes::READ, "read")
    }

    /// Pointer to `offset`, after checking that `[offset, offset + size)`
    /// lies inside the view.
    pub(crate) fn check_bounds(&self, offset: i64, size: i64) -> Result<*mut u8> {
        let length = self.len as u64;
        let out_of_bounds = || MemoryError::OutOfBounds {
            region: self.id(),
            offset,
            size,
            length,
        };
        if offset < 0 || size < 0 {
            return Err(out_of_bounds());
        }
        let end = (offset as u64)
            .checked_add(size as u64)
            .ok_or_else(out_of_bounds)?;
        if end > length {
            return Err(out_of_bounds());
        }
        Ok(self.core.base.wrapping_add(self.start + offset as usize))
    }

    fn checked(
        &self,
        offset: i64,
        size: usize,
        needed: AccessModes,
        operation: &'static str,
    ) -> Result<*mut u8> {
        self.check_alive()?;
        self.check_modes(needed, operation)?;
        self.check_bounds(offset, to_i64(size as u64))
    }

    // ── data access ─────────────────────────────────────────────

    /// Load a `T` stored at `offset` in the given byte order.
    pub fn get<T: Carrier>(&self, offset: i64, order: ByteOrder) -> Result<T> {
        let ptr = self.checked(offset, T::BYTES, AccessModes::READ, "read")?;
        let mut buf = [0u8; 8];
        let bytes = &mut buf[..T::BYTES];
        // SAFETY: `checked` confirmed the range is in bounds and live.
        unsafe { raw::load(ptr, bytes) };
        Ok(T::decode(bytes, order))
    }

    /// Store `value` at `offset` in the given byte order.
    pub fn set<T: Carrier>(&self, offset: i64, order: ByteOrder, value: T) -> Result<()> {
        let ptr = self.checked(offset, T::BYTES, AccessModes::WRITE, "write")?;
        let mut buf = [0u8; 8];
        let bytes = &mut buf[..T::BYTES];
        value.encode(bytes, order);
        // SAFETY: as in `get`.
        unsafe { raw::store(bytes, ptr) };
        Ok(())
    }

    /// Copy `dst.len()` bytes starting at `offset` into `dst`.
    pub fn read_bytes(&self, offset: i64, dst: &mut [u8]) -> Result<()> {
        let ptr = self.checked(offset, dst.len(), AccessModes::READ, "read")?;
        // SAFETY: as in `get`.
        unsafe { raw::load(ptr, dst) };
        Ok(())
    }

    /// Copy `src` into the region starting at `offset`.
    pub fn write_bytes(&self, offset: i64, src: &[u8]) -> Result<()> {
        let ptr = self.checked(offset, src.len(), AccessModes::WRITE, "write")?;
        // SAFETY: as in `get`.
        unsafe { raw::store(src, ptr) };
        Ok(())
    }

    /// Set every byte of the view to `value`.
    pub fn fill(&self, value: u8) -> Result<()> {
        let ptr = self.checked(0, self.len, AccessModes::WRITE, "fill")?;
        // SAFETY: as in `get`.
        unsafe { raw::fill(ptr, self.len, value) };
        Ok(())
    }

    /// The contents of the view.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        let mut out = vec![0u8; self.len];
        self.read_bytes(0, &mut out)?;
        Ok(out)
    }

    /// Copy all of `src` into the start of this view.
    pub fn copy_from(&self, src: &Region) -> Result<()> {
        Address::copy(&src.base_address(), &self.base_address(), to_i64(src.byte_size()))
    }

    // ── views ───────────────────────────────────────────────────

    /// A view of `len` bytes starting `offset` bytes into this one, with the
    /// same access modes.
    pub fn as_slice(&self, offset: u64, len: u64) -> Result<Region> {
        self.check_alive()?;
        self.check_bounds(to_i64(offset), to_i64(len))?;
        Ok(self.subregion(offset as usize, len as usize, self.modes))
    }

    /// The same view with a narrower set of access modes.
    ///
    /// Fails with invalid-argument if `modes` is not a subset of the
    /// current modes.
    pub fn with_access_modes(&self, modes: AccessModes) -> Result<Region> {
        if !self.modes.contains(modes) {
            return Err(MemoryError::invalid(format!(
                "cannot widen access modes from {:?} to {:?}",
                self.modes, modes
            )));
        }
        Ok(Region {
            modes,
            ..self.clone()
        })
    }

    /// An unchecked sub-view; the caller guarantees the range fits.
    pub(crate) fn subregion(&self, offset: usize, len: usize, modes: AccessModes) -> Region {
        debug_assert!(offset + len <= self.len);
        Region {
            core: Arc::clone(&self.core),
            start: self.start + offset,
            len,
            modes,
        }
    }

    // ── lifecycle ───────────────────────────────────────────────

    /// Close the region, releasing its storage. Every view of it becomes
    /// unusable.
    ///
    /// Needs close mode. Closing twice is an illegal-state error.
    pub fn close(&self) -> Result<()> {
        self.check_alive()?;
        self.check_modes(AccessModes::CLOSE, "close")?;
        drop(self.core.release());
        debug!("closed {}", self.id());
        Ok(())
    }

    /// Close the region without mode or thread checks and return its storage.
    pub(crate) fn release(&self) -> Option<Backing> {
        self.core.release()
    }

    /// Transfer the region to `thread`.
    ///
    /// This view (and every other view of the storage) is closed, and a new
    /// region with a fresh identity, confined to `thread`, takes over the
    /// same memory. Needs handoff mode.
    pub fn handoff(&self, thread: ThreadId) -> Result<Region> {
        self.check_alive()?;
        self.check_modes(AccessModes::HANDOFF, "handoff")?;
        let storage = self.core.release();
        let core = RegionCore {
            id: RegionId::next(),
            base: self.core.base,
            size: self.core.size,
            kind: self.core.kind,
            owner: Some(thread),
            closed: AtomicBool::new(false),
            storage: Mutex::new(storage),
        };
        debug!("handed {} off to {thread:?} as {}", self.id(), core.id);
        Ok(Region {
            core: Arc::new(core),
            start: self.start,
            len: self.len,
            modes: self.modes,
        })
    }

    /// Flush the whole view of a mapped file to storage.
    pub fn force(&self) -> Result<()> {
        self.force_range(0, self.byte_size())
    }

    /// Flush `len` bytes starting at `offset` of a mapped file to storage.
    ///
    /// Unsupported for regions that are not file-backed; a no-op for
    /// read-only and private mappings.
    pub fn force_range(&self, offset: u64, len: u64) -> Result<()> {
        self.check_alive()?;
        if !matches!(self.core.kind, BackingKind::Mapped(_)) {
            return Err(MemoryError::unsupported(
                "force",
                format!("{} is not backed by a mapped file", self.id()),
            ));
        }
        self.check_bounds(to_i64(offset), to_i64(len))?;
        let storage = self.core.storage.lock();
        match storage.as_ref() {
            Some(Backing::Mapped(file)) => file.flush(self.start + offset as usize, len as usize),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("id", &self.id())
            .field("kind", &self.core.kind)
            .field("start", &self.start)
            .field("len", &self.len)
            .field("modes", &self.modes)
            .field("alive", &self.is_alive())
            .finish()
    }
}
