//! Addresses: a region plus a signed byte offset into it.
//!
//! Constructing or moving an address never checks anything. The checks of
//! the bound region run when the address is dereferenced or used in a copy.

#![allow(unsafe_code)]

use std::fmt;

use strata_core::{AccessModes, ByteOrder, MemoryError, Result};

use crate::carrier::Carrier;
use crate::raw;
use crate::region::{BackingKind, Region};

/// A position relative to a region view.
///
/// Raw addresses (from [`Address::of_raw`]) are bound to
/// [`Region::nothing`], whose base is zero, so their offset is the absolute
/// position.
#[derive(Clone)]
pub struct Address {
    region: Region,
    offset: i64,
}

impl Address {
    pub(crate) fn new(region: Region, offset: i64) -> Self {
        Self { region, offset }
    }

    /// An address for the absolute position `raw`, bound to the empty region.
    pub fn of_raw(raw: u64) -> Address {
        Self::new(Region::nothing(), raw as i64)
    }

    /// The region this address is relative to.
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Offset from the start of [`region`](Self::region), in bytes.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// An address `delta` bytes away, in the same region.
    pub fn offset_by(&self, delta: i64) -> Address {
        Self::new(self.region.clone(), self.offset.wrapping_add(delta))
    }

    /// Whether this address is bound to the empty region.
    pub fn is_raw(&self) -> bool {
        self.region.backing_kind() == BackingKind::Nothing
    }

    fn absolute(&self) -> i64 {
        (self.region.raw_start() as i64).wrapping_add(self.offset)
    }

    /// The same position expressed relative to `target`.
    ///
    /// Off-heap positions (native, mapped, and raw) can be rebased onto any
    /// off-heap region. A heap position can only be rebased onto a view of
    /// the same heap storage. Every other combination is invalid-argument.
    pub fn rebase(&self, target: &Region) -> Result<Address> {
        let source_kind = self.region.backing_kind();
        let target_kind = target.backing_kind();
        let offset = if source_kind.is_off_heap() && target_kind.is_off_heap() {
            self.absolute().wrapping_sub(target.raw_start() as i64)
        } else if self.region.same_backing(target) {
            let from = self.region.view_start() as i64;
            from.wrapping_add(self.offset)
                .wrapping_sub(target.view_start() as i64)
        } else {
            return Err(MemoryError::invalid(format!(
                "cannot rebase an address in {} ({source_kind:?}) onto {} ({target_kind:?})",
                self.region.id(),
                target.id()
            )));
        };
        Ok(Self::new(target.clone(), offset))
    }

    /// The absolute position of an off-heap address.
    ///
    /// Unsupported for heap regions, whose positions are only meaningful
    /// relative to the region.
    pub fn to_raw(&self) -> Result<u64> {
        if !self.region.backing_kind().is_off_heap() {
            return Err(MemoryError::unsupported(
                "to_raw",
                format!("{} is heap-backed", self.region.id()),
            ));
        }
        Ok(self.absolute() as u64)
    }

    /// Load a `T` at this address.
    pub fn get<T: Carrier>(&self, order: ByteOrder) -> Result<T> {
        self.region.get(self.offset, order)
    }

    /// Store a `T` at this address.
    pub fn set<T: Carrier>(&self, order: ByteOrder, value: T) -> Result<()> {
        self.region.set(self.offset, order, value)
    }

    /// Copy `count` bytes from `src` to `dst`. The ranges may overlap.
    ///
    /// Checks run in a fixed order, and nothing is written unless all pass:
    /// a negative count is out-of-bounds; then both regions must be open and
    /// accessed from their owning threads; then `src` needs read mode and
    /// `dst` write mode; then both ranges must lie inside their views.
    pub fn copy(src: &Address, dst: &Address, count: i64) -> Result<()> {
        if count < 0 {
            return Err(MemoryError::OutOfBounds {
                region: dst.region.id(),
                offset: dst.offset,
                size: count,
                length: dst.region.byte_size(),
            });
        }
        src.region.check_alive()?;
        dst.region.check_alive()?;
        src.region.check_modes(AccessModes::READ, "copy")?;
        dst.region.check_modes(AccessModes::WRITE, "copy")?;
        let from = src.region.check_bounds(src.offset, count)?;
        let to = dst.region.check_bounds(dst.offset, count)?;
        // SAFETY: both ranges were checked to be live and in bounds.
        unsafe { raw::copy(from, to, count as usize) };
        Ok(())
    }
}

/// Two addresses are equal when they name the same position in the same
/// storage, whatever view they were taken from.
impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.region.same_backing(&other.region) && self.absolute() == other.absolute()
    }
}

impl Eq for Address {}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Address")
            .field("region", &self.region.id())
            .field("offset", &self.offset)
            .finish()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.region.id(), self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::ErrorKind;

    const LE: ByteOrder = ByteOrder::LittleEndian;

    fn filled(len: u8) -> Region {
        let region = Region::allocate_native(len as u64, 8).unwrap();
        let bytes: Vec<u8> = (0..len).collect();
        region.write_bytes(0, &bytes).unwrap();
        region
    }

    #[test]
    fn offset_by_moves_without_checking() {
        let region = filled(8);
        let addr = region.base_address().offset_by(100).offset_by(-97);
        assert_eq!(addr.offset(), 3);
        assert_eq!(addr.get::<u8>(LE).unwrap(), 3);
        assert_eq!(
            region.base_address().offset_by(8).get::<u8>(LE).unwrap_err().kind(),
            ErrorKind::OutOfBounds
        );
    }

    #[test]
    fn copy_moves_bytes() {
        let src = filled(8);
        let dst = Region::allocate_native(8, 8).unwrap();
        Address::copy(&src.address_at(2), &dst.address_at(0), 4).unwrap();
        assert_eq!(dst.to_vec().unwrap(), vec![2, 3, 4, 5, 0, 0, 0, 0]);
    }

    #[test]
    fn overlapping_copy_is_a_memmove() {
        let region = filled(8);
        Address::copy(&region.address_at(0), &region.address_at(2), 6).unwrap();
        assert_eq!(region.to_vec().unwrap(), vec![0, 1, 0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn negative_count_is_out_of_bounds() {
        let region = filled(8);
        let err = Address::copy(&region.base_address(), &region.base_address(), -1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfBounds);
    }

    #[test]
    fn copy_checks_liveness_before_bounds() {
        let src = filled(8);
        let dst = Region::allocate_native(4, 8).unwrap();
        dst.close().unwrap();
        let err = Address::copy(&src.base_address(), &dst.base_address(), 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalState);
    }

    #[test]
    fn copy_into_read_only_view_is_unsupported_and_writes_nothing() {
        let src = filled(8);
        let dst = Region::allocate_native(8, 8).unwrap();
        let read_only = dst.with_access_modes(AccessModes::READ).unwrap();
        let err = Address::copy(&src.base_address(), &read_only.base_address(), 8).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert_eq!(dst.to_vec().unwrap(), vec![0; 8]);
    }

    #[test]
    fn partial_overrun_writes_nothing() {
        let src = filled(8);
        let dst = Region::allocate_native(4, 8).unwrap();
        let err = Address::copy(&src.base_address(), &dst.base_address(), 8).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfBounds);
        assert_eq!(dst.to_vec().unwrap(), vec![0; 4]);
    }

    #[test]
    fn native_rebase_uses_absolute_position() {
        let region = filled(16);
        let slice = region.as_slice(4, 8).unwrap();
        let addr = region.address_at(6).rebase(&slice).unwrap();
        assert_eq!(addr.offset(), 2);
        assert_eq!(addr.get::<u8>(LE).unwrap(), 6);
        assert_eq!(addr, region.address_at(6));

        let raw = Address::of_raw(region.address_at(6).to_raw().unwrap());
        assert!(raw.is_raw());
        assert_eq!(raw.rebase(&region).unwrap().offset(), 6);
    }

    #[test]
    fn heap_rebase_stays_inside_its_storage() {
        let heap = Region::from_vec(vec![0; 16]);
        let slice = heap.as_slice(8, 8).unwrap();
        assert_eq!(heap.address_at(10).rebase(&slice).unwrap().offset(), 2);

        let other = Region::from_vec(vec![0; 16]);
        let native = Region::allocate_native(16, 8).unwrap();
        for target in [&other, &native] {
            assert_eq!(
                heap.address_at(0).rebase(target).unwrap_err().kind(),
                ErrorKind::InvalidArgument
            );
        }
        assert_eq!(
            native.address_at(0).rebase(&heap).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(heap.address_at(0).to_raw().unwrap_err().kind(), ErrorKind::Unsupported);
    }
}
