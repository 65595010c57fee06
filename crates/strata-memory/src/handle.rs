//! Typed accessors for a value nested inside a layout.
//!
//! A [`ValueHandle`] resolves a layout path once (offset, width, byte
//! order) and then reads or writes that value relative to any base
//! address, with the region checks applied at each access.

use std::fmt;

use strata_core::{ByteOrder, MemoryError, Result};
use strata_layout::{Layout, LayoutPath, PathElement};

use crate::address::Address;
use crate::carrier::Carrier;

/// A resolved accessor for one value layout inside a root layout.
#[derive(Clone, Debug)]
pub struct ValueHandle {
    path: LayoutPath,
    layout: Layout,
    byte_offset: u64,
    bytes: usize,
    order: ByteOrder,
}

impl ValueHandle {
    /// Resolve `path` against `root`.
    ///
    /// The selected layout must be a value of 8, 16, 32, or 64 bits at a
    /// whole-byte offset; anything else is unsupported. A path that does
    /// not resolve is invalid-argument.
    pub fn new(root: &Layout, path: &[PathElement]) -> Result<ValueHandle> {
        let layout = root.select(path)?;
        let value = layout.as_value().ok_or_else(|| {
            MemoryError::unsupported("value_handle", format!("{layout} is not a value layout"))
        })?;
        let bytes = match value.bits() {
            8 | 16 | 32 | 64 => (value.bits() / 8) as usize,
            bits => {
                return Err(MemoryError::unsupported(
                    "value_handle",
                    format!("no carrier is {bits} bits wide"),
                ))
            }
        };
        let order = value.order();
        let byte_offset = root.byte_offset_of(path)?;
        Ok(ValueHandle {
            path: path.iter().cloned().collect(),
            layout,
            byte_offset,
            bytes,
            order,
        })
    }

    /// A handle for a value layout used as its own root.
    pub fn for_value(layout: &Layout) -> Result<ValueHandle> {
        Self::new(layout, &[])
    }

    /// The selected value layout.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// The path this handle was resolved from.
    pub fn path(&self) -> &[PathElement] {
        &self.path
    }

    /// Offset of the value from the root, in bytes.
    pub fn byte_offset(&self) -> u64 {
        self.byte_offset
    }

    /// Width of the value in bytes.
    pub fn byte_width(&self) -> usize {
        self.bytes
    }

    /// Byte order of the value.
    pub fn order(&self) -> ByteOrder {
        self.order
    }

    fn check_carrier<T: Carrier>(&self) -> Result<()> {
        if T::BYTES != self.bytes {
            return Err(MemoryError::invalid(format!(
                "{}-byte carrier used for {} ({} bytes)",
                T::BYTES,
                self.layout,
                self.bytes
            )));
        }
        Ok(())
    }

    fn locate(&self, base: &Address) -> Address {
        base.offset_by(self.byte_offset as i64)
    }

    /// Load the value, treating `base` as the start of the root layout.
    pub fn get<T: Carrier>(&self, base: &Address) -> Result<T> {
        self.check_carrier::<T>()?;
        self.locate(base).get(self.order)
    }

    /// Store the value, treating `base` as the start of the root layout.
    pub fn set<T: Carrier>(&self, base: &Address, value: T) -> Result<()> {
        self.check_carrier::<T>()?;
        self.locate(base).set(self.order, value)
    }
}

impl fmt::Display for ValueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in &self.path {
            write!(f, "{element}")?;
        }
        write!(f, " @{} {}", self.byte_offset, self.layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Region;
    use strata_core::ErrorKind;

    fn int(bits: u64, order: ByteOrder) -> Layout {
        Layout::of_value(bits, order).unwrap()
    }

    fn record() -> Layout {
        Layout::of_struct([
            int(8, ByteOrder::LittleEndian).with_name("tag"),
            Layout::of_padding(8).unwrap(),
            int(16, ByteOrder::BigEndian).with_name("port"),
            Layout::of_sequence(int(32, ByteOrder::LittleEndian), 2)
                .unwrap()
                .with_name("words"),
        ])
    }

    #[test]
    fn resolves_offset_and_order() {
        let port = ValueHandle::new(&record(), &[PathElement::member("port")]).unwrap();
        assert_eq!(port.byte_offset(), 2);
        assert_eq!(port.byte_width(), 2);
        assert_eq!(port.order(), ByteOrder::BigEndian);
        assert_eq!(port.to_string(), ".port @2 B16(port)");
    }

    #[test]
    fn reads_and_writes_through_base() {
        let root = record();
        let region = Region::allocate_native(root.bytes_size().unwrap(), 4).unwrap();
        let base = region.base_address();
        let port = ValueHandle::new(&root, &[PathElement::member("port")]).unwrap();
        let second = ValueHandle::new(
            &root,
            &[PathElement::member("words"), PathElement::index(1)],
        )
        .unwrap();
        port.set(&base, 0x1F90u16).unwrap();
        second.set(&base, 7u32).unwrap();
        assert_eq!(region.get::<u8>(2, ByteOrder::LittleEndian).unwrap(), 0x1F);
        assert_eq!(port.get::<u16>(&base).unwrap(), 0x1F90);
        assert_eq!(second.get::<u32>(&base).unwrap(), 7);
        assert_eq!(second.byte_offset(), 8);
    }

    #[test]
    fn carrier_width_must_match() {
        let tag = ValueHandle::new(&record(), &[PathElement::member("tag")]).unwrap();
        let region = Region::allocate_native(12, 4).unwrap();
        let err = tag.get::<u32>(&region.base_address()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn non_value_and_odd_widths_are_unsupported() {
        let err = ValueHandle::new(&record(), &[PathElement::member("words")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        let err = ValueHandle::for_value(&int(24, ByteOrder::BigEndian)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn unknown_path_is_invalid() {
        let err = ValueHandle::new(&record(), &[PathElement::member("nope")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn access_outside_region_is_out_of_bounds() {
        let root = record();
        let small = Region::allocate_native(4, 4).unwrap();
        let second = ValueHandle::new(
            &root,
            &[PathElement::member("words"), PathElement::index(1)],
        )
        .unwrap();
        assert_eq!(
            second.get::<u32>(&small.base_address()).unwrap_err().kind(),
            ErrorKind::OutOfBounds
        );
    }
}
