//! Primitive types that can be loaded from and stored to region memory.

use byteorder::{BigEndian, ByteOrder as _, LittleEndian};
use strata_core::ByteOrder;

mod sealed {
    pub trait Sealed {}
}

/// A fixed-width primitive readable and writable through a region.
///
/// Implemented for the integer types from 8 to 64 bits and for `f32` and
/// `f64`. Sealed: the encoding of each carrier is fixed by this crate.
pub trait Carrier: Copy + sealed::Sealed {
    /// Width in bytes.
    const BYTES: usize;

    /// Decode from exactly [`BYTES`](Self::BYTES) bytes.
    fn decode(bytes: &[u8], order: ByteOrder) -> Self;

    /// Encode into exactly [`BYTES`](Self::BYTES) bytes.
    fn encode(self, bytes: &mut [u8], order: ByteOrder);
}

impl sealed::Sealed for u8 {}
impl Carrier for u8 {
    const BYTES: usize = 1;

    fn decode(bytes: &[u8], _order: ByteOrder) -> Self {
        bytes[0]
    }

    fn encode(self, bytes: &mut [u8], _order: ByteOrder) {
        bytes[0] = self;
    }
}

impl sealed::Sealed for i8 {}
impl Carrier for i8 {
    const BYTES: usize = 1;

    fn decode(bytes: &[u8], _order: ByteOrder) -> Self {
        bytes[0] as i8
    }

    fn encode(self, bytes: &mut [u8], _order: ByteOrder) {
        bytes[0] = self as u8;
    }
}

macro_rules! carrier {
    ($ty:ty, $bytes:expr, $read:ident, $write:ident) => {
        impl sealed::Sealed for $ty {}
        impl Carrier for $ty {
            const BYTES: usize = $bytes;

            fn decode(bytes: &[u8], order: ByteOrder) -> Self {
                match order {
                    ByteOrder::BigEndian => BigEndian::$read(bytes),
                    ByteOrder::LittleEndian => LittleEndian::$read(bytes),
                }
            }

            fn encode(self, bytes: &mut [u8], order: ByteOrder) {
                match order {
                    ByteOrder::BigEndian => BigEndian::$write(bytes, self),
                    ByteOrder::LittleEndian => LittleEndian::$write(bytes, self),
                }
            }
        }
    };
}

carrier!(u16, 2, read_u16, write_u16);
carrier!(i16, 2, read_i16, write_i16);
carrier!(u32, 4, read_u32, write_u32);
carrier!(i32, 4, read_i32, write_i32);
carrier!(u64, 8, read_u64, write_u64);
carrier!(i64, 8, read_i64, write_i64);
carrier!(f32, 4, read_f32, write_f32);
carrier!(f64, 8, read_f64, write_f64);
