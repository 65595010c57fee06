//! Canonical layouts reused across crates.
//!
//! - [`point_layout`]: two big-endian 32-bit members `x` and `y`.
//! - [`packet_layout`]: a header with padding, a length, and a bounded
//!   payload, exercising every layout variant that has a size.

use strata_core::ByteOrder;
use strata_layout::Layout;

/// Size of [`point_layout`] in bytes.
pub const POINT_BYTES: u64 = 8;

/// Size of [`packet_layout`] in bytes.
pub const PACKET_BYTES: u64 = 24;

fn value(bits: u64, order: ByteOrder) -> Layout {
    Layout::of_value(bits, order).expect("fixture widths are non-zero")
}

/// `[B32(x)B32(y)]`
pub fn point_layout() -> Layout {
    Layout::of_struct([
        value(32, ByteOrder::BigEndian).with_name("x"),
        value(32, ByteOrder::BigEndian).with_name("y"),
    ])
}

/// A 24-byte packet:
///
/// ```text
/// kind:u8  pad:24  len:u32(le)  flags:union{u16|u32}  body:[12:u8]
/// ```
pub fn packet_layout() -> Layout {
    Layout::of_struct([
        value(8, ByteOrder::LittleEndian).with_name("kind"),
        Layout::of_padding(24).expect("non-zero padding"),
        value(32, ByteOrder::LittleEndian).with_name("len"),
        Layout::of_union([
            value(16, ByteOrder::LittleEndian).with_name("short"),
            value(32, ByteOrder::LittleEndian).with_name("wide"),
        ])
        .with_name("flags"),
        Layout::of_sequence(value(8, ByteOrder::LittleEndian), 12)
            .expect("small sequence")
            .with_name("body"),
    ])
    .with_name("packet")
}
