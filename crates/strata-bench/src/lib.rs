//! Benchmark layouts for Strata.
//!
//! - [`wide_record`]: a flat struct of many mixed-width members
//! - [`nested_record`]: a chain of structs nested to a given depth
//! - [`deep_path`]: the path to the innermost value of [`nested_record`]

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use strata_core::ByteOrder;
use strata_layout::{Layout, PathElement};

const WIDTHS: [u64; 4] = [8, 16, 32, 64];

/// A struct of `members` values cycling through 8/16/32/64-bit widths,
/// named `f0`, `f1`, ...
pub fn wide_record(members: usize) -> Layout {
    Layout::of_struct((0..members).map(|i| {
        Layout::of_value(WIDTHS[i % WIDTHS.len()], ByteOrder::LittleEndian)
            .expect("benchmark widths are non-zero")
            .with_name(format!("f{i}"))
    }))
}

/// `depth` structs nested inside each other. Each level holds a 32-bit
/// `pad` member followed by the previous level as `inner`; level zero is a
/// 64-bit value.
pub fn nested_record(depth: usize) -> Layout {
    let leaf = Layout::of_value(64, ByteOrder::BigEndian)
        .expect("non-zero width")
        .with_name("leaf");
    (0..depth).fold(leaf, |inner, _| {
        Layout::of_struct([
            Layout::of_value(32, ByteOrder::BigEndian)
                .expect("non-zero width")
                .with_name("pad"),
            inner.with_name("inner"),
        ])
    })
}

/// Path from the root of [`nested_record`] to the innermost value.
pub fn deep_path(depth: usize) -> Vec<PathElement> {
    vec![PathElement::member("inner"); depth]
}
