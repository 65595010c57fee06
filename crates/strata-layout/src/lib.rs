//! Declarative memory layouts for Strata.
//!
//! A [`Layout`] describes the shape of a piece of native memory without
//! owning any: scalars, padding, repeated elements, and struct/union
//! groups. Layouts compose structurally, compute their size and alignment
//! on demand, and render to a canonical descriptor string.
//!
//! # Architecture
//!
//! ```text
//! Layout (closed sum type, immutable, Send + Sync)
//! ├── Value     { bits, byte order }
//! ├── Padding   { bits }
//! ├── Sequence  { Arc<Layout> element, Option<count> }
//! └── Group     { Arc<GroupBody> }  struct | union, memoized size/alignment
//! ```
//!
//! Every variant carries an optional name and an optional alignment
//! override; both participate in equality. Memoized group sizes live in the
//! shared `GroupBody`, so renamed or realigned copies reuse the cache and
//! equality never looks at it.
//!
//! # Example
//!
//! ```
//! use strata_core::ByteOrder;
//! use strata_layout::{Layout, PathElement};
//!
//! let x = Layout::of_value(32, ByteOrder::BigEndian).unwrap().with_name("x");
//! let y = Layout::of_value(32, ByteOrder::BigEndian).unwrap().with_name("y");
//! let point = Layout::of_struct([x, y]);
//!
//! assert_eq!(point.bits_size().unwrap(), 64);
//! assert_eq!(point.bits_alignment(), 32);
//! assert_eq!(point.offset_of(&[PathElement::member("y")]).unwrap(), 32);
//! assert_eq!(point.to_string(), "[B32(x)B32(y)]");
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod group;
pub mod layout;
pub mod path;

pub use group::GroupKind;
pub use layout::{
    GroupLayout, Layout, PaddingLayout, SequenceLayout, ValueLayout, MIN_ALIGNMENT_BITS,
};
pub use path::{LayoutPath, PathElement};
