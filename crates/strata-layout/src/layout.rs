//! The [`Layout`] sum type and its factories.

use std::fmt;
use std::sync::Arc;

use strata_core::{ByteOrder, MemoryError, Result};

use crate::group::{GroupBody, GroupKind};

/// Smallest alignment any layout may have, in bits.
pub const MIN_ALIGNMENT_BITS: u64 = 8;

/// Name and alignment override shared by every variant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
struct Attributes {
    name: Option<Arc<str>>,
    alignment: Option<u64>,
}

/// Immutable description of the shape of a piece of memory.
///
/// Layouts are built with the `of_*` factories and never mutated;
/// [`Layout::with_name`] and [`Layout::align_to`] return fresh values that
/// share the original's internal structure. Cloning is cheap.
///
/// Two layouts are equal when they have the same variant, the same member
/// structure, the same explicit name, and the same explicit alignment
/// override.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Layout {
    /// A scalar.
    Value(ValueLayout),
    /// Reserved space that is never read.
    Padding(PaddingLayout),
    /// Repetition of one element layout.
    Sequence(SequenceLayout),
    /// A struct or union of member layouts.
    Group(GroupLayout),
}

/// A scalar of a given bit width and byte order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ValueLayout {
    bits: u64,
    order: ByteOrder,
    attrs: Attributes,
}

impl ValueLayout {
    /// Width of the scalar in bits.
    pub fn bits(&self) -> u64 {
        self.bits
    }

    /// Byte order the scalar is stored in.
    pub fn order(&self) -> ByteOrder {
        self.order
    }
}

/// Unread filler of a given bit width.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PaddingLayout {
    bits: u64,
    attrs: Attributes,
}

/// A sequence of `count` elements, or an open sequence when `count` is unknown.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SequenceLayout {
    element: Arc<Layout>,
    count: Option<u64>,
    attrs: Attributes,
}

impl SequenceLayout {
    /// The repeated layout.
    pub fn element(&self) -> &Layout {
        &self.element
    }

    /// Number of elements, if bounded.
    pub fn count(&self) -> Option<u64> {
        self.count
    }
}

/// A struct or union.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupLayout {
    body: Arc<GroupBody>,
    attrs: Attributes,
}

impl GroupLayout {
    /// Struct or union.
    pub fn kind(&self) -> GroupKind {
        self.body.kind()
    }

    /// Members in declaration order.
    pub fn members(&self) -> &[Layout] {
        self.body.members()
    }

    #[cfg(test)]
    pub(crate) fn is_size_cached(&self) -> bool {
        self.body.is_size_cached()
    }
}

fn check_size(bits: u64, allow_zero: bool) -> Result<()> {
    if bits == 0 && !allow_zero {
        return Err(MemoryError::invalid("layout size must be positive"));
    }
    Ok(())
}

/// Natural alignment of a scalar: its width rounded up to a power of two,
/// never below [`MIN_ALIGNMENT_BITS`].
fn natural_value_alignment(bits: u64) -> u64 {
    bits.max(MIN_ALIGNMENT_BITS)
        .checked_next_power_of_two()
        .unwrap_or(1 << 63)
}

impl Layout {
    /// A scalar of `bits` width stored in `order`.
    ///
    /// Fails with invalid-argument when `bits` is zero; use
    /// [`Layout::of_value_allow_zero`] for an explicitly empty value.
    pub fn of_value(bits: u64, order: ByteOrder) -> Result<Layout> {
        check_size(bits, false)?;
        Ok(Self::value_unchecked(bits, order))
    }

    /// Like [`Layout::of_value`], but accepts a zero width.
    pub fn of_value_allow_zero(bits: u64, order: ByteOrder) -> Result<Layout> {
        check_size(bits, true)?;
        Ok(Self::value_unchecked(bits, order))
    }

    fn value_unchecked(bits: u64, order: ByteOrder) -> Layout {
        Layout::Value(ValueLayout {
            bits,
            order,
            attrs: Attributes::default(),
        })
    }

    /// `bits` of padding. Fails with invalid-argument when `bits` is zero.
    pub fn of_padding(bits: u64) -> Result<Layout> {
        check_size(bits, false)?;
        Ok(Self::padding_unchecked(bits))
    }

    /// Like [`Layout::of_padding`], but accepts a zero width.
    pub fn of_padding_allow_zero(bits: u64) -> Result<Layout> {
        check_size(bits, true)?;
        Ok(Self::padding_unchecked(bits))
    }

    fn padding_unchecked(bits: u64) -> Layout {
        Layout::Padding(PaddingLayout {
            bits,
            attrs: Attributes::default(),
        })
    }

    /// `count` repetitions of `element`.
    ///
    /// Fails with invalid-argument if the total size would overflow `u64`.
    pub fn of_sequence(element: Layout, count: u64) -> Result<Layout> {
        if let Some(size) = element.known_bits_size() {
            if size.checked_mul(count).is_none() {
                return Err(MemoryError::invalid(format!(
                    "sequence of {count} x {size} bits overflows"
                )));
            }
        }
        Ok(Layout::Sequence(SequenceLayout {
            element: Arc::new(element),
            count: Some(count),
            attrs: Attributes::default(),
        }))
    }

    /// An unbounded repetition of `element`. Has no size.
    pub fn of_open_sequence(element: Layout) -> Layout {
        Layout::Sequence(SequenceLayout {
            element: Arc::new(element),
            count: None,
            attrs: Attributes::default(),
        })
    }

    /// A struct: members placed consecutively with no implicit padding.
    pub fn of_struct(members: impl IntoIterator<Item = Layout>) -> Layout {
        Self::group(GroupKind::Struct, members)
    }

    /// A union: every member placed at offset 0.
    pub fn of_union(members: impl IntoIterator<Item = Layout>) -> Layout {
        Self::group(GroupKind::Union, members)
    }

    fn group(kind: GroupKind, members: impl IntoIterator<Item = Layout>) -> Layout {
        Layout::Group(GroupLayout {
            body: Arc::new(GroupBody::new(kind, members.into_iter().collect())),
            attrs: Attributes::default(),
        })
    }

    fn attrs(&self) -> &Attributes {
        match self {
            Self::Value(v) => &v.attrs,
            Self::Padding(p) => &p.attrs,
            Self::Sequence(s) => &s.attrs,
            Self::Group(g) => &g.attrs,
        }
    }

    fn with_attrs(&self, attrs: Attributes) -> Layout {
        let mut copy = self.clone();
        match &mut copy {
            Self::Value(v) => v.attrs = attrs,
            Self::Padding(p) => p.attrs = attrs,
            Self::Sequence(s) => s.attrs = attrs,
            Self::Group(g) => g.attrs = attrs,
        }
        copy
    }

    /// A copy of this layout carrying `name`.
    pub fn with_name(&self, name: impl Into<Arc<str>>) -> Layout {
        self.with_attrs(Attributes {
            name: Some(name.into()),
            ..self.attrs().clone()
        })
    }

    /// A copy of this layout with its alignment overridden to `bits`.
    ///
    /// Fails with invalid-argument unless `bits` is a power of two and at
    /// least [`MIN_ALIGNMENT_BITS`].
    pub fn align_to(&self, bits: u64) -> Result<Layout> {
        if !bits.is_power_of_two() || bits < MIN_ALIGNMENT_BITS {
            return Err(MemoryError::invalid(format!(
                "alignment must be a power of two and at least {MIN_ALIGNMENT_BITS} bits, got {bits}"
            )));
        }
        Ok(self.with_attrs(Attributes {
            alignment: Some(bits),
            ..self.attrs().clone()
        }))
    }

    /// The descriptive name, if any.
    pub fn name(&self) -> Option<&str> {
        self.attrs().name.as_deref()
    }

    /// The explicit alignment override, if any.
    pub fn alignment_override(&self) -> Option<u64> {
        self.attrs().alignment
    }

    /// Alignment derived from the layout's content, ignoring any override.
    pub fn natural_alignment(&self) -> u64 {
        match self {
            Self::Value(v) => natural_value_alignment(v.bits),
            Self::Padding(_) => MIN_ALIGNMENT_BITS,
            Self::Sequence(s) => s.element.bits_alignment(),
            Self::Group(g) => g.body.natural_alignment(),
        }
    }

    /// Whether the effective alignment equals the natural one.
    pub fn has_natural_alignment(&self) -> bool {
        self.bits_alignment() == self.natural_alignment()
    }

    /// Effective alignment in bits: the override if present, otherwise the
    /// natural alignment. Always a power of two, at least 8.
    pub fn bits_alignment(&self) -> u64 {
        self.alignment_override()
            .unwrap_or_else(|| self.natural_alignment())
    }

    /// Effective alignment in bytes.
    pub fn bytes_alignment(&self) -> u64 {
        self.bits_alignment() / 8
    }

    pub(crate) fn known_bits_size(&self) -> Option<u64> {
        match self {
            Self::Value(v) => Some(v.bits),
            Self::Padding(p) => Some(p.bits),
            Self::Sequence(s) => {
                let count = s.count?;
                s.element.known_bits_size()?.checked_mul(count)
            }
            Self::Group(g) => g.body.bits_size(),
        }
    }

    /// Whether the layout has a finite, representable size.
    pub fn has_size(&self) -> bool {
        self.known_bits_size().is_some()
    }

    /// Size in bits.
    ///
    /// Fails with unsupported-operation for open sequences (or groups that
    /// contain one).
    pub fn bits_size(&self) -> Result<u64> {
        self.known_bits_size()
            .ok_or_else(|| MemoryError::unsupported("bits_size", format!("{self} has no size")))
    }

    /// Size in bytes.
    ///
    /// Fails with unsupported-operation when the layout is unsized or its
    /// size is not a whole number of bytes.
    pub fn bytes_size(&self) -> Result<u64> {
        let bits = self.bits_size()?;
        if bits % 8 != 0 {
            return Err(MemoryError::unsupported(
                "bytes_size",
                format!("{self} is {bits} bits, not a whole number of bytes"),
            ));
        }
        Ok(bits / 8)
    }

    /// Whether this is a padding layout.
    pub fn is_padding(&self) -> bool {
        matches!(self, Self::Padding(_))
    }

    /// The scalar description, for value layouts.
    pub fn as_value(&self) -> Option<&ValueLayout> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// The sequence description, for sequence layouts.
    pub fn as_sequence(&self) -> Option<&SequenceLayout> {
        match self {
            Self::Sequence(s) => Some(s),
            _ => None,
        }
    }

    /// The group description, for struct and union layouts.
    pub fn as_group(&self) -> Option<&GroupLayout> {
        match self {
            Self::Group(g) => Some(g),
            _ => None,
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(alignment) = self.alignment_override() {
            write!(f, "{alignment}%")?;
        }
        match self {
            Self::Value(v) => write!(f, "{}{}", v.order.tag(), v.bits)?,
            Self::Padding(p) => write!(f, "x{}", p.bits)?,
            Self::Sequence(s) => match s.count {
                Some(count) => write!(f, "[{count}:{}]", s.element)?,
                None => write!(f, "[:{}]", s.element)?,
            },
            Self::Group(g) => {
                f.write_str("[")?;
                for (i, member) in g.members().iter().enumerate() {
                    if i > 0 {
                        f.write_str(g.kind().delimiter())?;
                    }
                    write!(f, "{member}")?;
                }
                f.write_str("]")?;
            }
        }
        if let Some(name) = self.name() {
            write!(f, "({name})")?;
        }
        Ok(())
    }
}
