//! Layout paths: selecting nested layouts and computing their offsets.
//!
//! A path is a list of [`PathElement`]s walked from a root layout. Member
//! elements step into a struct or union by name; index elements step into
//! a bounded sequence.

use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;
use strata_core::{MemoryError, Result};

use crate::group::GroupKind;
use crate::layout::Layout;

/// One step of a layout path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathElement {
    /// The group member carrying this name.
    Member(Arc<str>),
    /// The element at this index of a bounded sequence.
    Index(u64),
}

impl PathElement {
    /// Select a named group member.
    pub fn member(name: impl Into<Arc<str>>) -> Self {
        Self::Member(name.into())
    }

    /// Select a sequence element.
    pub fn index(index: u64) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Member(name) => write!(f, ".{name}"),
            Self::Index(i) => write!(f, "[{i}]"),
        }
    }
}

/// An owned layout path. Most paths are shallow, so up to four steps are
/// stored inline.
pub type LayoutPath = SmallVec<[PathElement; 4]>;

fn sized(layout: &Layout, path: &[PathElement]) -> Result<u64> {
    layout.bits_size().map_err(|_| {
        MemoryError::invalid(format!(
            "cannot compute offset through unsized layout {layout} at {}",
            render(path)
        ))
    })
}

fn render(path: &[PathElement]) -> String {
    if path.is_empty() {
        return "<root>".to_string();
    }
    path.iter().map(ToString::to_string).collect()
}

impl Layout {
    /// The layout reached by following `path` from this layout.
    ///
    /// Fails with invalid-argument when a member name is missing, an index
    /// is out of range, or an element does not match the layout it is
    /// applied to.
    pub fn select(&self, path: &[PathElement]) -> Result<Layout> {
        self.walk(path).map(|(layout, _)| layout)
    }

    /// Bit offset, from the start of this layout, of the layout reached by
    /// following `path`.
    pub fn offset_of(&self, path: &[PathElement]) -> Result<u64> {
        self.walk(path).map(|(_, offset)| offset)
    }

    /// Byte offset of the layout reached by following `path`.
    ///
    /// Fails with unsupported-operation if the offset is not a whole number
    /// of bytes.
    pub fn byte_offset_of(&self, path: &[PathElement]) -> Result<u64> {
        let bits = self.offset_of(path)?;
        if bits % 8 != 0 {
            return Err(MemoryError::unsupported(
                "byte_offset_of",
                format!("{} lies at bit offset {bits}", render(path)),
            ));
        }
        Ok(bits / 8)
    }

    fn walk(&self, path: &[PathElement]) -> Result<(Layout, u64)> {
        let mut current = self.clone();
        let mut offset = 0u64;
        for (depth, element) in path.iter().enumerate() {
            let walked = &path[..=depth];
            let (next, delta) = match (element, &current) {
                (PathElement::Member(name), Layout::Group(group)) => {
                    let mut delta = 0u64;
                    let mut found = None;
                    for member in group.members() {
                        if member.name() == Some(name.as_ref()) {
                            found = Some(member.clone());
                            break;
                        }
                        if group.kind() == GroupKind::Struct {
                            delta = delta
                                .checked_add(sized(member, walked)?)
                                .ok_or_else(|| MemoryError::invalid("member offset overflows"))?;
                        }
                    }
                    let found = found.ok_or_else(|| {
                        MemoryError::invalid(format!(
                            "{current} has no member named `{name}` (path {})",
                            render(walked)
                        ))
                    })?;
                    (found, delta)
                }
                (PathElement::Index(index), Layout::Sequence(seq)) => {
                    match seq.count() {
                        Some(count) if *index < count => {}
                        _ => {
                            return Err(MemoryError::invalid(format!(
                                "index {index} out of range for {current} (path {})",
                                render(walked)
                            )))
                        }
                    }
                    let element = seq.element().clone();
                    let delta = sized(&element, walked)?
                        .checked_mul(*index)
                        .ok_or_else(|| MemoryError::invalid("element offset overflows"))?;
                    (element, delta)
                }
                (element, layout) => {
                    return Err(MemoryError::invalid(format!(
                        "path element `{element}` does not apply to {layout} (path {})",
                        render(walked)
                    )))
                }
            };
            offset = offset
                .checked_add(delta)
                .ok_or_else(|| MemoryError::invalid("path offset overflows"))?;
            current = next;
        }
        Ok((current, offset))
    }
}
