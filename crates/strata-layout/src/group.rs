//! Struct and union member lists with memoized size and alignment.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use crate::layout::{Layout, MIN_ALIGNMENT_BITS};

/// How the members of a group are placed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GroupKind {
    /// Members laid out one after another; offsets are cumulative sums.
    Struct,
    /// All members start at offset 0.
    Union,
}

impl GroupKind {
    /// Separator between members in canonical layout strings.
    pub fn delimiter(self) -> &'static str {
        match self {
            Self::Struct => "",
            Self::Union => "|",
        }
    }
}

/// The immutable member list shared by every copy of a group layout.
///
/// Size and alignment are derived on first access. Racing first readers
/// each compute the (deterministic) value and the first store wins, so no
/// lock is ever taken.
pub(crate) struct GroupBody {
    kind: GroupKind,
    members: Vec<Layout>,
    /// `None` inside the cell: some member is unsized, or the sum overflows.
    size: OnceLock<Option<u64>>,
    alignment: OnceLock<u64>,
}

impl GroupBody {
    pub(crate) fn new(kind: GroupKind, members: Vec<Layout>) -> Self {
        Self {
            kind,
            members,
            size: OnceLock::new(),
            alignment: OnceLock::new(),
        }
    }

    pub(crate) fn kind(&self) -> GroupKind {
        self.kind
    }

    pub(crate) fn members(&self) -> &[Layout] {
        &self.members
    }

    pub(crate) fn bits_size(&self) -> Option<u64> {
        if let Some(size) = self.size.get() {
            return *size;
        }
        let computed = self.compute_size();
        let _ = self.size.set(computed);
        computed
    }

    pub(crate) fn natural_alignment(&self) -> u64 {
        if let Some(alignment) = self.alignment.get() {
            return *alignment;
        }
        let computed = self
            .members
            .iter()
            .map(Layout::bits_alignment)
            .fold(MIN_ALIGNMENT_BITS, u64::max);
        let _ = self.alignment.set(computed);
        computed
    }

    #[cfg(test)]
    pub(crate) fn is_size_cached(&self) -> bool {
        self.size.get().is_some()
    }

    fn compute_size(&self) -> Option<u64> {
        let mut sizes = self.members.iter().map(Layout::known_bits_size);
        match self.kind {
            GroupKind::Struct => sizes.try_fold(0u64, |acc, size| acc.checked_add(size?)),
            GroupKind::Union => sizes.try_fold(0u64, |acc, size| Some(acc.max(size?))),
        }
    }
}

impl PartialEq for GroupBody {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.members == other.members
    }
}

impl Eq for GroupBody {}

impl Hash for GroupBody {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.members.hash(state);
    }
}

impl fmt::Debug for GroupBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupBody")
            .field("kind", &self.kind)
            .field("members", &self.members)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::ByteOrder;

    fn int(bits: u64) -> Layout {
        Layout::of_value(bits, ByteOrder::LittleEndian).unwrap()
    }

    #[test]
    fn struct_size_is_cumulative() {
        let body = GroupBody::new(GroupKind::Struct, vec![int(8), int(32), int(16)]);
        assert_eq!(body.bits_size(), Some(56));
    }

    #[test]
    fn union_size_is_max() {
        let body = GroupBody::new(GroupKind::Union, vec![int(8), int(64), int(16)]);
        assert_eq!(body.bits_size(), Some(64));
    }

    #[test]
    fn empty_group_has_zero_size_and_minimum_alignment() {
        let body = GroupBody::new(GroupKind::Struct, vec![]);
        assert_eq!(body.bits_size(), Some(0));
        assert_eq!(body.natural_alignment(), MIN_ALIGNMENT_BITS);
    }

    #[test]
    fn unsized_member_makes_group_unsized() {
        let open = Layout::of_open_sequence(int(8));
        let body = GroupBody::new(GroupKind::Struct, vec![int(8), open]);
        assert_eq!(body.bits_size(), None);
    }

    #[test]
    fn size_is_memoized_after_first_read() {
        let body = GroupBody::new(GroupKind::Struct, vec![int(8)]);
        assert!(!body.is_size_cached());
        body.bits_size();
        assert!(body.is_size_cached());
    }

    #[test]
    fn concurrent_first_reads_agree() {
        let body = std::sync::Arc::new(GroupBody::new(
            GroupKind::Struct,
            (0..64).map(|_| int(32)).collect(),
        ));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let body = std::sync::Arc::clone(&body);
                std::thread::spawn(move || (body.bits_size(), body.natural_alignment()))
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), (Some(64 * 32), 32));
        }
    }

    #[test]
    fn union_delimiter() {
        assert_eq!(GroupKind::Union.delimiter(), "|");
        assert_eq!(GroupKind::Struct.delimiter(), "");
    }
}
