//! Byte order of scalar values.

use std::fmt;

/// Byte order used to encode a scalar value in memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// Most significant byte first.
    BigEndian,
    /// Least significant byte first.
    LittleEndian,
}

impl ByteOrder {
    /// The byte order of the target this crate was compiled for.
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::BigEndian
        } else {
            Self::LittleEndian
        }
    }

    /// Single-letter tag used by canonical layout strings (`B` / `b`).
    pub const fn tag(self) -> char {
        match self {
            Self::BigEndian => 'B',
            Self::LittleEndian => 'b',
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BigEndian => write!(f, "big-endian"),
            Self::LittleEndian => write!(f, "little-endian"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_matches_target() {
        let probe = 1u16.to_ne_bytes();
        let expected = if probe[0] == 1 {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        };
        assert_eq!(ByteOrder::native(), expected);
    }

    #[test]
    fn tags_distinguish_orders() {
        assert_eq!(ByteOrder::BigEndian.tag(), 'B');
        assert_eq!(ByteOrder::LittleEndian.tag(), 'b');
    }
}
