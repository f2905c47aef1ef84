//! Domain-specific identifier types.

use std::fmt;

/// Store identifier. A store is a simulated node holding replicas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreId(pub u64);

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Store({})", self.0)
    }
}

/// Range identifier. A range is one shard of the simulated key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RangeId(pub u64);

impl fmt::Display for RangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Range({})", self.0)
    }
}

/// A point in the simulated key space.
///
/// Ranges partition the key space by start key; a key belongs to the
/// range with the greatest start key at or below it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(pub i64);

impl Key {
    /// The smallest addressable key. Every partitioning of the key space
    /// has a range that starts here.
    pub const MIN: Self = Key(i64::MIN);
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_ordering() {
        assert!(StoreId(1) < StoreId(2));
        assert!(RangeId(3) > RangeId(1));
        assert!(Key::MIN < Key(0));
        assert!(Key(0) < Key(5));
    }

    #[test]
    fn test_display() {
        assert_eq!(StoreId(7).to_string(), "Store(7)");
        assert_eq!(RangeId(1).to_string(), "Range(1)");
        assert_eq!(Key(5).to_string(), "Key(5)");
    }
}
