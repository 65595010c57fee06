//! Symbol resolution seam.

use indexmap::IndexMap;
use strata_memory::Address;

/// Resolves native symbol names to addresses.
///
/// Implemented by whatever loader the embedding application uses; the
/// linker only consumes the resolved address.
pub trait SymbolLookup {
    /// The address of `name`, or `None` if it is not known.
    fn lookup(&self, name: &str) -> Option<Address>;
}

/// A fixed symbol table, in insertion order.
#[derive(Clone, Debug, Default)]
pub struct StaticSymbols {
    table: IndexMap<String, u64>,
}

impl StaticSymbols {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` at the absolute address `raw`, returning the address
    /// it previously mapped to.
    pub fn insert(&mut self, name: impl Into<String>, raw: u64) -> Option<u64> {
        self.table.insert(name.into(), raw)
    }

    /// Number of registered symbols.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether no symbols are registered.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Registered names and addresses, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.table.iter().map(|(name, raw)| (name.as_str(), *raw))
    }
}

impl SymbolLookup for StaticSymbols {
    fn lookup(&self, name: &str) -> Option<Address> {
        self.table.get(name).map(|&raw| Address::of_raw(raw))
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for StaticSymbols {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        Self {
            table: iter.into_iter().map(|(name, raw)| (name.into(), raw)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_yields_raw_addresses() {
        let symbols: StaticSymbols = [("strlen", 0x1000u64), ("memcpy", 0x2000)]
            .into_iter()
            .collect();
        let addr = symbols.lookup("memcpy").unwrap();
        assert!(addr.is_raw());
        assert_eq!(addr.to_raw().unwrap(), 0x2000);
        assert!(symbols.lookup("free").is_none());
    }

    #[test]
    fn iteration_keeps_insertion_order() {
        let mut symbols = StaticSymbols::new();
        symbols.insert("b", 2);
        symbols.insert("a", 1);
        assert_eq!(symbols.insert("b", 3), Some(2));
        let names: Vec<_> = symbols.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(symbols.len(), 2);
    }
}
