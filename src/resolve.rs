//! Priority-ordered address-to-name resolution.

use std::collections::BTreeMap;

use crate::labels::LabelMap;
use crate::Address;

/// Resolves an address to a display name.
///
/// Resolution order is fixed: the binary's own symbol table wins, then the
/// synthetic label map, then nothing (callers fall back to printing the
/// bare address). Exact address equality only — no range or fuzzy
/// matching.
pub struct NameResolver<'a> {
    symbols: &'a BTreeMap<Address, String>,
    labels: &'a LabelMap,
}

impl<'a> NameResolver<'a> {
    pub fn new(symbols: &'a BTreeMap<Address, String>, labels: &'a LabelMap) -> Self {
        Self { symbols, labels }
    }

    pub fn resolve(&self, addr: Address) -> Option<&str> {
        self.symbols
            .get(&addr)
            .map(String::as_str)
            .or_else(|| self.labels.get(addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols(entries: &[(Address, &str)]) -> BTreeMap<Address, String> {
        entries.iter().map(|(a, n)| (*a, n.to_string())).collect()
    }

    #[test]
    fn test_symbol_beats_label() {
        let symbols = symbols(&[(0x1000, "main")]);
        let mut labels = LabelMap::new();
        labels.assign(0x1000);

        let resolver = NameResolver::new(&symbols, &labels);
        assert_eq!(resolver.resolve(0x1000), Some("main"));
    }

    #[test]
    fn test_label_fallback() {
        let symbols = symbols(&[(0x1000, "main")]);
        let mut labels = LabelMap::new();
        labels.assign(0x1008);

        let resolver = NameResolver::new(&symbols, &labels);
        assert_eq!(resolver.resolve(0x1008), Some("LOC_000001"));
    }

    #[test]
    fn test_unresolved_is_none() {
        let symbols = symbols(&[(0x1000, "main")]);
        let labels = LabelMap::new();

        let resolver = NameResolver::new(&symbols, &labels);
        assert_eq!(resolver.resolve(0x2000), None);
    }

    #[test]
    fn test_exact_match_only() {
        let symbols = symbols(&[(0x1000, "main")]);
        let mut labels = LabelMap::new();
        labels.assign(0x1100);

        let resolver = NameResolver::new(&symbols, &labels);
        assert_eq!(resolver.resolve(0x1001), None);
        assert_eq!(resolver.resolve(0x10ff), None);
        assert_eq!(resolver.resolve(0x1101), None);
    }
}
