//! Symbol-to-identifier mapping for the price source.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mapping from short display symbol to canonical CoinGecko identifier.
///
/// Symbols are globally unique and stored lowercase; lookups normalize
/// before searching. Identifiers are validated against the price source
/// once at registration time and never re-validated, so a stale entry
/// simply stops returning quotes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolMap {
    entries: BTreeMap<CompactString, CompactString>,
}

impl SymbolMap {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// The fresh-install symbol table.
    pub fn seeded() -> Self {
        let mut map = Self::new();
        for (symbol, id) in [
            ("btc", "bitcoin"),
            ("eth", "ethereum"),
            ("bnb", "binancecoin"),
            ("sol", "solana"),
            ("ada", "cardano"),
            ("doge", "dogecoin"),
            ("xrp", "ripple"),
            ("meme", "meme"),
            ("moxie", "moxie"),
            ("degen", "degen-base"),
            ("op", "optimism"),
        ] {
            map.entries
                .insert(CompactString::new(symbol), CompactString::new(id));
        }
        map
    }

    /// Normalize a user-supplied symbol for storage and lookup.
    pub fn normalize(symbol: &str) -> CompactString {
        CompactString::new(symbol.trim().to_lowercase())
    }

    /// Resolve a symbol to its canonical identifier.
    pub fn resolve(&self, symbol: &str) -> Option<&CompactString> {
        self.entries.get(Self::normalize(symbol).as_str())
    }

    /// Whether a symbol is registered.
    pub fn contains(&self, symbol: &str) -> bool {
        self.resolve(symbol).is_some()
    }

    /// Insert a symbol. The caller is responsible for normalization
    /// and uniqueness checks.
    pub fn insert(&mut self, symbol: CompactString, coin_id: CompactString) {
        self.entries.insert(symbol, coin_id);
    }

    /// Iterate entries in symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (&CompactString, &CompactString)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_seeded_map_resolves_btc() {
        let map = SymbolMap::seeded();
        assert_eq!(map.resolve("btc").unwrap().as_str(), "bitcoin");
        assert_eq!(map.resolve("degen").unwrap().as_str(), "degen-base");
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let map = SymbolMap::seeded();
        assert_eq!(map.resolve("BTC").unwrap().as_str(), "bitcoin");
        assert_eq!(map.resolve(" Eth ").unwrap().as_str(), "ethereum");
    }

    #[test]
    fn test_unknown_symbol_is_absent() {
        let map = SymbolMap::seeded();
        assert!(map.resolve("zzz").is_none());
        assert!(!map.contains("zzz"));
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let mut map = SymbolMap::new();
        map.insert("btc".into(), "bitcoin".into());
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"btc":"bitcoin"}"#);
    }
}
