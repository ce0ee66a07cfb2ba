//! Watchlist of symbols to analyse, with categories.
//!
//! Symbols are stored uppercase and unique.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_CATEGORY: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub symbol: String,
    pub category: String,
}

impl WatchlistEntry {
    pub fn new(symbol: &str, category: Option<&str>) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            category: category
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(DEFAULT_CATEGORY)
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WatchlistError {
    #[error("empty symbol")]
    EmptySymbol,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),

    #[error("symbol not in watchlist: {0}")]
    UnknownSymbol(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Watchlist {
    entries: Vec<WatchlistEntry>,
}

impl Watchlist {
    /// Builds a watchlist, rejecting empty and duplicate symbols.
    pub fn from_entries(entries: Vec<WatchlistEntry>) -> Result<Self, WatchlistError> {
        let mut list = Watchlist::default();
        for entry in entries {
            list.add(entry)?;
        }
        Ok(list)
    }

    pub fn entries(&self) -> &[WatchlistEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        let symbol = symbol.trim().to_uppercase();
        self.entries.iter().any(|e| e.symbol == symbol)
    }

    pub fn add(&mut self, entry: WatchlistEntry) -> Result<(), WatchlistError> {
        if entry.symbol.is_empty() {
            return Err(WatchlistError::EmptySymbol);
        }
        if self.contains(&entry.symbol) {
            return Err(WatchlistError::DuplicateSymbol(entry.symbol));
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn remove(&mut self, symbol: &str) -> Result<WatchlistEntry, WatchlistError> {
        let symbol = symbol.trim().to_uppercase();
        let idx = self
            .entries
            .iter()
            .position(|e| e.symbol == symbol)
            .ok_or(WatchlistError::UnknownSymbol(symbol))?;
        Ok(self.entries.remove(idx))
    }

    /// Up to `n` distinct entries chosen with a seeded RNG.
    pub fn sample(&self, n: usize, seed: u64) -> Vec<WatchlistEntry> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.entries
            .choose_multiple(&mut rng, n.min(self.entries.len()))
            .cloned()
            .collect()
    }

    /// Restricts the watchlist to `symbols`, keeping categories. Unknown
    /// symbols get the default category.
    pub fn select(&self, symbols: &[String]) -> Vec<WatchlistEntry> {
        symbols
            .iter()
            .map(|s| {
                self.entries
                    .iter()
                    .find(|e| &e.symbol == s)
                    .cloned()
                    .unwrap_or_else(|| WatchlistEntry::new(s, None))
            })
            .collect()
    }
}

/// Parses a comma-separated symbol list.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, WatchlistError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(WatchlistError::EmptySymbol);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(WatchlistError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_list() -> Watchlist {
        Watchlist::from_entries(vec![
            WatchlistEntry::new("aapl", Some("Tech")),
            WatchlistEntry::new("MSFT", Some("Tech")),
            WatchlistEntry::new("xom", None),
            WatchlistEntry::new("JPM", Some("Banks")),
        ])
        .unwrap()
    }

    #[test]
    fn entry_normalises_symbol_and_category() {
        let e = WatchlistEntry::new("  tsla ", Some("  "));
        assert_eq!(e.symbol, "TSLA");
        assert_eq!(e.category, DEFAULT_CATEGORY);
    }

    #[test]
    fn add_rejects_duplicates_case_insensitively() {
        let mut list = sample_list();
        let err = list.add(WatchlistEntry::new("Aapl", None)).unwrap_err();
        assert_eq!(err, WatchlistError::DuplicateSymbol("AAPL".into()));
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn add_rejects_empty() {
        let mut list = Watchlist::default();
        assert_eq!(
            list.add(WatchlistEntry::new(" ", None)),
            Err(WatchlistError::EmptySymbol)
        );
    }

    #[test]
    fn remove_existing_and_unknown() {
        let mut list = sample_list();
        let removed = list.remove("xom").unwrap();
        assert_eq!(removed.symbol, "XOM");
        assert!(!list.contains("XOM"));
        assert_eq!(
            list.remove("XOM"),
            Err(WatchlistError::UnknownSymbol("XOM".into()))
        );
    }

    #[test]
    fn sample_is_seeded_and_distinct() {
        let list = sample_list();
        let a = list.sample(3, 11);
        let b = list.sample(3, 11);
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        let unique: HashSet<_> = a.iter().map(|e| e.symbol.clone()).collect();
        assert_eq!(unique.len(), 3);
        assert_eq!(list.sample(10, 11).len(), 4);
    }

    #[test]
    fn select_keeps_known_categories() {
        let list = sample_list();
        let picked = list.select(&["JPM".to_string(), "NVDA".to_string()]);
        assert_eq!(picked[0].category, "Banks");
        assert_eq!(picked[1].category, DEFAULT_CATEGORY);
    }

    #[test]
    fn parse_symbols_basic() {
        assert_eq!(
            parse_symbols(" aapl, MSFT ,xom").unwrap(),
            vec!["AAPL", "MSFT", "XOM"]
        );
    }

    #[test]
    fn parse_symbols_errors() {
        assert_eq!(parse_symbols("A,,B"), Err(WatchlistError::EmptySymbol));
        assert_eq!(
            parse_symbols("A,B,a"),
            Err(WatchlistError::DuplicateSymbol("A".into()))
        );
    }
}
