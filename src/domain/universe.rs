//! Symbol universe for batch trend scans.
//!
//! A [`SymbolUniverse`] is built once (from a comma list, a column of an
//! uploaded table, or a remote sheet) and then only read. It is passed into the
//! scan explicitly rather than living in a global.

use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolUniverse {
    symbols: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),

    #[error("symbol universe is empty")]
    Empty,
}

impl SymbolUniverse {
    /// Strict parse of a comma separated list, as typed on the command line.
    pub fn parse(input: &str) -> Result<Self, UniverseError> {
        let mut symbols = Vec::new();
        let mut seen = HashSet::new();

        for token in input.split(',') {
            let trimmed = token.trim();
            if trimmed.is_empty() {
                return Err(UniverseError::EmptyToken);
            }
            let symbol = trimmed.to_uppercase();
            if !seen.insert(symbol.clone()) {
                return Err(UniverseError::DuplicateSymbol(symbol));
            }
            symbols.push(symbol);
        }

        Ok(Self { symbols })
    }

    /// Lenient constructor for symbol columns loaded from files: blanks are
    /// skipped and repeats keep their first position.
    pub fn from_symbols<I, S>(symbols: I) -> Result<Self, UniverseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let symbols: Vec<String> = symbols
            .into_iter()
            .map(|s| s.as_ref().trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .filter(|s| seen.insert(s.clone()))
            .collect();

        if symbols.is_empty() {
            return Err(UniverseError::Empty);
        }
        Ok(Self { symbols })
    }

    /// Append an exchange suffix (e.g. ".NS") to symbols that carry none.
    pub fn with_suffix(self, suffix: &str) -> Self {
        let suffix = suffix.trim().to_uppercase();
        if suffix.is_empty() {
            return self;
        }
        let symbols = self
            .symbols
            .into_iter()
            .map(|s| if s.contains('.') { s } else { format!("{s}{suffix}") })
            .collect();
        Self { symbols }
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn count(&self) -> usize {
        self.symbols.len()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s.eq_ignore_ascii_case(symbol))
    }
}
