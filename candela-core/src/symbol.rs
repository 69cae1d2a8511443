use std::collections::BTreeSet;

use candela_types::{CandelaError, CanonicalSymbol, ContractMonth};

/// Pure, case-insensitive normalization of vendor symbol formats into
/// [`CanonicalSymbol`].
///
/// Recognized vendor decorations:
/// - a leading `@` or `/` prefix,
/// - a trailing `=F` futures suffix,
/// - contract codes `<root><monthCode><YY>` (four-digit years are folded to
///   two) for registered continuous roots.
#[derive(Debug, Clone)]
pub struct SymbolNormalizer {
    roots: BTreeSet<String>,
}

impl Default for SymbolNormalizer {
    fn default() -> Self {
        let mut roots = BTreeSet::new();
        roots.insert("ES".to_string());
        roots.insert("NQ".to_string());
        Self { roots }
    }
}

impl SymbolNormalizer {
    /// A normalizer with no registered continuous roots.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            roots: BTreeSet::new(),
        }
    }

    /// Register an additional continuous-future root.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.roots.insert(root.into().to_ascii_uppercase());
        self
    }

    /// Whether `root` is a registered continuous root.
    #[must_use]
    pub fn is_registered_root(&self, root: &str) -> bool {
        self.roots.contains(&root.to_ascii_uppercase())
    }

    /// Normalize a raw vendor symbol.
    ///
    /// # Errors
    /// Returns `CandelaError::Symbol` on empty input or characters outside
    /// the ticker alphabet.
    pub fn normalize(&self, input: &str) -> Result<CanonicalSymbol, CandelaError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(CandelaError::Symbol("empty symbol".to_string()));
        }

        let mut s = trimmed;
        if let Some(rest) = s.strip_prefix(['@', '/']) {
            s = rest;
        }
        let upper = s.to_ascii_uppercase();
        let mut s = upper.as_str();
        if let Some(rest) = s.strip_suffix("=F") {
            s = rest;
        }
        if s.is_empty() {
            return Err(CandelaError::Symbol(format!(
                "symbol {input:?} is only vendor decoration"
            )));
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return Err(CandelaError::Symbol(format!(
                "symbol {input:?} contains unsupported characters"
            )));
        }

        if self.roots.contains(s) {
            return Ok(CanonicalSymbol::Continuous(s.to_string()));
        }
        if let Some(contract) = self.parse_contract(s) {
            return Ok(contract);
        }
        Ok(CanonicalSymbol::Ticker(s.to_string()))
    }

    /// Try to read `s` as `<registered root><monthCode><YY|YYYY>`.
    fn parse_contract(&self, s: &str) -> Option<CanonicalSymbol> {
        let digits = s.chars().rev().take_while(char::is_ascii_digit).count();
        if digits != 2 && digits != 4 {
            return None;
        }
        let head = &s[..s.len() - digits];
        let month = ContractMonth::from_code(head.chars().last()?)?;
        let root = &head[..head.len() - 1];
        if root.is_empty() || !self.roots.contains(root) {
            return None;
        }
        let year: u32 = s[s.len() - digits..].parse().ok()?;
        let year = u8::try_from(year % 100).ok()?;
        Some(CanonicalSymbol::Contract {
            root: root.to_string(),
            month,
            year,
        })
    }
}
