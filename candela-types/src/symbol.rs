use core::fmt;

use serde::{Deserialize, Serialize};

/// CME-style futures delivery month codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContractMonth {
    /// January.
    F,
    /// February.
    G,
    /// March.
    H,
    /// April.
    J,
    /// May.
    K,
    /// June.
    M,
    /// July.
    N,
    /// August.
    Q,
    /// September.
    U,
    /// October.
    V,
    /// November.
    X,
    /// December.
    Z,
}

impl ContractMonth {
    /// The single-letter exchange code.
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::F => 'F',
            Self::G => 'G',
            Self::H => 'H',
            Self::J => 'J',
            Self::K => 'K',
            Self::M => 'M',
            Self::N => 'N',
            Self::Q => 'Q',
            Self::U => 'U',
            Self::V => 'V',
            Self::X => 'X',
            Self::Z => 'Z',
        }
    }

    /// Calendar month number (1-12) of the delivery month.
    #[must_use]
    pub const fn month(self) -> u32 {
        match self {
            Self::F => 1,
            Self::G => 2,
            Self::H => 3,
            Self::J => 4,
            Self::K => 5,
            Self::M => 6,
            Self::N => 7,
            Self::Q => 8,
            Self::U => 9,
            Self::V => 10,
            Self::X => 11,
            Self::Z => 12,
        }
    }

    /// Parse a month code letter (case-insensitive).
    #[must_use]
    pub const fn from_code(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'F' => Some(Self::F),
            'G' => Some(Self::G),
            'H' => Some(Self::H),
            'J' => Some(Self::J),
            'K' => Some(Self::K),
            'M' => Some(Self::M),
            'N' => Some(Self::N),
            'Q' => Some(Self::Q),
            'U' => Some(Self::U),
            'V' => Some(Self::V),
            'X' => Some(Self::X),
            'Z' => Some(Self::Z),
            _ => None,
        }
    }
}

/// A vendor-agnostic instrument identity after normalization.
///
/// Vendor prefixes (`@`, `/`) and suffixes (`=F`) never appear here; contract
/// years are always two digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalSymbol {
    /// A plain stock ticker, e.g. `AAPL`.
    Ticker(String),
    /// A continuous futures root, e.g. `ES`, that resolves to a specific
    /// contract under a rollover rule.
    Continuous(String),
    /// A specific futures contract, e.g. `ESH25`.
    Contract {
        /// Futures root, e.g. `ES`.
        root: String,
        /// Delivery month code.
        month: ContractMonth,
        /// Two-digit delivery year.
        year: u8,
    },
}

impl CanonicalSymbol {
    /// The futures root when this symbol is futures-shaped.
    #[must_use]
    pub fn root(&self) -> Option<&str> {
        match self {
            Self::Ticker(_) => None,
            Self::Continuous(root) | Self::Contract { root, .. } => Some(root),
        }
    }

    /// Canonical string form, suitable as a storage key.
    #[must_use]
    pub fn code(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CanonicalSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ticker(s) | Self::Continuous(s) => f.write_str(s),
            Self::Contract { root, month, year } => {
                write!(f, "{root}{}{year:02}", month.code())
            }
        }
    }
}
