//! Right-hand-side values compared against a selector's left-hand side.

use regex::bytes::{Regex, RegexBuilder};

use crate::config::RegexOptions;
use crate::error::ParseError;

/// A compiled regular expression right-hand side, carrying both the
/// original source (for diagnostics and `print_tree`) and the compiled
/// program used for matching.
#[derive(Debug, Clone)]
pub struct RegexRhs {
    /// The regex source as it appeared in the query.
    pub source: Vec<u8>,
    /// The compiled program.
    pub compiled: Regex,
}

impl PartialEq for RegexRhs {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for RegexRhs {}

impl RegexRhs {
    /// Compiles `source` (as UTF-8 query text) with the given options,
    /// reporting any rejection from the regex engine at `offset`.
    pub fn compile(source: &str, options: RegexOptions, offset: usize) -> Result<Self, ParseError> {
        let compiled = RegexBuilder::new(source)
            .case_insensitive(options.case_insensitive)
            .size_limit(options.size_limit)
            .build()
            .map_err(|e| ParseError::new(format!("regex compile error: {e}"), offset))?;
        Ok(RegexRhs {
            source: source.as_bytes().to_vec(),
            compiled,
        })
    }
}

/// A typed right-hand side, interpreted according to the operator family
/// it was parsed under (see the grammar's operator-family table).
#[derive(Debug, Clone, PartialEq)]
pub enum Rhs {
    Int(i64),
    Float(f64),
    Str(Vec<u8>),
    Regex(RegexRhs),
}

impl Rhs {
    /// Parses a numeric token payload as `Int` or `Float`, choosing the
    /// variant by the presence of a decimal point, matching how the
    /// grammar distinguishes the two numeric right-hand-side kinds.
    pub fn parse_numeric(text: &str, offset: usize) -> Result<Rhs, ParseError> {
        if text.contains('.') {
            text.parse::<f64>()
                .map(Rhs::Float)
                .map_err(|_| ParseError::new(format!("invalid floating point literal '{text}'"), offset))
        } else {
            text.parse::<i64>()
                .map(Rhs::Int)
                .map_err(|_| ParseError::new(format!("invalid integer literal '{text}'"), offset))
        }
    }
}
