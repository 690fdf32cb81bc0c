//! Core types and constants for the SCSS compiler

use std::fmt;

// Compile limits
pub const MAX_IMPORT_DEPTH: usize = 16;
pub const MAX_WHILE_ITERATIONS: usize = 10_000;
pub const MAX_EXTEND_SELECTORS: usize = 4_096;
/// Nested mixin and function calls; kept low enough to fit a 2 MB thread stack
pub const MAX_CALL_DEPTH: usize = 64;

/// Decimal places kept when printing numbers
pub const NUMBER_PRECISION: i32 = 5;

/// How `url(...)` references inside imported stylesheets are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UrlMode {
    /// Leave every url verbatim
    Absolute,
    /// Rewrite every relative url against the imported file's directory
    Relative,
    /// Rewrite only declarations whose value is a single `url(...)`
    #[default]
    Mixed,
}

impl UrlMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "absolute" => Some(Self::Absolute),
            "relative" => Some(Self::Relative),
            "mixed" => Some(Self::Mixed),
            _ => None,
        }
    }
}

impl fmt::Display for UrlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlMode::Absolute => write!(f, "absolute"),
            UrlMode::Relative => write!(f, "relative"),
            UrlMode::Mixed => write!(f, "mixed"),
        }
    }
}

/// Location of a node in its source file, used for diagnostics only
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourcePosition {
    pub uri: String,
    pub line: usize,
    pub column: usize,
}

impl SourcePosition {
    pub fn new(uri: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            uri: uri.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.uri, self.line, self.column)
    }
}
