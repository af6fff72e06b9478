//! Source code location tracking
//!
//! Tokens and AST nodes carry a [`Span`], a byte range into the source text.
//! Diagnostics are reported in 1-based line/column form; [`LineMap`] performs
//! that conversion once per compile, so spans themselves stay two plain
//! offsets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in the source code (line and column, both 1-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Line number (1-indexed)
    pub line: u32,
    /// Column number (1-indexed)
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A byte range in the source text, end exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// The smallest span covering both `self` and `other`. The parser uses
    /// this to give a binary expression the extent of its operands and a
    /// statement the extent from keyword to semicolon.
    pub fn merge(self, other: Span) -> Span {
        let start = if other.start < self.start { other.start } else { self.start };
        let end = if other.end > self.end { other.end } else { self.end };
        Span { start, end }
    }

    /// The source text this span covers (the token's lexeme)
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// Line information cache for byte-offset to line/column conversion.
///
/// Built once per source text; lookups binary-search the line-start table.
#[derive(Debug, Clone)]
pub struct LineMap {
    /// Byte offset of the start of each line
    line_starts: Vec<usize>,
}

impl LineMap {
    /// Build a line map from source text
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// Convert a byte offset to a 1-based line/column position
    pub fn position(&self, offset: usize) -> Position {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        };
        let line_start = self.line_starts.get(line).copied().unwrap_or(0);
        Position {
            line: line as u32 + 1,
            column: (offset - line_start) as u32 + 1,
        }
    }

    /// Extract the full text of the 1-based line containing `pos`, if any.
    pub fn line_text<'a>(&self, source: &'a str, line: u32) -> Option<&'a str> {
        let idx = line.checked_sub(1)? as usize;
        let start = *self.line_starts.get(idx)?;
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|&next| next - 1)
            .unwrap_or(source.len());
        Some(source[start..end].trim_end_matches('\r'))
    }
}
