//! Structured compiler diagnostics
//!
//! Every pipeline stage reports problems as [`Diagnostic`] values on a shared
//! bus: a kind, a human-readable message, a 1-based source position, and an
//! optional suggestion looked up from a keyword-to-hint table. Rendering
//! produces a colored message with the offending line and a caret under the
//! column.

use crate::span::{LineMap, Position};
use colored::{Color, Colorize};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of a diagnostic. All kinds except [`DiagnosticKind::UnusedVariable`]
/// and [`DiagnosticKind::Warning`] are fatal to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    LexicalError,
    ParseError,
    SemanticError,
    TypeError,
    OwnershipError,
    UnusedVariable,
    IRGenerationError,
    Warning,
}

impl DiagnosticKind {
    /// Return a human-friendly name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::LexicalError => "LexicalError",
            DiagnosticKind::ParseError => "ParseError",
            DiagnosticKind::SemanticError => "SemanticError",
            DiagnosticKind::TypeError => "TypeError",
            DiagnosticKind::OwnershipError => "OwnershipError",
            DiagnosticKind::UnusedVariable => "UnusedVariable",
            DiagnosticKind::IRGenerationError => "IRGenerationError",
            DiagnosticKind::Warning => "Warning",
        }
    }

    /// Whether this kind halts the pipeline.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DiagnosticKind::UnusedVariable | DiagnosticKind::Warning)
    }

    /// The icon shown in front of rendered messages.
    pub fn icon(&self) -> &'static str {
        match self {
            DiagnosticKind::UnusedVariable | DiagnosticKind::Warning => "⚠",
            _ => "✖",
        }
    }

    /// The color in which this message should be printed.
    pub fn color(&self) -> Color {
        match self {
            DiagnosticKind::UnusedVariable | DiagnosticKind::Warning => Color::BrightYellow,
            _ => Color::BrightRed,
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword-to-hint table. The first entry whose keyword occurs in the message
/// provides the suggestion.
const HINTS: &[(&str, &str)] = &[
    (
        "Undefined variable",
        "Declare the variable with `let` before using it, or check the spelling",
    ),
    (
        "Type mismatch",
        "Make the annotated type and the value's type agree, or change the annotation",
    ),
    (
        "Cannot assign to immutable",
        "Declare the variable with `let mut` to allow reassignment",
    ),
    (
        "Unterminated string literal",
        "Add a closing double quote before the end of the line",
    ),
    (
        "Expected",
        "Check for a missing or extra token just before this position",
    ),
    (
        "Cannot create mutable borrow",
        "Only one mutable borrow may be active, and never alongside immutable borrows",
    ),
    (
        "already borrowed",
        "Earlier borrows must go out of use before a conflicting borrow is created",
    ),
];

/// Look up the advisory hint for a message, if any keyword matches.
pub fn hint_for(message: &str) -> Option<&'static str> {
    HINTS
        .iter()
        .find(|(keyword, _)| message.contains(keyword))
        .map(|(_, hint)| *hint)
}

/// A structured error or warning with kind, message and position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The category of the diagnostic.
    pub kind: DiagnosticKind,
    /// The main message to report.
    pub message: String,
    /// Where in the source the problem is anchored. `(0, 0)` only for
    /// stage-level failures with no better location.
    pub pos: Position,
    /// Advisory suggestion attached from the hint table.
    pub suggestion: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic; a suggestion is attached automatically when a
    /// hint keyword matches the message.
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, pos: Position) -> Self {
        let message = message.into();
        let suggestion = hint_for(&message).map(str::to_owned);
        Self {
            kind,
            message,
            pos,
            suggestion,
        }
    }

    /// Whether this diagnostic halts the pipeline.
    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }

    /// Render this diagnostic with colors, the source line and a caret under
    /// the offending column.
    pub fn render(&self, source: &str, line_map: &LineMap) -> String {
        let mut out = String::new();
        out += &format!(
            "{} {}: {}\n",
            self.kind.icon().color(self.kind.color()).bold(),
            self.kind.as_str().color(self.kind.color()).bold(),
            self.message
        );

        if let Some(line) = line_map.line_text(source, self.pos.line) {
            let line_number = self.pos.line.to_string();
            out += &format!("{} | {}\n", line_number, line);
            let pad = line_number.len() + 3 + self.pos.column.saturating_sub(1) as usize;
            out += &" ".repeat(pad);
            out += &format!("{}\n", "^".color(self.kind.color()).bold());
        }

        if let Some(suggestion) = &self.suggestion {
            out += &format!("{}: {}\n", "hint".bright_cyan().bold(), suggestion);
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] line {}, column {}: {}",
            self.kind.icon(),
            self.kind,
            self.pos.line,
            self.pos.column,
            self.message
        )
    }
}
