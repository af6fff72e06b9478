//! Lexer for MiniRust
//!
//! The lexer converts source code into a stream of tokens. Token recognition
//! is driven by the `logos` derive on [`TokenKind`]; this wrapper adds the
//! pieces logos cannot express directly: fusing `&` with an adjacent `mut`
//! into the `&mut` operator, reporting unterminated literals, and attaching
//! 1-based line/column positions to every token.
//!
//! The lexer never fails: invalid input is recorded as a [`LexError`] and
//! skipped, and the token stream always ends with a single `Eof` token.

use crate::span::{LineMap, Span};
use crate::token::{Token, TokenKind};
use logos::Logos;
use thiserror::Error;

/// Lexer errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("Unexpected character: '{ch}'")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("Unterminated string literal")]
    UnterminatedString { offset: usize },

    #[error("Unterminated block comment")]
    UnterminatedBlockComment { offset: usize },
}

impl LexError {
    /// Byte offset the error is anchored to
    pub fn offset(&self) -> usize {
        match self {
            LexError::UnexpectedChar { offset, .. } => *offset,
            LexError::UnterminatedString { offset } => *offset,
            LexError::UnterminatedBlockComment { offset } => *offset,
        }
    }
}

/// The lexer for MiniRust
pub struct Lexer<'src> {
    source: &'src str,
    inner: logos::Lexer<'src, TokenKind>,
    line_map: LineMap,
    /// Raw token fetched while deciding on `&mut` fusion
    pending: Option<(TokenKind, Span)>,
    peeked: Option<Token>,
    errors: Vec<LexError>,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source code
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            inner: TokenKind::lexer(source),
            line_map: LineMap::new(source),
            pending: None,
            peeked: None,
            errors: Vec::new(),
        }
    }

    /// Get the source code
    pub fn source(&self) -> &'src str {
        self.source
    }

    /// Get the line map built for this source
    pub fn line_map(&self) -> &LineMap {
        &self.line_map
    }

    /// Get any errors that occurred during lexing
    pub fn errors(&self) -> &[LexError] {
        &self.errors
    }

    /// Peek at the next token without consuming it
    pub fn peek(&mut self) -> &Token {
        if self.peeked.is_none() {
            self.peeked = Some(self.lex_token());
        }
        self.peeked.as_ref().unwrap()
    }

    /// Get the next token; after the end of input this keeps returning `Eof`
    pub fn next_token(&mut self) -> Token {
        if let Some(token) = self.peeked.take() {
            return token;
        }
        self.lex_token()
    }

    /// Pull the next raw token out of logos, recording recoverable errors.
    /// Returns `None` at end of input.
    fn raw_next(&mut self) -> Option<(TokenKind, Span)> {
        if let Some(raw) = self.pending.take() {
            return Some(raw);
        }
        loop {
            match self.inner.next()? {
                Ok(TokenKind::UnterminatedStr) => {
                    let span = self.inner.span();
                    self.errors
                        .push(LexError::UnterminatedString { offset: span.start });
                }
                Ok(TokenKind::UnterminatedComment) => {
                    let span = self.inner.span();
                    self.errors
                        .push(LexError::UnterminatedBlockComment { offset: span.start });
                }
                Ok(kind) => {
                    let span = self.inner.span();
                    return Some((kind, Span::new(span.start, span.end)));
                }
                Err(()) => {
                    let span = self.inner.span();
                    let ch = self.source[span.start..].chars().next().unwrap_or('\u{fffd}');
                    self.errors.push(LexError::UnexpectedChar {
                        ch,
                        offset: span.start,
                    });
                }
            }
        }
    }

    fn lex_token(&mut self) -> Token {
        let (kind, span) = match self.raw_next() {
            Some(raw) => raw,
            None => {
                let pos = self.source.len();
                let span = Span::new(pos, pos);
                return Token::new(TokenKind::Eof, span, self.line_map.position(pos));
            }
        };

        // `&` immediately followed by `mut` is the borrow operator `&mut`.
        // `& mut` (with whitespace) stays two tokens, as does `&mutable`
        // where logos already lexed a longer identifier.
        if kind == TokenKind::Amp {
            if let Some((next_kind, next_span)) = self.raw_next() {
                if next_kind == TokenKind::Mut && next_span.start == span.end {
                    let merged = span.merge(next_span);
                    return Token::new(TokenKind::AmpMut, merged, self.line_map.position(merged.start));
                }
                self.pending = Some((next_kind, next_span));
            }
        }

        Token::new(kind, span, self.line_map.position(span.start))
    }

    /// Collect all tokens (terminated by `Eof`) and the errors encountered
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<LexError>) {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        (tokens, self.errors)
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            None
        } else {
            Some(token)
        }
    }
}

/// Helper function to lex source code
pub fn lex(source: &str) -> (Vec<Token>, Vec<LexError>) {
    Lexer::new(source).tokenize()
}

/// Translate a string literal's raw source text (including the surrounding
/// quotes) into its runtime value. Recognized escapes are `\n \t \r \\ \"`;
/// any other escaped character stands for itself.
pub fn unescape(raw: &str) -> String {
    let body = raw
        .strip_prefix('"')
        .map(|s| s.strip_suffix('"').unwrap_or(s))
        .unwrap_or(raw);

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
