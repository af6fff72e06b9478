//! Token definitions for MiniRust
//!
//! This module defines all the tokens that the lexer can produce.

use crate::span::{Position, Span};
use logos::Logos;
use serde::Serialize;
use std::fmt;

/// A token produced by the lexer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Line/column of the token's first character (1-based)
    pub pos: Position,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, pos: Position) -> Self {
        Self { kind, span, pos }
    }

    /// Get the text of this token from source
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        self.span.text(source)
    }
}

/// All possible token types in MiniRust
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[logos(skip r"[ \t\r\n]+")] // Skip whitespace
#[logos(skip r"//[^\n]*")] // Skip line comments
#[logos(skip r"/\*[^*]*\*+(?:[^/*][^*]*\*+)*/")] // Skip terminated block comments
pub enum TokenKind {
    // ============ Literals ============
    /// Integer literal: 42
    #[regex(r"[0-9]+", priority = 2)]
    Int,

    /// Float literal: 3.14
    #[regex(r"[0-9]+\.[0-9]+")]
    Float,

    /// String literal: "hello", "with \"escapes\""
    #[regex(r#""([^"\\]|\\.)*""#)]
    Str,

    /// A string literal missing its closing quote (reported, then skipped)
    #[regex(r#""([^"\\]|\\.)*"#)]
    UnterminatedStr,

    /// A `/*` comment missing its `*/` (reported, then skipped)
    #[regex(r"/\*([^*]|\*+[^*/])*\*?")]
    UnterminatedComment,

    /// Boolean literal
    #[token("true")]
    True,
    #[token("false")]
    False,

    // ============ Keywords ============
    #[token("fn")]
    Fn,
    #[token("let")]
    Let,
    #[token("mut")]
    Mut,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("loop")]
    Loop,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("return")]
    Return,
    #[token("print")]
    Print,

    // ============ Types ============
    #[token("i32")]
    I32,
    #[token("f64")]
    F64,
    #[token("bool")]
    Bool,
    #[token("str")]
    StrType,

    // ============ Operators ============
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,

    #[token("=")]
    Assign,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,

    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Not,

    /// `&` on its own; fused with an adjacent `mut` into [`TokenKind::AmpMut`]
    #[token("&")]
    Amp,
    /// The `&mut` borrow operator (produced by the lexer wrapper, never by logos)
    AmpMut,

    // ============ Delimiters ============
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    #[token(";")]
    Semi,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token("->")]
    Arrow,

    // ============ Identifiers ============
    /// Identifier: foo, _bar, my_var2
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    // ============ Special ============
    /// End of file
    Eof,
}

impl TokenKind {
    /// Check if this token is a reserved keyword
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Fn
                | TokenKind::Let
                | TokenKind::Mut
                | TokenKind::If
                | TokenKind::Else
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Loop
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Return
                | TokenKind::Print
                | TokenKind::True
                | TokenKind::False
        )
    }

    /// Check if this token names a primitive type
    pub fn is_type_name(&self) -> bool {
        matches!(
            self,
            TokenKind::I32 | TokenKind::F64 | TokenKind::Bool | TokenKind::StrType
        )
    }

    /// Check if this token is a literal
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TokenKind::Int | TokenKind::Float | TokenKind::Str | TokenKind::True | TokenKind::False
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Int => "integer",
            TokenKind::Float => "float",
            TokenKind::Str => "string",
            TokenKind::UnterminatedStr => "unterminated string",
            TokenKind::UnterminatedComment => "unterminated comment",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Fn => "fn",
            TokenKind::Let => "let",
            TokenKind::Mut => "mut",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::For => "for",
            TokenKind::Loop => "loop",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Return => "return",
            TokenKind::Print => "print",
            TokenKind::I32 => "i32",
            TokenKind::F64 => "f64",
            TokenKind::Bool => "bool",
            TokenKind::StrType => "str",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Assign => "=",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Lt => "<",
            TokenKind::LtEq => "<=",
            TokenKind::Gt => ">",
            TokenKind::GtEq => ">=",
            TokenKind::AndAnd => "&&",
            TokenKind::OrOr => "||",
            TokenKind::Not => "!",
            TokenKind::Amp => "&",
            TokenKind::AmpMut => "&mut",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Semi => ";",
            TokenKind::Colon => ":",
            TokenKind::Comma => ",",
            TokenKind::Arrow => "->",
            TokenKind::Ident => "identifier",
            TokenKind::Eof => "end of file",
        };
        write!(f, "{}", s)
    }
}
