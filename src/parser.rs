//! Parser for MiniRust
//!
//! A recursive descent parser that converts tokens into an AST, climbing
//! through one precedence level per function. On an unexpected token the
//! parser records the error and synchronizes at the next statement boundary,
//! so a single mistake does not take down the whole program.

use crate::ast::*;
use crate::lexer::unescape;
use crate::span::Span;
use crate::token::{Token, TokenKind};
use thiserror::Error;

/// Parser errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Expected {expected}, but got {found}('{lexeme}')")]
    Expected {
        expected: String,
        found: TokenKind,
        lexeme: String,
        span: Span,
    },

    #[error("Unexpected token: '{lexeme}'")]
    UnexpectedToken { lexeme: String, span: Span },

    #[error("Invalid number literal: '{lexeme}'")]
    InvalidNumber { lexeme: String, span: Span },
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::Expected { span, .. } => *span,
            ParseError::UnexpectedToken { span, .. } => *span,
            ParseError::InvalidNumber { span, .. } => *span,
        }
    }
}

/// Parse result
pub type ParseResult<T> = Result<T, ParseError>;

/// The parser for MiniRust
pub struct Parser<'src> {
    tokens: Vec<Token>,
    source: &'src str,
    pos: usize,
    errors: Vec<ParseError>,
}

impl<'src> Parser<'src> {
    /// Create a new parser over a token stream. The stream is expected to be
    /// terminated by `Eof`; one is synthesized if missing.
    pub fn new(mut tokens: Vec<Token>, source: &'src str) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let end = source.len();
            let map = crate::span::LineMap::new(source);
            tokens.push(Token::new(TokenKind::Eof, Span::new(end, end), map.position(end)));
        }
        Self {
            tokens,
            source,
            pos: 0,
            errors: Vec::new(),
        }
    }

    /// Get parse errors collected so far
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.pos.saturating_sub(1).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn is_at_end(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    /// Consume token if it matches
    fn consume(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume token if it matches, otherwise error
    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.expected(&kind.to_string()))
        }
    }

    fn expected(&self, what: &str) -> ParseError {
        let current = self.current();
        ParseError::Expected {
            expected: what.to_string(),
            found: current.kind,
            lexeme: current.text(self.source).to_string(),
            span: current.span,
        }
    }

    fn text(&self, token: &Token) -> &'src str {
        token.text(self.source)
    }

    // ============ Top-level parsing ============

    /// Parse a complete program. Errors are collected; the returned `Program`
    /// keeps every statement that parsed successfully.
    pub fn parse_program(&mut self) -> Program {
        let start = self.current().span.start;
        let mut stmts = Vec::new();

        while !self.is_at_end() {
            match self.parse_statement() {
                Ok(stmt) => stmts.push(stmt),
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize();
                }
            }
        }

        let end = self.previous().span.end.max(start);
        Program {
            stmts,
            span: Span::new(start, end),
        }
    }

    /// Skip tokens until just past a `;` or at the start of a statement
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semi {
                return;
            }
            match self.current().kind {
                TokenKind::Fn
                | TokenKind::Let
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Return => return,
                _ => {}
            }
            self.advance();
        }
    }

    // ============ Statements ============

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        match self.current().kind {
            TokenKind::Fn => self.parse_function(),
            TokenKind::Let => self.parse_let(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Print => self.parse_print(),
            // reserved keywords with no statement form yet
            TokenKind::For | TokenKind::Loop | TokenKind::Break | TokenKind::Continue => {
                Err(self.expected("a statement"))
            }
            _ => self.parse_expr_statement(),
        }
    }

    fn parse_function(&mut self) -> ParseResult<Stmt> {
        let start = self.current().span.start;
        self.expect(TokenKind::Fn)?;

        let name = self.parse_ident()?;
        self.expect(TokenKind::LParen)?;
        let params = self.parse_params()?;
        self.expect(TokenKind::RParen)?;

        let return_type = if self.consume(TokenKind::Arrow) {
            Some(self.parse_type()?)
        } else {
            None
        };

        let body = self.parse_block()?;
        let span = Span::new(start, self.previous().span.end);

        Ok(Stmt {
            kind: StmtKind::Function(FnDef {
                name,
                params,
                return_type,
                body,
                span,
            }),
            span,
        })
    }

    fn parse_params(&mut self) -> ParseResult<Vec<Param>> {
        let mut params = Vec::new();

        if !self.check(TokenKind::RParen) {
            loop {
                let start = self.current().span.start;
                let name = self.parse_ident()?;
                self.expect(TokenKind::Colon)?;
                let ty = self.parse_type()?;
                params.push(Param {
                    name,
                    ty,
                    span: Span::new(start, self.previous().span.end),
                });
                if !self.consume(TokenKind::Comma) {
                    break;
                }
            }
        }

        Ok(params)
    }

    fn parse_let(&mut self) -> ParseResult<Stmt> {
        let start = self.current().span.start;
        self.expect(TokenKind::Let)?;
        let mutable = self.consume(TokenKind::Mut);
        let name = self.parse_ident()?;

        let ty = if self.consume(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };

        let init = if self.consume(TokenKind::Assign) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        self.expect(TokenKind::Semi)?;
        let span = Span::new(start, self.previous().span.end);

        Ok(Stmt {
            kind: StmtKind::Let {
                name,
                mutable,
                ty,
                init,
            },
            span,
        })
    }

    fn parse_if(&mut self) -> ParseResult<Stmt> {
        let start = self.current().span.start;
        self.expect(TokenKind::If)?;
        let condition = self.parse_expr()?;
        let then_block = self.parse_block()?;

        let else_block = if self.consume(TokenKind::Else) {
            Some(self.parse_block()?)
        } else {
            None
        };

        let span = Span::new(start, self.previous().span.end);
        Ok(Stmt {
            kind: StmtKind::If {
                condition,
                then_block,
                else_block,
            },
            span,
        })
    }

    fn parse_while(&mut self) -> ParseResult<Stmt> {
        let start = self.current().span.start;
        self.expect(TokenKind::While)?;
        let condition = self.parse_expr()?;
        let body = self.parse_block()?;

        let span = Span::new(start, self.previous().span.end);
        Ok(Stmt {
            kind: StmtKind::While { condition, body },
            span,
        })
    }

    fn parse_return(&mut self) -> ParseResult<Stmt> {
        let start = self.current().span.start;
        self.expect(TokenKind::Return)?;

        let value = if self.check(TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };

        self.expect(TokenKind::Semi)?;
        let span = Span::new(start, self.previous().span.end);
        Ok(Stmt {
            kind: StmtKind::Return { value },
            span,
        })
    }

    fn parse_print(&mut self) -> ParseResult<Stmt> {
        let start = self.current().span.start;
        self.expect(TokenKind::Print)?;
        self.expect(TokenKind::LParen)?;
        let value = self.parse_expr()?;
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::Semi)?;

        let span = Span::new(start, self.previous().span.end);
        Ok(Stmt {
            kind: StmtKind::Print { value },
            span,
        })
    }

    fn parse_expr_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.parse_expr()?;
        self.expect(TokenKind::Semi)?;
        let span = Span::new(expr.span.start, self.previous().span.end);
        Ok(Stmt {
            kind: StmtKind::Expr(expr),
            span,
        })
    }

    fn parse_block(&mut self) -> ParseResult<Block> {
        let start = self.expect(TokenKind::LBrace)?.span.start;
        let mut stmts = Vec::new();

        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            match self.parse_statement() {
                Ok(stmt) => stmts.push(stmt),
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize();
                }
            }
        }

        let end = self.expect(TokenKind::RBrace)?.span.end;
        Ok(Block {
            stmts,
            span: Span::new(start, end),
        })
    }

    fn parse_ident(&mut self) -> ParseResult<Ident> {
        let token = self.expect(TokenKind::Ident)?;
        Ok(Ident::new(self.text(&token), token.span))
    }

    fn parse_type(&mut self) -> ParseResult<TypeAnn> {
        let kind = match self.current().kind {
            TokenKind::I32 => PrimType::I32,
            TokenKind::F64 => PrimType::F64,
            TokenKind::Bool => PrimType::Bool,
            TokenKind::StrType => PrimType::Str,
            _ => return Err(self.expected("type")),
        };
        let token = self.advance();
        Ok(TypeAnn {
            kind,
            span: token.span,
        })
    }

    // ============ Expressions ============

    pub fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> ParseResult<Expr> {
        let expr = self.parse_logic_or()?;

        if self.consume(TokenKind::Assign) {
            // right-associative: a = b = c parses as a = (b = c)
            let value = self.parse_assignment()?;
            let span = expr.span.merge(value.span);
            return Ok(Expr {
                kind: ExprKind::Assign {
                    target: Box::new(expr),
                    value: Box::new(value),
                },
                span,
            });
        }

        Ok(expr)
    }

    fn parse_logic_or(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_logic_and()?;
        while self.consume(TokenKind::OrOr) {
            let right = self.parse_logic_and()?;
            left = Self::binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_logic_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_equality()?;
        while self.consume(TokenKind::AndAnd) {
            let right = self.parse_equality()?;
            left = Self::binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.current().kind {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::Ne,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = Self::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::LtEq => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::GtEq => BinaryOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = Self::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_factor()?;
            left = Self::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Self::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.current().kind {
            TokenKind::Not => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Amp => Some(UnaryOp::Ref),
            TokenKind::AmpMut => Some(UnaryOp::RefMut),
            _ => None,
        };

        if let Some(op) = op {
            let token = self.advance();
            let operand = self.parse_unary()?;
            let span = token.span.merge(operand.span);
            return Ok(Expr {
                kind: ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            });
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Int => {
                self.advance();
                let lexeme = self.text(&token);
                let value = lexeme.parse::<i64>().map_err(|_| ParseError::InvalidNumber {
                    lexeme: lexeme.to_string(),
                    span: token.span,
                })?;
                Ok(Expr {
                    kind: ExprKind::Literal(Literal::Int(value)),
                    span: token.span,
                })
            }
            TokenKind::Float => {
                self.advance();
                let lexeme = self.text(&token);
                let value = lexeme.parse::<f64>().map_err(|_| ParseError::InvalidNumber {
                    lexeme: lexeme.to_string(),
                    span: token.span,
                })?;
                Ok(Expr {
                    kind: ExprKind::Literal(Literal::Float(value)),
                    span: token.span,
                })
            }
            TokenKind::Str => {
                self.advance();
                let value = unescape(self.text(&token));
                Ok(Expr {
                    kind: ExprKind::Literal(Literal::Str(value)),
                    span: token.span,
                })
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                Ok(Expr {
                    kind: ExprKind::Literal(Literal::Bool(token.kind == TokenKind::True)),
                    span: token.span,
                })
            }
            TokenKind::Ident => {
                self.advance();
                let name = self.text(&token).to_string();
                Ok(Expr {
                    kind: ExprKind::Ident(Ident::new(name, token.span)),
                    span: token.span,
                })
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            _ => Err(ParseError::UnexpectedToken {
                lexeme: self.text(&token).to_string(),
                span: token.span,
            }),
        }
    }

    fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        let span = left.span.merge(right.span);
        Expr {
            kind: ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        }
    }
}

/// Parse a token stream into a program, returning the (possibly partial)
/// AST together with all parse errors.
pub fn parse(tokens: Vec<Token>, source: &str) -> (Program, Vec<ParseError>) {
    let mut parser = Parser::new(tokens, source);
    let program = parser.parse_program();
    (program, parser.errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_ok(source: &str) -> Program {
        let (tokens, lex_errors) = lex(source);
        assert!(lex_errors.is_empty(), "lex errors: {:?}", lex_errors);
        let (program, errors) = parse(tokens, source);
        assert!(errors.is_empty(), "parse errors: {:?}", errors);
        program
    }

    fn parse_with_errors(source: &str) -> (Program, Vec<ParseError>) {
        let (tokens, _) = lex(source);
        parse(tokens, source)
    }

    #[test]
    fn test_empty_program() {
        let program = parse_ok("");
        assert!(program.stmts.is_empty());
    }

    #[test]
    fn test_function_definition() {
        let program = parse_ok("fn add(a: i32, b: i32) -> i32 { return a + b; }");
        assert_eq!(program.stmts.len(), 1);
        match &program.stmts[0].kind {
            StmtKind::Function(f) => {
                assert_eq!(f.name.name, "add");
                assert_eq!(f.params.len(), 2);
                assert_eq!(f.params[0].ty.kind, PrimType::I32);
                assert_eq!(f.return_type.map(|t| t.kind), Some(PrimType::I32));
                assert_eq!(f.body.stmts.len(), 1);
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_let_forms() {
        let program = parse_ok("let a = 1; let mut b: f64 = 2.0; let c: bool; let d;");
        assert_eq!(program.stmts.len(), 4);
        match &program.stmts[1].kind {
            StmtKind::Let { mutable, ty, init, .. } => {
                assert!(*mutable);
                assert_eq!(ty.map(|t| t.kind), Some(PrimType::F64));
                assert!(init.is_some());
            }
            other => panic!("expected let, got {:?}", other),
        }
        match &program.stmts[3].kind {
            StmtKind::Let { ty, init, .. } => {
                assert!(ty.is_none());
                assert!(init.is_none());
            }
            other => panic!("expected let, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence_mul_over_add() {
        let program = parse_ok("1 + 2 * 3;");
        match &program.stmts[0].kind {
            StmtKind::Expr(Expr {
                kind: ExprKind::Binary { op, left, right },
                ..
            }) => {
                assert_eq!(*op, BinaryOp::Add);
                assert!(matches!(left.kind, ExprKind::Literal(Literal::Int(1))));
                assert!(matches!(
                    right.kind,
                    ExprKind::Binary { op: BinaryOp::Mul, .. }
                ));
            }
            other => panic!("expected binary expr, got {:?}", other),
        }
    }

    #[test]
    fn test_comparison_binds_looser_than_term() {
        let program = parse_ok("a + 1 < b * 2;");
        match &program.stmts[0].kind {
            StmtKind::Expr(Expr {
                kind: ExprKind::Binary { op, .. },
                ..
            }) => assert_eq!(*op, BinaryOp::Lt),
            other => panic!("expected binary expr, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_right_associative() {
        let program = parse_ok("a = b = 1;");
        match &program.stmts[0].kind {
            StmtKind::Expr(Expr {
                kind: ExprKind::Assign { target, value },
                ..
            }) => {
                assert!(matches!(target.kind, ExprKind::Ident(_)));
                assert!(matches!(value.kind, ExprKind::Assign { .. }));
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_unary_chain() {
        let program = parse_ok("let x = !-1;");
        match &program.stmts[0].kind {
            StmtKind::Let { init: Some(expr), .. } => match &expr.kind {
                ExprKind::Unary { op, operand } => {
                    assert_eq!(*op, UnaryOp::Not);
                    assert!(matches!(
                        operand.kind,
                        ExprKind::Unary { op: UnaryOp::Neg, .. }
                    ));
                }
                other => panic!("expected unary, got {:?}", other),
            },
            other => panic!("expected let, got {:?}", other),
        }
    }

    #[test]
    fn test_borrow_operators() {
        let program = parse_ok("let y = &x; let z = &mut x;");
        match &program.stmts[1].kind {
            StmtKind::Let { init: Some(expr), .. } => {
                assert!(matches!(
                    expr.kind,
                    ExprKind::Unary { op: UnaryOp::RefMut, .. }
                ));
            }
            other => panic!("expected let, got {:?}", other),
        }
    }

    #[test]
    fn test_if_else_and_while() {
        let program = parse_ok("if a { print(1); } else { print(2); } while b { a = a; }");
        assert_eq!(program.stmts.len(), 2);
        match &program.stmts[0].kind {
            StmtKind::If { else_block, .. } => assert!(else_block.is_some()),
            other => panic!("expected if, got {:?}", other),
        }
        assert!(matches!(program.stmts[1].kind, StmtKind::While { .. }));
    }

    #[test]
    fn test_grouping_overrides_precedence() {
        let program = parse_ok("(1 + 2) * 3;");
        match &program.stmts[0].kind {
            StmtKind::Expr(Expr {
                kind: ExprKind::Binary { op, left, .. },
                ..
            }) => {
                assert_eq!(*op, BinaryOp::Mul);
                assert!(matches!(
                    left.kind,
                    ExprKind::Binary { op: BinaryOp::Add, .. }
                ));
            }
            other => panic!("expected binary expr, got {:?}", other),
        }
    }

    #[test]
    fn test_boolean_literals_promoted() {
        let program = parse_ok("let t = true; let f = false;");
        match &program.stmts[0].kind {
            StmtKind::Let { init: Some(expr), .. } => {
                assert!(matches!(expr.kind, ExprKind::Literal(Literal::Bool(true))));
            }
            other => panic!("expected let, got {:?}", other),
        }
    }

    #[test]
    fn test_error_message_shape() {
        let (_, errors) = parse_with_errors("let = 1;");
        assert!(!errors.is_empty());
        assert_eq!(errors[0].to_string(), "Expected identifier, but got =('=')");
    }

    #[test]
    fn test_recovery_keeps_siblings() {
        let source = "let a = 1; let = 2; let b = 3;";
        let (program, errors) = parse_with_errors(source);
        assert_eq!(errors.len(), 1);
        // the two good statements survive
        assert_eq!(program.stmts.len(), 2);
    }

    #[test]
    fn test_recovery_inside_block() {
        let source = "fn main() { let a = 1; let = 2; let b = 3; }";
        let (program, errors) = parse_with_errors(source);
        assert_eq!(errors.len(), 1);
        match &program.stmts[0].kind {
            StmtKind::Function(f) => assert_eq!(f.body.stmts.len(), 2),
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_reserved_keyword_is_error() {
        let (_, errors) = parse_with_errors("for;");
        assert!(!errors.is_empty());
        assert!(matches!(errors[0], ParseError::Expected { .. }));
        assert_eq!(errors[0].to_string(), "Expected a statement, but got for('for')");
    }

    #[test]
    fn test_all_reserved_keywords_rejected() {
        for source in ["loop;", "break;", "continue;"] {
            let (_, errors) = parse_with_errors(source);
            assert!(
                matches!(errors.first(), Some(ParseError::Expected { .. })),
                "{} should be rejected as a statement",
                source
            );
        }
    }

    #[test]
    fn test_statement_positions_within_input() {
        let source = "let a = 1;\nlet b = 2;";
        let program = parse_ok(source);
        for stmt in &program.stmts {
            assert!(stmt.span.start < source.len());
            assert!(stmt.span.end <= source.len());
        }
    }
}
