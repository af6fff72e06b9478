//! The compilation pipeline
//!
//! Runs the stages in order — lexer, parser, semantic analyzer, IR
//! generator — on one shared diagnostic bus. A stage whose diagnostics
//! include a fatal entry short-circuits the stages after it, but every
//! product produced so far is still returned for inspection.
//!
//! Each call constructs fresh per-stage state: compiles are re-entrant and
//! running the pipeline twice on the same input yields byte-identical IR.

use crate::ast::Program;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::ir;
use crate::lexer::{self, LexError};
use crate::parser::{self, ParseError};
use crate::sema::{self, Analysis, SemaError};
use crate::span::LineMap;
use crate::token::Token;

/// Pipeline switches
#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    /// Run the borrow-count analysis and collect the ownership trace
    pub check_ownership: bool,
    /// Annotate constant folds and eliminate dead code in the IR
    pub optimize: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            check_ownership: true,
            optimize: true,
        }
    }
}

/// Everything a compile produced before it finished or halted
#[derive(Debug)]
pub struct CompileOutput {
    /// Tokens, terminated by `Eof` (always present)
    pub tokens: Vec<Token>,
    /// The AST, possibly partial under parse errors
    pub ast: Option<Program>,
    /// Semantic analysis products
    pub analysis: Option<Analysis>,
    /// The textual IR module
    pub ir: Option<String>,
    /// The shared diagnostic bus, in production order
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileOutput {
    /// True when no fatal diagnostic was produced
    pub fn success(&self) -> bool {
        !self.diagnostics.iter().any(Diagnostic::is_fatal)
    }
}

fn lex_diagnostic(error: &LexError, map: &LineMap) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::LexicalError,
        error.to_string(),
        map.position(error.offset()),
    )
}

fn parse_diagnostic(error: &ParseError, map: &LineMap) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::ParseError,
        error.to_string(),
        map.position(error.span().start),
    )
}

fn sema_diagnostic(error: &SemaError, map: &LineMap) -> Diagnostic {
    Diagnostic::new(error.kind(), error.to_string(), map.position(error.span().start))
}

fn ir_diagnostic(error: &ir::IrError, map: &LineMap) -> Diagnostic {
    Diagnostic::new(error.kind(), error.to_string(), map.position(error.span().start))
}

/// Tokenize source text
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let map = LineMap::new(source);
    let (tokens, errors) = lexer::lex(source);
    let diagnostics = errors.iter().map(|e| lex_diagnostic(e, &map)).collect();
    (tokens, diagnostics)
}

/// Parse a token stream
pub fn parse(tokens: Vec<Token>, source: &str) -> (Program, Vec<Diagnostic>) {
    let map = LineMap::new(source);
    let (program, errors) = parser::parse(tokens, source);
    let diagnostics = errors.iter().map(|e| parse_diagnostic(e, &map)).collect();
    (program, diagnostics)
}

/// Run semantic analysis; the diagnostic list carries errors first, then the
/// warnings the final unused-variable pass produced.
pub fn analyze(program: &Program, source: &str, check_ownership: bool) -> (Analysis, Vec<Diagnostic>) {
    let map = LineMap::new(source);
    let analysis = sema::analyze(program, check_ownership);
    let mut diagnostics: Vec<Diagnostic> = analysis
        .errors
        .iter()
        .map(|e| sema_diagnostic(e, &map))
        .collect();
    diagnostics.extend(analysis.warnings.iter().map(|w| sema_diagnostic(w, &map)));
    (analysis, diagnostics)
}

/// Generate IR for an analyzed program
pub fn generate_ir(program: &Program, source: &str, optimize: bool) -> (ir::IrOutput, Vec<Diagnostic>) {
    let map = LineMap::new(source);
    let output = ir::generate_ir(program, optimize);
    let diagnostics = output.errors.iter().map(|e| ir_diagnostic(e, &map)).collect();
    (output, diagnostics)
}

/// Compile source text through every stage, halting at the first stage with
/// a fatal diagnostic but returning all earlier products.
pub fn compile(source: &str, options: CompileOptions) -> CompileOutput {
    let (tokens, lex_diags) = tokenize(source);
    let mut output = CompileOutput {
        tokens,
        ast: None,
        analysis: None,
        ir: None,
        diagnostics: lex_diags,
    };
    if output.diagnostics.iter().any(Diagnostic::is_fatal) {
        return output;
    }

    let (program, parse_diags) = parse(output.tokens.clone(), source);
    output.diagnostics.extend(parse_diags);
    if output.diagnostics.iter().any(Diagnostic::is_fatal) {
        output.ast = Some(program);
        return output;
    }

    let (analysis, sema_diags) = analyze(&program, source, options.check_ownership);
    let failed = !analysis.success;
    output.analysis = Some(analysis);
    output.diagnostics.extend(sema_diags);
    if failed {
        output.ast = Some(program);
        return output;
    }

    let (ir_output, ir_diags) = generate_ir(&program, source, options.optimize);
    output.ast = Some(program);
    output.ir = Some(ir_output.ir);
    output.diagnostics.extend(ir_diags);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_compile_produces_everything() {
        let output = compile(
            "fn main() { let x: i32 = 1; print(x); }",
            CompileOptions::default(),
        );
        assert!(output.success(), "diagnostics: {:?}", output.diagnostics);
        assert!(!output.tokens.is_empty());
        assert!(output.ast.is_some());
        assert!(output.analysis.is_some());
        assert!(output.ir.is_some());
    }

    #[test]
    fn test_lex_failure_halts_before_parse() {
        let output = compile("let a § = 1;", CompileOptions::default());
        assert!(!output.success());
        assert!(output.ast.is_none());
        assert!(output.ir.is_none());
        assert_eq!(output.diagnostics[0].kind, DiagnosticKind::LexicalError);
        // the token stream is still returned for inspection
        assert!(!output.tokens.is_empty());
    }

    #[test]
    fn test_parse_failure_keeps_partial_ast() {
        let output = compile("let a = 1; let = 2;", CompileOptions::default());
        assert!(!output.success());
        assert!(output.ast.is_some());
        assert!(output.analysis.is_none());
        assert!(output.ir.is_none());
        assert!(output
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::ParseError));
        assert_eq!(output.ast.as_ref().unwrap().stmts.len(), 1);
    }

    #[test]
    fn test_sema_failure_halts_before_ir() {
        let output = compile(
            "fn main() { let x: i32 = 1; x = 2; }",
            CompileOptions::default(),
        );
        assert!(!output.success());
        assert!(output.analysis.is_some());
        assert!(output.ir.is_none());
    }

    #[test]
    fn test_warnings_do_not_halt() {
        let output = compile("fn main() { let x: i32 = 1; }", CompileOptions::default());
        assert!(output.success());
        assert!(output.ir.is_some());
        assert!(output
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::UnusedVariable));
    }

    #[test]
    fn test_positions_on_bus_are_one_based() {
        let output = compile("fn main() {\n  print(ghost);\n}", CompileOptions::default());
        let diag = output
            .diagnostics
            .iter()
            .find(|d| d.kind == DiagnosticKind::SemanticError)
            .expect("undefined variable diagnostic");
        assert_eq!(diag.pos.line, 2);
        assert_eq!(diag.pos.column, 9);
    }
}
