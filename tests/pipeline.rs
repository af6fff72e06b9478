//! End-to-end pipeline tests
//!
//! Each scenario feeds source text through the whole pipeline and checks the
//! observable products: diagnostics with exact messages, the ownership
//! trace, and the emitted IR (whose exact bytes are part of the contract).

use minirust::diagnostics::DiagnosticKind;
use minirust::pipeline::{compile, CompileOptions};
use pretty_assertions::assert_eq;

const NO_OPT: CompileOptions = CompileOptions {
    check_ownership: true,
    optimize: false,
};

const OPT: CompileOptions = CompileOptions {
    check_ownership: true,
    optimize: true,
};

fn fatal_messages(output: &minirust::CompileOutput) -> Vec<String> {
    output
        .diagnostics
        .iter()
        .filter(|d| d.is_fatal())
        .map(|d| d.message.clone())
        .collect()
}

#[test]
fn scenario_constant_folding_pipeline() {
    let output = compile("fn main() { let x: i32 = 2 + 3 * 4; print(x); }", OPT);
    assert!(output.success(), "diagnostics: {:?}", output.diagnostics);

    let ir = output.ir.expect("ir produced");
    assert!(ir.contains("%t0 = mul i32 3, 4 ; constant folded: 12"));
    assert!(ir.contains("%t1 = add i32 2, %t0 ; constant folded: 14"));
    assert!(ir.contains("%t2 = alloca i32 ; x"));
    assert!(ir.contains("store i32 %t1, i32* %t2 ; constant folded: 14"));
    assert!(ir.contains("call void @print(i32 %t3) ; print"));
    assert!(ir.contains("ret void"));
}

#[test]
fn scenario_assign_to_immutable() {
    let output = compile("fn main() { let x: i32 = 1; x = 2; }", NO_OPT);
    assert!(!output.success());
    assert_eq!(
        fatal_messages(&output),
        vec!["Cannot assign to immutable variable 'x'"]
    );
    let diag = &output.diagnostics[0];
    assert_eq!(diag.kind, DiagnosticKind::OwnershipError);
    // anchored at the assignment target on line 1
    assert_eq!(diag.pos.line, 1);
    assert_eq!(diag.pos.column, 29);
}

#[test]
fn scenario_mutable_borrow_after_shared() {
    let output = compile(
        "fn main() { let mut x: i32 = 1; let y = &x; let z = &mut x; }",
        NO_OPT,
    );
    assert!(!output.success());
    assert_eq!(
        fatal_messages(&output),
        vec!["Cannot create mutable borrow: 'x' is already borrowed"]
    );
}

#[test]
fn scenario_if_condition_not_bool() {
    let output = compile("fn main() { let mut x: i32 = 0; if x { } }", NO_OPT);
    assert!(!output.success());
    assert_eq!(
        fatal_messages(&output),
        vec!["If condition must be of type bool, found 'i32'"]
    );
    assert_eq!(output.diagnostics[0].kind, DiagnosticKind::TypeError);
}

#[test]
fn scenario_annotation_mismatch() {
    let output = compile("fn main() { let x: i32 = 1.0; }", NO_OPT);
    assert!(!output.success());
    assert_eq!(
        fatal_messages(&output),
        vec!["Type mismatch: expected 'i32', found 'f64'"]
    );
}

#[test]
fn scenario_unused_variable_warns_but_compiles() {
    let output = compile("fn main() { let x: i32 = 1; }", NO_OPT);
    assert!(output.success());
    assert!(output.ir.is_some());

    let warnings: Vec<&str> = output
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::UnusedVariable)
        .map(|d| d.message.as_str())
        .collect();
    assert_eq!(warnings, vec!["Variable 'x' is declared but never used"]);
}

#[test]
fn ir_snapshot_simple_program() {
    let output = compile("fn main() { let x: i32 = 1; print(x); }", NO_OPT);
    assert!(output.success(), "diagnostics: {:?}", output.diagnostics);

    let expected = "\
; MiniRust Compiler - Generated LLVM IR

declare void @print(i32)
declare void @print(double)
declare void @print(i8*)

define void @main() {
entry:
  %t0 = alloca i32 ; x
  store i32 1, i32* %t0
  %t1 = load i32, i32* %t0
  call void @print(i32 %t1) ; print
  ret void
}
";
    assert_eq!(output.ir.unwrap(), expected);
}

#[test]
fn ir_snapshot_while_loop() {
    let output = compile(
        "fn count() { let mut i: i32 = 0; while i < 2 { i = i + 1; } print(i); }",
        NO_OPT,
    );
    assert!(output.success(), "diagnostics: {:?}", output.diagnostics);

    let expected = "\
; MiniRust Compiler - Generated LLVM IR

declare void @print(i32)
declare void @print(double)
declare void @print(i8*)

define void @count() {
entry:
  %t0 = alloca i32 ; i
  store i32 0, i32* %t0
  br label %while.header
while.header:
  %t1 = load i32, i32* %t0
  %t2 = icmp slt i32 %t1, 2
  br i1 %t2, label %while.body, label %while.end
while.body:
  %t3 = load i32, i32* %t0
  %t4 = add i32 %t3, 1
  store i32 %t4, i32* %t0
  br label %while.header
while.end:
  %t5 = load i32, i32* %t0
  call void @print(i32 %t5) ; print
  ret void
}
";
    assert_eq!(output.ir.unwrap(), expected);
}

#[test]
fn ir_snapshot_string_module() {
    let output = compile(r#"fn main() { print("hi\n"); }"#, NO_OPT);
    assert!(output.success(), "diagnostics: {:?}", output.diagnostics);

    let expected = "\
; MiniRust Compiler - Generated LLVM IR

@.str.0 = private unnamed_addr constant [4 x i8] c\"hi\\0A\\00\"

declare void @print(i32)
declare void @print(double)
declare void @print(i8*)

define void @main() {
entry:
  call void @print(i8* @.str.0) ; print
  ret void
}
";
    assert_eq!(output.ir.unwrap(), expected);
}

#[test]
fn law_compile_is_deterministic() {
    let source = r#"
        fn main() {
            let mut total: i32 = 0;
            let limit: i32 = 5;
            while total < limit {
                total = total + 1;
            }
            if total == limit {
                print("done");
            } else {
                print(total);
            }
        }
    "#;
    let first = compile(source, OPT);
    let second = compile(source, OPT);
    assert!(first.success(), "diagnostics: {:?}", first.diagnostics);
    assert_eq!(first.ir.unwrap(), second.ir.unwrap());
}

#[test]
fn law_no_removal_without_optimize() {
    // the bare `x;` statement loads a value nothing consumes
    let source = "fn main() { let mut x: i32 = 1; x; print(x); }";

    let plain = compile(source, NO_OPT);
    assert!(plain.success(), "diagnostics: {:?}", plain.diagnostics);
    let plain_ir = plain.ir.unwrap();
    assert!(plain_ir.contains("%t1 = load i32, i32* %t0"));

    let optimized = compile(source, OPT);
    let optimized_ir = optimized.ir.unwrap();
    // the dead load is gone, and its temp appears in no surviving operand
    assert!(!optimized_ir.contains("%t1 ="));
    assert!(!optimized_ir.contains(", %t1"));
    assert!(!optimized_ir.contains("(%t1"));
    // the live load that feeds print survives
    assert!(optimized_ir.contains("%t2 = load i32, i32* %t0"));
}

#[test]
fn law_token_positions_valid() {
    let source = "fn main() {\n    let x = 1;\n    print(x);\n}";
    let (tokens, diags) = minirust::pipeline::tokenize(source);
    assert!(diags.is_empty());
    for token in &tokens {
        assert!(token.pos.line >= 1);
        assert!(token.pos.column >= 1);
    }
}

#[test]
fn ownership_trace_reported_through_pipeline() {
    let output = compile(
        "fn main() { let mut a: i32 = 1; a = 2; let b = &a; print(b); }",
        NO_OPT,
    );
    assert!(output.success(), "diagnostics: {:?}", output.diagnostics);
    let analysis = output.analysis.expect("analysis produced");
    assert_eq!(
        analysis.ownership,
        vec![
            "Variable 'a' takes ownership of its value",
            "Assignment transfers ownership to 'a'",
            "Immutable borrow of 'a'",
            "Variable 'b' takes ownership of its value",
        ]
    );
}

#[test]
fn multiple_functions_emitted_in_order() {
    let output = compile(
        "fn first() { print(1); } fn second() -> i32 { return 2; }",
        NO_OPT,
    );
    assert!(output.success(), "diagnostics: {:?}", output.diagnostics);
    let ir = output.ir.unwrap();
    let first = ir.find("define void @first()").expect("first defined");
    let second = ir.find("define i32 @second()").expect("second defined");
    assert!(first < second);
    assert!(ir.contains("ret i32 2"));
}

#[test]
fn lexical_error_still_returns_tokens() {
    let output = compile("fn main() { let x = 1 ?; }", NO_OPT);
    assert!(!output.success());
    assert_eq!(output.diagnostics[0].kind, DiagnosticKind::LexicalError);
    assert_eq!(output.diagnostics[0].message, "Unexpected character: '?'");
    assert!(!output.tokens.is_empty());
    assert!(output.ast.is_none());
}

#[test]
fn diagnostics_carry_hints() {
    let output = compile("fn main() { print(ghost); }", NO_OPT);
    let diag = output
        .diagnostics
        .iter()
        .find(|d| d.message.contains("Undefined variable"))
        .expect("undefined variable diagnostic");
    assert!(diag.suggestion.is_some());
}
