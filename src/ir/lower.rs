//! AST to IR lowering
//!
//! Walks the analyzed AST and emits one IR function per source function.
//! Variables live in stack slots (`alloca`/`store`/`load`); parameters are
//! used by register directly. String literals are interned per module.
//!
//! Borrow expressions pass their operand value through unchanged: no
//! reference values materialize in the IR.

use super::builder::FunctionBuilder;
use super::opt;
use super::types::{Instruction, IrType, Module};
use crate::ast::{
    BinaryOp, Expr, ExprKind, FnDef, Literal, Program, Stmt, StmtKind, UnaryOp,
};
use crate::diagnostics::DiagnosticKind;
use crate::span::Span;
use std::collections::HashMap;
use thiserror::Error;

/// IR generation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IrError {
    #[error("Undefined variable: '{name}'")]
    UndefinedVariable { name: String, span: Span },
}

impl IrError {
    pub fn span(&self) -> Span {
        match self {
            IrError::UndefinedVariable { span, .. } => *span,
        }
    }

    pub fn kind(&self) -> DiagnosticKind {
        DiagnosticKind::IRGenerationError
    }
}

/// The result of IR generation
#[derive(Debug)]
pub struct IrOutput {
    /// The textual module
    pub ir: String,
    pub errors: Vec<IrError>,
    pub success: bool,
}

/// Generate IR for a program. `optimize` enables constant-folding
/// annotations and dead-code elimination.
pub fn generate_ir(program: &Program, optimize: bool) -> IrOutput {
    IrGenerator::new().generate(program, optimize)
}

/// How a name is stored inside a function
#[derive(Debug, Clone)]
struct Slot {
    /// The stack slot (`%tN`) or parameter register (`%name`)
    reg: String,
    ty: IrType,
    /// Stack slots are loaded/stored; parameters are used directly
    is_alloca: bool,
}

/// Lowers a program to an IR module
pub struct IrGenerator {
    module: Module,
    /// literal → interned id, mirroring `module.strings`
    string_ids: HashMap<String, usize>,
    errors: Vec<IrError>,
}

impl IrGenerator {
    pub fn new() -> Self {
        Self {
            module: Module::default(),
            string_ids: HashMap::new(),
            errors: Vec::new(),
        }
    }

    /// Lower the program and render the module text
    pub fn generate(mut self, program: &Program, optimize: bool) -> IrOutput {
        for stmt in &program.stmts {
            if let StmtKind::Function(f) = &stmt.kind {
                self.gen_function(f);
            }
        }

        if optimize {
            opt::fold_constants(&mut self.module);
            opt::eliminate_dead_code(&mut self.module);
        }

        let success = self.errors.is_empty();
        IrOutput {
            ir: self.module.to_string(),
            errors: self.errors,
            success,
        }
    }

    /// Intern a string literal, returning its `@.str.N` reference
    fn intern_string(&mut self, value: &str) -> String {
        let id = match self.string_ids.get(value) {
            Some(&id) => id,
            None => {
                let id = self.module.strings.len();
                self.module.strings.push(value.to_string());
                self.string_ids.insert(value.to_string(), id);
                id
            }
        };
        format!("@.str.{}", id)
    }

    fn gen_function(&mut self, f: &FnDef) {
        let ret = f
            .return_type
            .map(|ann| IrType::from_prim(ann.kind))
            .unwrap_or(IrType::Void);

        let params: Vec<(String, IrType)> = f
            .params
            .iter()
            .map(|p| (format!("%{}", p.name.name), IrType::from_prim(p.ty.kind)))
            .collect();

        let mut builder = FunctionBuilder::new(f.name.name.clone(), params.clone(), ret);

        let mut env: HashMap<String, Slot> = HashMap::new();
        for (param, (reg, ty)) in f.params.iter().zip(&params) {
            env.insert(
                param.name.name.clone(),
                Slot {
                    reg: reg.clone(),
                    ty: *ty,
                    is_alloca: false,
                },
            );
        }

        for stmt in &f.body.stmts {
            self.gen_stmt(stmt, &mut builder, &mut env);
        }

        // defensive terminator: fall off the end of the body
        if !builder.is_terminated() {
            if ret == IrType::Void {
                builder.ret(IrType::Void, None);
            } else {
                builder.ret(ret, Some(ret.default_value().to_string()));
            }
        }

        self.module.functions.push(builder.finish());
    }

    fn gen_stmt(&mut self, stmt: &Stmt, builder: &mut FunctionBuilder, env: &mut HashMap<String, Slot>) {
        match &stmt.kind {
            StmtKind::Let { name, ty, init, .. } => {
                let slot_ty = ty
                    .map(|ann| IrType::from_prim(ann.kind))
                    .or_else(|| init.as_ref().map(|e| self.infer_type(e, env)))
                    .unwrap_or(IrType::I32);

                let value = match init {
                    Some(expr) => self.gen_expr(expr, builder, env),
                    None => slot_ty.default_value().to_string(),
                };

                let slot = builder.fresh_temp();
                builder.emit(
                    Instruction::new(Some(slot.clone()), "alloca", vec![], Some(slot_ty))
                        .with_comment(name.name.clone()),
                );
                builder.emit(Instruction::new(
                    None,
                    "store",
                    vec![value, slot.clone()],
                    Some(slot_ty),
                ));

                env.insert(
                    name.name.clone(),
                    Slot {
                        reg: slot,
                        ty: slot_ty,
                        is_alloca: true,
                    },
                );
            }

            StmtKind::If {
                condition,
                then_block,
                else_block,
            } => {
                let cond = self.gen_expr(condition, builder, env);

                let then_label = builder.create_block("if.then");
                let else_label = else_block.as_ref().map(|_| builder.create_block("if.else"));
                let end_label = builder.create_block("if.end");

                builder.br_cond(cond, &then_label, else_label.as_deref().unwrap_or(&end_label));

                builder.switch_to(&then_label);
                for stmt in &then_block.stmts {
                    self.gen_stmt(stmt, builder, env);
                }
                if !builder.is_terminated() {
                    builder.br(&end_label);
                }

                if let (Some(else_label), Some(else_block)) = (else_label, else_block) {
                    builder.switch_to(&else_label);
                    for stmt in &else_block.stmts {
                        self.gen_stmt(stmt, builder, env);
                    }
                    if !builder.is_terminated() {
                        builder.br(&end_label);
                    }
                }

                builder.switch_to(&end_label);
            }

            StmtKind::While { condition, body } => {
                let header = builder.create_block("while.header");
                let body_label = builder.create_block("while.body");
                let end = builder.create_block("while.end");

                builder.br(&header);

                builder.switch_to(&header);
                let cond = self.gen_expr(condition, builder, env);
                builder.br_cond(cond, &body_label, &end);

                builder.switch_to(&body_label);
                for stmt in &body.stmts {
                    self.gen_stmt(stmt, builder, env);
                }
                if !builder.is_terminated() {
                    builder.br(&header);
                }

                builder.switch_to(&end);
            }

            StmtKind::Return { value } => match value {
                Some(expr) => {
                    let ty = self.infer_type(expr, env);
                    let value = self.gen_expr(expr, builder, env);
                    builder.ret(ty, Some(value));
                }
                None => builder.ret(IrType::Void, None),
            },

            StmtKind::Print { value } => {
                let ty = self.infer_type(value, env);
                let arg = self.gen_expr(value, builder, env);
                builder.emit(
                    Instruction::new(None, "call", vec!["print".to_string(), arg], Some(ty))
                        .with_comment("print"),
                );
            }

            StmtKind::Expr(expr) => {
                self.gen_expr(expr, builder, env);
            }

            // Functions are lowered at module level only.
            StmtKind::Function(_) => {}
        }
    }

    /// Lower an expression; the returned string is a temporary, a parameter
    /// register, a literal or a `@.str.N` reference.
    fn gen_expr(
        &mut self,
        expr: &Expr,
        builder: &mut FunctionBuilder,
        env: &mut HashMap<String, Slot>,
    ) -> String {
        match &expr.kind {
            ExprKind::Literal(lit) => match lit {
                Literal::Int(v) => v.to_string(),
                Literal::Float(v) => format!("{:?}", v),
                Literal::Bool(v) => if *v { "1" } else { "0" }.to_string(),
                Literal::Str(v) => self.intern_string(v),
            },

            ExprKind::Ident(ident) => match env.get(&ident.name) {
                Some(slot) if slot.is_alloca => {
                    let ty = slot.ty;
                    let reg = slot.reg.clone();
                    builder.emit_with_result("load", vec![reg], ty)
                }
                Some(slot) => slot.reg.clone(),
                None => {
                    self.errors.push(IrError::UndefinedVariable {
                        name: ident.name.clone(),
                        span: ident.span,
                    });
                    "0".to_string()
                }
            },

            ExprKind::Binary { op, left, right } => {
                let ty = self.infer_type(left, env);
                let lhs = self.gen_expr(left, builder, env);
                let rhs = self.gen_expr(right, builder, env);
                let opcode = binary_opcode(*op, ty);
                builder.emit_with_result(opcode, vec![lhs, rhs], ty)
            }

            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Neg => {
                    let ty = self.infer_type(operand, env);
                    let value = self.gen_expr(operand, builder, env);
                    if ty.is_float() {
                        builder.emit_with_result("fsub", vec!["0.0".to_string(), value], ty)
                    } else {
                        builder.emit_with_result("sub", vec!["0".to_string(), value], ty)
                    }
                }
                UnaryOp::Not => {
                    let value = self.gen_expr(operand, builder, env);
                    builder.emit_with_result("xor", vec![value, "1".to_string()], IrType::Bool)
                }
                // no reference values in the IR: borrows are the operand
                UnaryOp::Ref | UnaryOp::RefMut => self.gen_expr(operand, builder, env),
            },

            ExprKind::Assign { target, value } => {
                let rhs = self.gen_expr(value, builder, env);
                if let ExprKind::Ident(ident) = &target.kind {
                    match env.get(&ident.name) {
                        Some(slot) if slot.is_alloca => {
                            let ty = slot.ty;
                            let reg = slot.reg.clone();
                            builder.emit(Instruction::new(
                                None,
                                "store",
                                vec![rhs.clone(), reg],
                                Some(ty),
                            ));
                        }
                        Some(_) => {}
                        None => {
                            self.errors.push(IrError::UndefinedVariable {
                                name: ident.name.clone(),
                                span: ident.span,
                            });
                        }
                    }
                }
                rhs
            }
        }
    }

    /// Compute the IR type an expression evaluates to
    fn infer_type(&self, expr: &Expr, env: &HashMap<String, Slot>) -> IrType {
        match &expr.kind {
            ExprKind::Literal(Literal::Int(_)) => IrType::I32,
            ExprKind::Literal(Literal::Float(_)) => IrType::F64,
            ExprKind::Literal(Literal::Bool(_)) => IrType::Bool,
            ExprKind::Literal(Literal::Str(_)) => IrType::Str,
            ExprKind::Ident(ident) => env.get(&ident.name).map(|s| s.ty).unwrap_or(IrType::I32),
            ExprKind::Binary { op, left, .. } => {
                if op.is_comparison() || op.is_logical() {
                    IrType::Bool
                } else {
                    self.infer_type(left, env)
                }
            }
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Not => IrType::Bool,
                UnaryOp::Neg | UnaryOp::Ref | UnaryOp::RefMut => self.infer_type(operand, env),
            },
            ExprKind::Assign { target, .. } => self.infer_type(target, env),
        }
    }
}

impl Default for IrGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick the opcode for a binary operator over operands of type `ty`
fn binary_opcode(op: BinaryOp, ty: IrType) -> &'static str {
    let float = ty.is_float();
    match op {
        BinaryOp::Add => {
            if float {
                "fadd"
            } else {
                "add"
            }
        }
        BinaryOp::Sub => {
            if float {
                "fsub"
            } else {
                "sub"
            }
        }
        BinaryOp::Mul => {
            if float {
                "fmul"
            } else {
                "mul"
            }
        }
        BinaryOp::Div => {
            if float {
                "fdiv"
            } else {
                "sdiv"
            }
        }
        // modulo is integral only; the analyzer rejects `%` on floats
        BinaryOp::Rem => "srem",
        BinaryOp::Eq => {
            if float {
                "fcmp oeq"
            } else {
                "icmp eq"
            }
        }
        BinaryOp::Ne => {
            if float {
                "fcmp one"
            } else {
                "icmp ne"
            }
        }
        BinaryOp::Lt => {
            if float {
                "fcmp olt"
            } else {
                "icmp slt"
            }
        }
        BinaryOp::Le => {
            if float {
                "fcmp ole"
            } else {
                "icmp sle"
            }
        }
        BinaryOp::Gt => {
            if float {
                "fcmp ogt"
            } else {
                "icmp sgt"
            }
        }
        BinaryOp::Ge => {
            if float {
                "fcmp oge"
            } else {
                "icmp sge"
            }
        }
        BinaryOp::And => "and",
        BinaryOp::Or => "or",
    }
}
