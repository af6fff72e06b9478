//! Type checking traversal
//!
//! One post-order walk over the AST: declarations populate the scope stack,
//! expressions are typed bottom-up, and the borrow rules fire as the walk
//! encounters `&`/`&mut` when ownership checking is enabled. Errors never
//! abort the walk; the analyzer keeps going and reports everything it finds.

use super::error::SemaError;
use super::ownership;
use super::scope::{ScopeStack, Symbol, SymbolKind, SymbolTable};
use super::ty::Ty;
use super::Analysis;
use crate::ast::{
    BinaryOp, Block, Expr, ExprKind, FnDef, Ident, Literal, Program, Stmt, StmtKind, UnaryOp,
};
use crate::span::Span;

/// The semantic analyzer
pub struct SemanticAnalyzer {
    scopes: ScopeStack,
    errors: Vec<SemaError>,
    warnings: Vec<SemaError>,
    trace: Vec<String>,
    check_ownership: bool,
    /// Declared return type of the enclosing function, if any
    current_return: Option<Ty>,
}

impl SemanticAnalyzer {
    pub fn new(check_ownership: bool) -> Self {
        Self {
            scopes: ScopeStack::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            trace: Vec::new(),
            check_ownership,
            current_return: None,
        }
    }

    /// Analyze a complete program
    pub fn analyze(mut self, program: &Program) -> Analysis {
        // The global scope always knows the built-in `print`.
        let print = Symbol::new("print", Ty::Function, false, SymbolKind::Builtin, Span::default());
        self.scopes.define(print).ok();

        for stmt in &program.stmts {
            self.visit_stmt(stmt);
        }

        let symbols = std::mem::take(&mut self.scopes).finish();
        self.report_unused(&symbols);

        let success = self.errors.is_empty();
        Analysis {
            symbols,
            errors: self.errors,
            warnings: self.warnings,
            ownership: self.trace,
            success,
        }
    }

    /// Warn about every declared variable or parameter that was never read.
    /// Functions and the `print` builtin are exempt.
    fn report_unused(&mut self, symbols: &SymbolTable) {
        for symbol in symbols.iter() {
            let reportable = matches!(symbol.kind, SymbolKind::Variable | SymbolKind::Parameter);
            if reportable && !symbol.used {
                self.warnings.push(SemaError::UnusedVariable {
                    name: symbol.name.clone(),
                    span: symbol.span,
                });
            }
        }
    }

    // ============ Statements ============

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Function(f) => self.visit_function(f),
            StmtKind::Let {
                name,
                mutable,
                ty,
                init,
            } => self.visit_let(name, *mutable, ty.as_ref(), init.as_ref()),
            StmtKind::If {
                condition,
                then_block,
                else_block,
            } => {
                let cond_ty = self.visit_expr(condition);
                if cond_ty != Ty::Bool && cond_ty != Ty::Unknown {
                    self.errors.push(SemaError::IfConditionNotBool {
                        found: cond_ty,
                        span: condition.span,
                    });
                }
                self.visit_block(then_block);
                if let Some(else_block) = else_block {
                    self.visit_block(else_block);
                }
            }
            StmtKind::While { condition, body } => {
                let cond_ty = self.visit_expr(condition);
                if cond_ty != Ty::Bool && cond_ty != Ty::Unknown {
                    self.errors.push(SemaError::WhileConditionNotBool {
                        found: cond_ty,
                        span: condition.span,
                    });
                }
                self.visit_block(body);
            }
            StmtKind::Return { value } => {
                let found = match value {
                    Some(expr) => self.visit_expr(expr),
                    None => Ty::Void,
                };
                match self.current_return.clone() {
                    None => self.errors.push(SemaError::ReturnOutsideFunction { span: stmt.span }),
                    Some(expected) => {
                        if found != expected && found != Ty::Unknown {
                            self.errors.push(SemaError::ReturnTypeMismatch {
                                expected,
                                found,
                                span: stmt.span,
                            });
                        }
                    }
                }
            }
            StmtKind::Print { value } => {
                // print accepts a single argument of any type
                self.visit_expr(value);
            }
            StmtKind::Expr(expr) => {
                self.visit_expr(expr);
            }
        }
    }

    fn visit_function(&mut self, f: &FnDef) {
        let symbol = Symbol::new(
            f.name.name.clone(),
            Ty::Function,
            false,
            SymbolKind::Function,
            f.name.span,
        );
        if let Err(e) = self.scopes.define(symbol) {
            self.errors.push(e);
        }

        // Parameters and the body share one scope; nested blocks open their own.
        self.scopes.push();
        for param in &f.params {
            let symbol = Symbol::new(
                param.name.name.clone(),
                Ty::from_ann(param.ty.kind),
                false,
                SymbolKind::Parameter,
                param.name.span,
            );
            if let Err(e) = self.scopes.define(symbol) {
                self.errors.push(e);
            }
        }

        let enclosing = self.current_return.replace(
            f.return_type
                .map(|ann| Ty::from_ann(ann.kind))
                .unwrap_or(Ty::Void),
        );
        for stmt in &f.body.stmts {
            self.visit_stmt(stmt);
        }
        self.current_return = enclosing;
        self.scopes.pop();
    }

    fn visit_let(
        &mut self,
        name: &Ident,
        mutable: bool,
        ty: Option<&crate::ast::TypeAnn>,
        init: Option<&Expr>,
    ) {
        let declared = ty.map(|ann| Ty::from_ann(ann.kind));
        let inferred = init.map(|expr| (self.visit_expr(expr), expr.span));

        let var_ty = match (declared, inferred) {
            (Some(declared), Some((found, init_span))) => {
                if found != declared && found != Ty::Unknown {
                    self.errors.push(SemaError::TypeMismatch {
                        expected: declared.clone(),
                        found,
                        span: init_span,
                    });
                }
                declared
            }
            (Some(declared), None) => declared,
            // Borrow types never become variable types.
            (None, Some((found, _))) => found.strip_refs(),
            (None, None) => {
                self.errors.push(SemaError::CannotInfer {
                    name: name.name.clone(),
                    span: name.span,
                });
                Ty::Unknown
            }
        };

        let symbol = Symbol::new(name.name.clone(), var_ty, mutable, SymbolKind::Variable, name.span);
        if let Err(e) = self.scopes.define(symbol) {
            self.errors.push(e);
        } else if self.check_ownership {
            self.trace.push(ownership::trace_let(&name.name));
        }
    }

    fn visit_block(&mut self, block: &Block) {
        self.scopes.push();
        for stmt in &block.stmts {
            self.visit_stmt(stmt);
        }
        self.scopes.pop();
    }

    // ============ Expressions ============

    fn visit_expr(&mut self, expr: &Expr) -> Ty {
        match &expr.kind {
            ExprKind::Literal(lit) => match lit {
                Literal::Int(_) => Ty::I32,
                Literal::Float(_) => Ty::F64,
                Literal::Str(_) => Ty::Str,
                Literal::Bool(_) => Ty::Bool,
            },
            ExprKind::Ident(ident) => match self.scopes.lookup_mut(&ident.name) {
                Some(symbol) => {
                    symbol.used = true;
                    symbol.ty.clone()
                }
                None => {
                    self.errors.push(SemaError::UndefinedVariable {
                        name: ident.name.clone(),
                        span: ident.span,
                    });
                    Ty::Unknown
                }
            },
            ExprKind::Binary { op, left, right } => {
                let lt = self.visit_expr(left);
                let rt = self.visit_expr(right);

                if op.is_logical() {
                    if lt != Ty::Bool && lt != Ty::Unknown {
                        self.errors.push(SemaError::LogicalOperandNotBool {
                            op: *op,
                            found: lt,
                            span: left.span,
                        });
                    }
                    if rt != Ty::Bool && rt != Ty::Unknown {
                        self.errors.push(SemaError::LogicalOperandNotBool {
                            op: *op,
                            found: rt,
                            span: right.span,
                        });
                    }
                    return Ty::Bool;
                }

                if lt == Ty::Unknown || rt == Ty::Unknown {
                    return if op.is_comparison() { Ty::Bool } else { Ty::Unknown };
                }
                if lt != rt {
                    self.errors.push(SemaError::TypeMismatch {
                        expected: lt.clone(),
                        found: rt,
                        span: right.span,
                    });
                }
                if op.is_comparison() {
                    return Ty::Bool;
                }
                // modulo is defined for integers only
                if *op == BinaryOp::Rem && lt == Ty::F64 {
                    self.errors.push(SemaError::RemOperandNotInteger {
                        found: lt,
                        span: expr.span,
                    });
                    return Ty::Unknown;
                }
                lt
            }
            ExprKind::Unary { op, operand } => self.visit_unary(expr.span, *op, operand),
            ExprKind::Assign { target, value } => self.visit_assign(target, value),
        }
    }

    fn visit_unary(&mut self, span: Span, op: UnaryOp, operand: &Expr) -> Ty {
        let operand_ty = self.visit_expr(operand);

        match op {
            UnaryOp::Neg => {
                if operand_ty == Ty::Unknown {
                    return Ty::Unknown;
                }
                if !operand_ty.is_numeric() {
                    self.errors.push(SemaError::UnaryOperandNotNumeric {
                        op,
                        found: operand_ty,
                        span: operand.span,
                    });
                    return Ty::Unknown;
                }
                operand_ty
            }
            UnaryOp::Not => {
                if operand_ty != Ty::Bool && operand_ty != Ty::Unknown {
                    self.errors.push(SemaError::NotOperandNotBool {
                        found: operand_ty,
                        span: operand.span,
                    });
                }
                Ty::Bool
            }
            UnaryOp::Ref => {
                if let ExprKind::Ident(ident) = &operand.kind {
                    self.borrow_shared(ident, span);
                }
                Ty::Ref(Box::new(operand_ty))
            }
            UnaryOp::RefMut => {
                if let ExprKind::Ident(ident) = &operand.kind {
                    self.borrow_mut(ident, span);
                }
                Ty::RefMut(Box::new(operand_ty))
            }
        }
    }

    fn borrow_shared(&mut self, ident: &Ident, span: Span) {
        if !self.check_ownership {
            return;
        }
        if let Some(symbol) = self.scopes.lookup_mut(&ident.name) {
            match ownership::shared_borrow(symbol, span) {
                Ok(()) => self.trace.push(ownership::trace_shared_borrow(&ident.name)),
                Err(e) => self.errors.push(e),
            }
        }
    }

    fn borrow_mut(&mut self, ident: &Ident, span: Span) {
        // Mutability is enforced even when ownership checking is off.
        let mutable = match self.scopes.lookup_mut(&ident.name) {
            Some(symbol) => symbol.mutable,
            None => return,
        };
        if !mutable {
            self.errors.push(SemaError::MutBorrowOfImmutable {
                name: ident.name.clone(),
                span,
            });
            return;
        }
        if !self.check_ownership {
            return;
        }
        if let Some(symbol) = self.scopes.lookup_mut(&ident.name) {
            match ownership::mut_borrow(symbol, span) {
                Ok(()) => self.trace.push(ownership::trace_mut_borrow(&ident.name)),
                Err(e) => self.errors.push(e),
            }
        }
    }

    fn visit_assign(&mut self, target: &Expr, value: &Expr) -> Ty {
        let value_ty = self.visit_expr(value);

        let ident = match &target.kind {
            ExprKind::Ident(ident) => ident,
            _ => {
                self.errors.push(SemaError::InvalidAssignTarget { span: target.span });
                return Ty::Unknown;
            }
        };

        let (target_ty, mutable) = match self.scopes.lookup_mut(&ident.name) {
            Some(symbol) => (symbol.ty.clone(), symbol.mutable),
            None => {
                self.errors.push(SemaError::UndefinedVariable {
                    name: ident.name.clone(),
                    span: ident.span,
                });
                return Ty::Unknown;
            }
        };

        if !mutable {
            self.errors.push(SemaError::AssignToImmutable {
                name: ident.name.clone(),
                span: ident.span,
            });
        } else if self.check_ownership {
            self.trace.push(ownership::trace_assign(&ident.name));
        }

        if value_ty != target_ty && value_ty != Ty::Unknown && target_ty != Ty::Unknown {
            self.errors.push(SemaError::TypeMismatch {
                expected: target_ty.clone(),
                found: value_ty,
                span: value.span,
            });
        }

        // the assignment's result type is the left type
        target_ty
    }
}
