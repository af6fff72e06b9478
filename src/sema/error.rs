//! Semantic error definitions
//!
//! Every message the analyzer can produce, with its span and the diagnostic
//! kind it maps to on the shared bus. The `Display` output of each variant
//! is the exact user-facing message.

use super::ty::Ty;
use crate::ast::{BinaryOp, UnaryOp};
use crate::diagnostics::DiagnosticKind;
use crate::span::Span;
use thiserror::Error;

/// A semantic, type or ownership error (or an unused-variable warning)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SemaError {
    // ============ Type errors ============
    #[error("Type mismatch: expected '{expected}', found '{found}'")]
    TypeMismatch { expected: Ty, found: Ty, span: Span },

    #[error("Cannot infer type for variable '{name}'")]
    CannotInfer { name: String, span: Span },

    #[error("If condition must be of type bool, found '{found}'")]
    IfConditionNotBool { found: Ty, span: Span },

    #[error("While condition must be of type bool, found '{found}'")]
    WhileConditionNotBool { found: Ty, span: Span },

    #[error("Logical operator '{op}' requires bool operands, found '{found}'")]
    LogicalOperandNotBool { op: BinaryOp, found: Ty, span: Span },

    #[error("Operator '%' requires integer operands, found '{found}'")]
    RemOperandNotInteger { found: Ty, span: Span },

    #[error("Unary operator '{op}' requires a numeric operand, found '{found}'")]
    UnaryOperandNotNumeric { op: UnaryOp, found: Ty, span: Span },

    #[error("Unary operator '!' requires a bool operand, found '{found}'")]
    NotOperandNotBool { found: Ty, span: Span },

    #[error("Return type mismatch: expected '{expected}', found '{found}'")]
    ReturnTypeMismatch { expected: Ty, found: Ty, span: Span },

    // ============ Name resolution ============
    #[error("Undefined variable: '{name}'")]
    UndefinedVariable { name: String, span: Span },

    #[error("Variable '{name}' is already defined in this scope")]
    DuplicateVariable { name: String, span: Span },

    #[error("Function '{name}' is already defined in this scope")]
    DuplicateFunction { name: String, span: Span },

    #[error("Parameter '{name}' is already defined in this scope")]
    DuplicateParameter { name: String, span: Span },

    #[error("Invalid assignment target")]
    InvalidAssignTarget { span: Span },

    #[error("Return statement outside of a function")]
    ReturnOutsideFunction { span: Span },

    // ============ Ownership ============
    #[error("Cannot assign to immutable variable '{name}'")]
    AssignToImmutable { name: String, span: Span },

    #[error("Cannot create mutable borrow of immutable variable '{name}'")]
    MutBorrowOfImmutable { name: String, span: Span },

    #[error("Cannot create mutable borrow: '{name}' is already mutably borrowed")]
    MutBorrowWhileMutBorrowed { name: String, span: Span },

    #[error("Cannot create mutable borrow: '{name}' is already borrowed")]
    MutBorrowWhileBorrowed { name: String, span: Span },

    #[error("Cannot create immutable borrow: '{name}' is already mutably borrowed")]
    BorrowWhileMutBorrowed { name: String, span: Span },

    // ============ Warnings ============
    #[error("Variable '{name}' is declared but never used")]
    UnusedVariable { name: String, span: Span },
}

impl SemaError {
    /// The span this error is anchored to
    pub fn span(&self) -> Span {
        match self {
            SemaError::TypeMismatch { span, .. }
            | SemaError::CannotInfer { span, .. }
            | SemaError::IfConditionNotBool { span, .. }
            | SemaError::WhileConditionNotBool { span, .. }
            | SemaError::LogicalOperandNotBool { span, .. }
            | SemaError::RemOperandNotInteger { span, .. }
            | SemaError::UnaryOperandNotNumeric { span, .. }
            | SemaError::NotOperandNotBool { span, .. }
            | SemaError::ReturnTypeMismatch { span, .. }
            | SemaError::UndefinedVariable { span, .. }
            | SemaError::DuplicateVariable { span, .. }
            | SemaError::DuplicateFunction { span, .. }
            | SemaError::DuplicateParameter { span, .. }
            | SemaError::InvalidAssignTarget { span }
            | SemaError::ReturnOutsideFunction { span }
            | SemaError::AssignToImmutable { span, .. }
            | SemaError::MutBorrowOfImmutable { span, .. }
            | SemaError::MutBorrowWhileMutBorrowed { span, .. }
            | SemaError::MutBorrowWhileBorrowed { span, .. }
            | SemaError::BorrowWhileMutBorrowed { span, .. }
            | SemaError::UnusedVariable { span, .. } => *span,
        }
    }

    /// The diagnostic kind this error reports as
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            SemaError::TypeMismatch { .. }
            | SemaError::CannotInfer { .. }
            | SemaError::IfConditionNotBool { .. }
            | SemaError::WhileConditionNotBool { .. }
            | SemaError::LogicalOperandNotBool { .. }
            | SemaError::RemOperandNotInteger { .. }
            | SemaError::UnaryOperandNotNumeric { .. }
            | SemaError::NotOperandNotBool { .. }
            | SemaError::ReturnTypeMismatch { .. } => DiagnosticKind::TypeError,

            SemaError::UndefinedVariable { .. }
            | SemaError::DuplicateVariable { .. }
            | SemaError::DuplicateFunction { .. }
            | SemaError::DuplicateParameter { .. }
            | SemaError::InvalidAssignTarget { .. }
            | SemaError::ReturnOutsideFunction { .. } => DiagnosticKind::SemanticError,

            SemaError::AssignToImmutable { .. }
            | SemaError::MutBorrowOfImmutable { .. }
            | SemaError::MutBorrowWhileMutBorrowed { .. }
            | SemaError::MutBorrowWhileBorrowed { .. }
            | SemaError::BorrowWhileMutBorrowed { .. } => DiagnosticKind::OwnershipError,

            SemaError::UnusedVariable { .. } => DiagnosticKind::UnusedVariable,
        }
    }
}
