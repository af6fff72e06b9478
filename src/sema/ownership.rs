//! Borrow-count state machine
//!
//! Borrows are tracked by two counters on each symbol: active immutable
//! borrows and active mutable borrows. A mutable borrow requires both
//! counters to be zero; an immutable borrow only requires no mutable
//! borrow. Counters are monotonic over the whole analysis — borrows are
//! not released at scope exit in this simplified model.

use super::error::SemaError;
use super::scope::Symbol;
use crate::span::Span;

/// Record an immutable borrow of `symbol`, or explain why it is illegal.
pub(crate) fn shared_borrow(symbol: &mut Symbol, span: Span) -> Result<(), SemaError> {
    if symbol.mut_borrows > 0 {
        return Err(SemaError::BorrowWhileMutBorrowed {
            name: symbol.name.clone(),
            span,
        });
    }
    symbol.borrows += 1;
    Ok(())
}

/// Record a mutable borrow of `symbol`, or explain why it is illegal.
/// The existing-mutable-borrow case is reported before the shared-borrow
/// case, so `&mut x; &mut x` and `&x; &mut x` get distinct messages.
pub(crate) fn mut_borrow(symbol: &mut Symbol, span: Span) -> Result<(), SemaError> {
    if symbol.mut_borrows > 0 {
        return Err(SemaError::MutBorrowWhileMutBorrowed {
            name: symbol.name.clone(),
            span,
        });
    }
    if symbol.borrows > 0 {
        return Err(SemaError::MutBorrowWhileBorrowed {
            name: symbol.name.clone(),
            span,
        });
    }
    symbol.mut_borrows += 1;
    Ok(())
}

// Trace lines shown in the ownership report.

pub(crate) fn trace_let(name: &str) -> String {
    format!("Variable '{}' takes ownership of its value", name)
}

pub(crate) fn trace_assign(name: &str) -> String {
    format!("Assignment transfers ownership to '{}'", name)
}

pub(crate) fn trace_shared_borrow(name: &str) -> String {
    format!("Immutable borrow of '{}'", name)
}

pub(crate) fn trace_mut_borrow(name: &str) -> String {
    format!("Mutable borrow of '{}'", name)
}
