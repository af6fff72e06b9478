//! MiniRust Intermediate Representation
//!
//! A textual, LLVM-flavored IR. It is designed to be:
//! - Easy to generate from the analyzed AST
//! - Easy to read: one instruction per line, labeled basic blocks
//! - Amenable to the two teaching optimization passes

mod builder;
mod lower;
mod opt;
mod types;

pub use builder::FunctionBuilder;
pub use lower::{generate_ir, IrError, IrGenerator, IrOutput};
pub use opt::{eliminate_dead_code, fold_constants};
pub use types::{BasicBlock, Function, Instruction, IrType, Module};
