//! Teaching optimization passes
//!
//! Both passes are deliberately conservative:
//!
//! - Constant folding never rewrites an instruction. It annotates foldable
//!   `add`/`sub`/`mul` chains with the value they compute, propagating known
//!   results through temporaries within a block so downstream consumers
//!   (including stores) carry the note too.
//! - Dead-code elimination drops only instructions whose result temporary is
//!   never used as an operand; instructions without a result always survive.

use super::types::{Function, Instruction, IrType, Module};
use std::collections::{HashMap, HashSet};

/// Annotate integer `add`/`sub`/`mul` instructions whose operands are known
/// constants with the folded value.
pub fn fold_constants(module: &mut Module) {
    for function in &mut module.functions {
        for block in &mut function.blocks {
            let mut known: HashMap<String, i64> = HashMap::new();

            for instr in &mut block.instructions {
                match instr.opcode.as_str() {
                    "add" | "sub" | "mul" if instr.ty == Some(IrType::I32) => {
                        let lhs = resolve(&known, instr.operands.first());
                        let rhs = resolve(&known, instr.operands.get(1));
                        if let (Some(lhs), Some(rhs)) = (lhs, rhs) {
                            let value = match instr.opcode.as_str() {
                                "add" => lhs.wrapping_add(rhs),
                                "sub" => lhs.wrapping_sub(rhs),
                                _ => lhs.wrapping_mul(rhs),
                            };
                            annotate(instr, value);
                            if let Some(result) = &instr.result {
                                known.insert(result.clone(), value);
                            }
                        }
                    }
                    "store" => {
                        // only a temp whose value was folded earlier counts
                        let folded = instr
                            .operands
                            .first()
                            .and_then(|operand| known.get(operand))
                            .copied();
                        if let Some(value) = folded {
                            annotate(instr, value);
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}

/// An operand's constant value: an integer literal, or a temporary whose
/// value was established earlier in the block.
fn resolve(known: &HashMap<String, i64>, operand: Option<&String>) -> Option<i64> {
    let operand = operand?;
    if let Ok(value) = operand.parse::<i64>() {
        return Some(value);
    }
    known.get(operand).copied()
}

fn annotate(instr: &mut Instruction, value: i64) {
    if instr.comment.is_none() {
        instr.comment = Some(format!("constant folded: {}", value));
    }
}

/// Remove instructions that define a temporary no surviving instruction
/// reads. Instructions without a result are side effects and are kept.
pub fn eliminate_dead_code(module: &mut Module) {
    for function in &mut module.functions {
        let used = used_temps(function);
        for block in &mut function.blocks {
            block
                .instructions
                .retain(|instr| match &instr.result {
                    Some(result) => used.contains(result),
                    None => true,
                });
        }
    }
}

/// The set of temporaries referenced as operands anywhere in the function
fn used_temps(function: &Function) -> HashSet<String> {
    let mut used = HashSet::new();
    for block in &function.blocks {
        for instr in &block.instructions {
            for operand in &instr.operands {
                used.insert(operand.clone());
            }
        }
    }
    used
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::types::BasicBlock;

    fn instr(result: Option<&str>, opcode: &str, operands: &[&str], ty: IrType) -> Instruction {
        Instruction::new(
            result.map(str::to_string),
            opcode,
            operands.iter().map(|s| s.to_string()).collect(),
            Some(ty),
        )
    }

    fn one_block_function(instructions: Vec<Instruction>) -> Module {
        let mut block = BasicBlock::new("entry");
        for i in instructions {
            block.push(i);
        }
        Module {
            strings: vec![],
            functions: vec![Function {
                name: "f".into(),
                ret: IrType::Void,
                params: vec![],
                blocks: vec![block],
            }],
        }
    }

    #[test]
    fn test_fold_literal_operands() {
        let mut module = one_block_function(vec![instr(
            Some("%t0"),
            "mul",
            &["3", "4"],
            IrType::I32,
        )]);
        fold_constants(&mut module);
        let folded = &module.functions[0].blocks[0].instructions[0];
        assert_eq!(folded.comment.as_deref(), Some("constant folded: 12"));
    }

    #[test]
    fn test_fold_propagates_through_temps() {
        let mut module = one_block_function(vec![
            instr(Some("%t0"), "mul", &["3", "4"], IrType::I32),
            instr(Some("%t1"), "add", &["2", "%t0"], IrType::I32),
            instr(None, "store", &["%t1", "%t2"], IrType::I32),
        ]);
        fold_constants(&mut module);
        let instrs = &module.functions[0].blocks[0].instructions;
        assert_eq!(instrs[1].comment.as_deref(), Some("constant folded: 14"));
        assert_eq!(instrs[2].comment.as_deref(), Some("constant folded: 14"));
    }

    #[test]
    fn test_fold_never_rewrites() {
        let mut module = one_block_function(vec![instr(
            Some("%t0"),
            "add",
            &["1", "2"],
            IrType::I32,
        )]);
        fold_constants(&mut module);
        let folded = &module.functions[0].blocks[0].instructions[0];
        assert_eq!(folded.opcode, "add");
        assert_eq!(folded.operands, vec!["1", "2"]);
    }

    #[test]
    fn test_fold_skips_unknown_operands() {
        let mut module = one_block_function(vec![instr(
            Some("%t0"),
            "add",
            &["%a", "2"],
            IrType::I32,
        )]);
        fold_constants(&mut module);
        assert!(module.functions[0].blocks[0].instructions[0].comment.is_none());
    }

    #[test]
    fn test_dce_removes_unused_result() {
        let mut module = one_block_function(vec![
            instr(Some("%t0"), "add", &["1", "2"], IrType::I32),
            instr(None, "ret", &[], IrType::Void),
        ]);
        eliminate_dead_code(&mut module);
        let instrs = &module.functions[0].blocks[0].instructions;
        assert_eq!(instrs.len(), 1);
        assert_eq!(instrs[0].opcode, "ret");
    }

    #[test]
    fn test_dce_keeps_used_chain_and_side_effects() {
        let mut module = one_block_function(vec![
            instr(Some("%t0"), "alloca", &[], IrType::I32),
            instr(None, "store", &["1", "%t0"], IrType::I32),
            instr(Some("%t1"), "load", &["%t0"], IrType::I32),
            instr(None, "call", &["print", "%t1"], IrType::I32),
        ]);
        eliminate_dead_code(&mut module);
        assert_eq!(module.functions[0].blocks[0].instructions.len(), 4);
    }

    #[test]
    fn test_dce_removed_temps_absent_from_survivors() {
        let mut module = one_block_function(vec![
            instr(Some("%t0"), "alloca", &[], IrType::I32),
            instr(None, "store", &["1", "%t0"], IrType::I32),
            instr(Some("%t1"), "load", &["%t0"], IrType::I32),
            instr(None, "ret", &[], IrType::Void),
        ]);
        eliminate_dead_code(&mut module);
        let instrs = &module.functions[0].blocks[0].instructions;
        // the unused load is gone
        assert!(instrs.iter().all(|i| i.result.as_deref() != Some("%t1")));
        // and nothing references it
        assert!(instrs.iter().all(|i| !i.operands.contains(&"%t1".to_string())));
    }
}
