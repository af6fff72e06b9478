//! IR function builder
//!
//! Owns the fresh-temporary and fresh-label counters for one function and
//! enforces the termination discipline: once a block has a terminator,
//! further instructions are silently dropped.

use super::types::{BasicBlock, Function, Instruction, IrType};
use std::collections::HashMap;

/// Builder for one IR function
pub struct FunctionBuilder {
    function: Function,
    /// Index of the block instructions are currently appended to
    current: usize,
    next_temp: u32,
    /// How many times each label base has been handed out
    label_counts: HashMap<String, u32>,
}

impl FunctionBuilder {
    /// Start a function; an `entry` block is created and selected.
    pub fn new(name: impl Into<String>, params: Vec<(String, IrType)>, ret: IrType) -> Self {
        let mut builder = Self {
            function: Function {
                name: name.into(),
                ret,
                params,
                blocks: Vec::new(),
            },
            current: 0,
            next_temp: 0,
            label_counts: HashMap::new(),
        };
        let entry = builder.create_block("entry");
        builder.switch_to(&entry);
        builder
    }

    /// A fresh SSA-like temporary: `%t0`, `%t1`, ...
    pub fn fresh_temp(&mut self) -> String {
        let temp = format!("%t{}", self.next_temp);
        self.next_temp += 1;
        temp
    }

    /// Create a new block with a unique label derived from `base` and append
    /// it to the function. The first block for a base keeps the bare name;
    /// later ones get a numeric suffix (`if.then`, `if.then1`, ...).
    pub fn create_block(&mut self, base: &str) -> String {
        let count = self.label_counts.entry(base.to_string()).or_insert(0);
        let label = if *count == 0 {
            base.to_string()
        } else {
            format!("{}{}", base, count)
        };
        *count += 1;
        self.function.blocks.push(BasicBlock::new(label.clone()));
        label
    }

    /// Select the block instructions are emitted into
    pub fn switch_to(&mut self, label: &str) {
        if let Some(index) = self.function.blocks.iter().position(|b| b.label == label) {
            self.current = index;
        }
    }

    /// Whether the current block already ended
    pub fn is_terminated(&self) -> bool {
        self.function
            .blocks
            .get(self.current)
            .map(|b| b.terminated)
            .unwrap_or(true)
    }

    /// Emit an instruction into the current block
    pub fn emit(&mut self, instr: Instruction) {
        if let Some(block) = self.function.blocks.get_mut(self.current) {
            block.push(instr);
        }
    }

    /// Emit an instruction that produces a fresh temporary; returns it
    pub fn emit_with_result(
        &mut self,
        opcode: impl Into<String>,
        operands: Vec<String>,
        ty: IrType,
    ) -> String {
        let result = self.fresh_temp();
        self.emit(Instruction::new(
            Some(result.clone()),
            opcode,
            operands,
            Some(ty),
        ));
        result
    }

    // ============ Terminators ============

    pub fn br(&mut self, target: &str) {
        self.emit(Instruction::new(None, "br", vec![target.to_string()], None));
    }

    pub fn br_cond(&mut self, cond: String, then_label: &str, else_label: &str) {
        self.emit(Instruction::new(
            None,
            "br_cond",
            vec![cond, then_label.to_string(), else_label.to_string()],
            None,
        ));
    }

    pub fn ret(&mut self, ty: IrType, value: Option<String>) {
        let operands = value.into_iter().collect();
        self.emit(Instruction::new(None, "ret", operands, Some(ty)));
    }

    /// Finish the function
    pub fn finish(self) -> Function {
        self.function
    }
}
