//! IR entities and their textual form
//!
//! The `Display` impls here are the backend's output format: the exact bytes
//! are part of the contract and are pinned by snapshot tests.

use crate::ast::PrimType;
use std::fmt;

/// IR-level types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrType {
    I32,
    F64,
    Bool,
    Str,
    Void,
}

impl IrType {
    /// The IR type for a source type annotation
    pub fn from_prim(prim: PrimType) -> Self {
        match prim {
            PrimType::I32 => IrType::I32,
            PrimType::F64 => IrType::F64,
            PrimType::Bool => IrType::Bool,
            PrimType::Str => IrType::Str,
        }
    }

    /// The default value used for uninitialized slots and defensive returns
    pub fn default_value(&self) -> &'static str {
        match self {
            IrType::I32 | IrType::Bool => "0",
            IrType::F64 => "0.0",
            IrType::Str => "null",
            IrType::Void => "void",
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, IrType::F64)
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IrType::I32 => "i32",
            IrType::F64 => "double",
            IrType::Bool => "i1",
            IrType::Str => "i8*",
            IrType::Void => "void",
        };
        write!(f, "{}", s)
    }
}

/// A single IR instruction
#[derive(Debug, Clone)]
pub struct Instruction {
    /// Result temporary (`%tN`), if the instruction produces a value
    pub result: Option<String>,
    /// Opcode: `add`, `icmp slt`, `load`, `store`, `call`, `br`, `br_cond`, `ret`, ...
    pub opcode: String,
    /// Operand strings: temporaries, parameter registers or literals
    pub operands: Vec<String>,
    /// Type tag used by the textual form
    pub ty: Option<IrType>,
    /// Trailing comment (`; ...`)
    pub comment: Option<String>,
}

impl Instruction {
    pub fn new(
        result: Option<String>,
        opcode: impl Into<String>,
        operands: Vec<String>,
        ty: Option<IrType>,
    ) -> Self {
        Self {
            result,
            opcode: opcode.into(),
            operands,
            ty,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Whether this instruction ends a basic block
    pub fn is_terminator(&self) -> bool {
        matches!(self.opcode.as_str(), "br" | "br_cond" | "ret")
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(result) = &self.result {
            write!(f, "{} = ", result)?;
        }

        let ty = self.ty.unwrap_or(IrType::Void);
        match self.opcode.as_str() {
            "alloca" => write!(f, "alloca {}", ty)?,
            "load" => write!(f, "load {}, {}* {}", ty, ty, self.operands[0])?,
            "store" => write!(
                f,
                "store {} {}, {}* {}",
                ty, self.operands[0], ty, self.operands[1]
            )?,
            "call" => write!(
                f,
                "call void @{}({} {})",
                self.operands[0], ty, self.operands[1]
            )?,
            "br" => write!(f, "br label %{}", self.operands[0])?,
            "br_cond" => write!(
                f,
                "br i1 {}, label %{}, label %{}",
                self.operands[0], self.operands[1], self.operands[2]
            )?,
            "ret" => {
                if ty == IrType::Void {
                    write!(f, "ret void")?;
                } else {
                    write!(f, "ret {} {}", ty, self.operands[0])?;
                }
            }
            opcode => {
                write!(f, "{} {} {}", opcode, ty, self.operands.join(", "))?;
            }
        }

        if let Some(comment) = &self.comment {
            write!(f, " ; {}", comment)?;
        }
        Ok(())
    }
}

/// A straight-line instruction sequence with one label and one terminator
#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub label: String,
    pub instructions: Vec<Instruction>,
    /// Set after the first terminator; later appends are dropped
    pub terminated: bool,
}

impl BasicBlock {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            instructions: Vec::new(),
            terminated: false,
        }
    }

    /// Append an instruction unless the block already ended
    pub fn push(&mut self, instr: Instruction) {
        if self.terminated {
            return;
        }
        if instr.is_terminator() {
            self.terminated = true;
        }
        self.instructions.push(instr);
    }
}

/// A function definition in the IR
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub ret: IrType,
    /// Parameter registers (`%name`) with their types
    pub params: Vec<(String, IrType)>,
    pub blocks: Vec<BasicBlock>,
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|(reg, ty)| format!("{} {}", ty, reg))
            .collect();
        writeln!(f, "define {} @{}({}) {{", self.ret, self.name, params.join(", "))?;
        for block in &self.blocks {
            writeln!(f, "{}:", block.label)?;
            for instr in &block.instructions {
                writeln!(f, "  {}", instr)?;
            }
        }
        writeln!(f, "}}")
    }
}

/// A whole compilation unit: interned string literals plus functions in
/// insertion order
#[derive(Debug, Clone, Default)]
pub struct Module {
    /// Interned string literals; the index is the `@.str.N` id
    pub strings: Vec<String>,
    pub functions: Vec<Function>,
}

/// Escape a string literal for an LLVM `c"..."` constant
fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for b in value.bytes() {
        match b {
            b'\n' => out.push_str("\\0A"),
            b'\t' => out.push_str("\\09"),
            b'\r' => out.push_str("\\0D"),
            b'"' => out.push_str("\\22"),
            b'\\' => out.push_str("\\5C"),
            0x20..=0x7e => out.push(b as char),
            other => out.push_str(&format!("\\{:02X}", other)),
        }
    }
    out
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; MiniRust Compiler - Generated LLVM IR")?;
        writeln!(f)?;

        for (id, value) in self.strings.iter().enumerate() {
            writeln!(
                f,
                "@.str.{} = private unnamed_addr constant [{} x i8] c\"{}\\00\"",
                id,
                value.len() + 1,
                escape_literal(value)
            )?;
        }
        if !self.strings.is_empty() {
            writeln!(f)?;
        }

        writeln!(f, "declare void @print(i32)")?;
        writeln!(f, "declare void @print(double)")?;
        writeln!(f, "declare void @print(i8*)")?;

        for function in &self.functions {
            writeln!(f)?;
            write!(f, "{}", function)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_shapes() {
        let add = Instruction::new(
            Some("%t1".into()),
            "add",
            vec!["2".into(), "%t0".into()],
            Some(IrType::I32),
        );
        assert_eq!(add.to_string(), "%t1 = add i32 2, %t0");

        let alloca = Instruction::new(Some("%t2".into()), "alloca", vec![], Some(IrType::I32))
            .with_comment("x");
        assert_eq!(alloca.to_string(), "%t2 = alloca i32 ; x");

        let store = Instruction::new(
            None,
            "store",
            vec!["%t1".into(), "%t2".into()],
            Some(IrType::I32),
        );
        assert_eq!(store.to_string(), "store i32 %t1, i32* %t2");

        let load = Instruction::new(Some("%t3".into()), "load", vec!["%t2".into()], Some(IrType::I32));
        assert_eq!(load.to_string(), "%t3 = load i32, i32* %t2");

        let call = Instruction::new(
            None,
            "call",
            vec!["print".into(), "%t3".into()],
            Some(IrType::I32),
        )
        .with_comment("print");
        assert_eq!(call.to_string(), "call void @print(i32 %t3) ; print");
    }

    #[test]
    fn test_terminator_shapes() {
        let br = Instruction::new(None, "br", vec!["while.header".into()], None);
        assert_eq!(br.to_string(), "br label %while.header");

        let cond = Instruction::new(
            None,
            "br_cond",
            vec!["%t0".into(), "if.then".into(), "if.else".into()],
            None,
        );
        assert_eq!(cond.to_string(), "br i1 %t0, label %if.then, label %if.else");

        let ret_void = Instruction::new(None, "ret", vec![], Some(IrType::Void));
        assert_eq!(ret_void.to_string(), "ret void");

        let ret_val = Instruction::new(None, "ret", vec!["%t1".into()], Some(IrType::I32));
        assert_eq!(ret_val.to_string(), "ret i32 %t1");
    }

    #[test]
    fn test_block_drops_after_terminator() {
        let mut block = BasicBlock::new("entry");
        block.push(Instruction::new(None, "ret", vec![], Some(IrType::Void)));
        block.push(Instruction::new(
            Some("%t0".into()),
            "add",
            vec!["1".into(), "2".into()],
            Some(IrType::I32),
        ));
        assert!(block.terminated);
        assert_eq!(block.instructions.len(), 1);
    }

    #[test]
    fn test_escape_literal() {
        assert_eq!(escape_literal("hi"), "hi");
        assert_eq!(escape_literal("a\nb\tc"), "a\\0Ab\\09c");
        assert_eq!(escape_literal("q\"q"), "q\\22q");
        assert_eq!(escape_literal("s\\s"), "s\\5Cs");
    }

    #[test]
    fn test_module_preamble() {
        let module = Module::default();
        let text = module.to_string();
        assert!(text.starts_with("; MiniRust Compiler - Generated LLVM IR\n\n"));
        assert!(text.contains("declare void @print(i32)\n"));
        assert!(text.contains("declare void @print(double)\n"));
        assert!(text.contains("declare void @print(i8*)\n"));
    }

    #[test]
    fn test_module_string_constants() {
        let module = Module {
            strings: vec!["hello".into(), "a\nb".into()],
            functions: vec![],
        };
        let text = module.to_string();
        assert!(text.contains("@.str.0 = private unnamed_addr constant [6 x i8] c\"hello\\00\""));
        assert!(text.contains("@.str.1 = private unnamed_addr constant [4 x i8] c\"a\\0Ab\\00\""));
    }
}
