use super::operand::Operand;
use serde::{Deserialize, Serialize};

/// Prefix of parser-generated temporaries (`__temp__0`, `__temp__1`, ...).
pub const TEMP_PREFIX: &str = "__temp__";

/// Opcode tag of an IR instruction, without its operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IrOp {
    LoadConst,
    LoadVar,
    Add,
    Sub,
    Store,
    StoreConst,
    IfLeq,
    Goto,
    Label,
    Out,
    In,
    Halt,
    ArrayDecl,
    LoadIndexed,
    StoreIndexed,
}

impl IrOp {
    pub fn name(self) -> &'static str {
        match self {
            IrOp::LoadConst => "LOAD_CONST",
            IrOp::LoadVar => "LOAD_VAR",
            IrOp::Add => "ADD",
            IrOp::Sub => "SUB",
            IrOp::Store => "STORE",
            IrOp::StoreConst => "STORE_CONST",
            IrOp::IfLeq => "IFLEQ",
            IrOp::Goto => "GOTO",
            IrOp::Label => "LABEL",
            IrOp::Out => "OUT",
            IrOp::In => "IN",
            IrOp::Halt => "HALT",
            IrOp::ArrayDecl => "ARRAY_DECL",
            IrOp::LoadIndexed => "LOAD_INDEXED",
            IrOp::StoreIndexed => "STORE_INDEXED",
        }
    }

    /// Labels, jumps and conditional jumps.
    pub fn is_control_flow(self) -> bool {
        matches!(self, IrOp::Label | IrOp::Goto | IrOp::IfLeq)
    }
}

/// One IR quadruple. Program order is execution order; control falls through
/// to the next instruction unless a jump is taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instr {
    // ───────────────────────────── Data movement ─────────────────────────
    /// `dst := value`
    LoadConst { value: u8, dst: String },

    /// `dst := src`
    LoadVar { src: String, dst: String },

    /// `dst := src` (the final store of an assignment)
    Store { src: Operand, dst: String },

    /// `dst := value`
    StoreConst { value: u8, dst: String },

    // ───────────────────────────── Arithmetic ────────────────────────────
    /// `dst := lhs + rhs` (wrapping)
    Add {
        lhs: Operand,
        rhs: Operand,
        dst: String,
    },

    /// `dst := lhs - rhs` (wrapping, sets the borrow flag)
    Sub {
        lhs: Operand,
        rhs: Operand,
        dst: String,
    },

    // ──────────────────────────── Control flow ───────────────────────────
    /// `if lhs <= rhs goto target`
    IfLeq {
        lhs: Operand,
        rhs: Operand,
        target: String,
    },

    /// `goto target`
    Goto { target: String },

    /// `name:`
    Label { name: String },

    Halt,

    // ──────────────────────────────── I/O ────────────────────────────────
    /// Emit a byte on the output register.
    Out { src: Operand },

    /// Read a byte from the input register into `dst`.
    In { dst: String },

    // ─────────────────────────────── Arrays ──────────────────────────────
    /// `let name[len];`
    ArrayDecl { name: String, len: u16 },

    /// `dst := array[index]`
    LoadIndexed {
        array: String,
        index: Operand,
        dst: String,
    },

    /// `array[index] := src`
    StoreIndexed {
        array: String,
        index: Operand,
        src: Operand,
    },
}

impl Instr {
    pub fn op(&self) -> IrOp {
        match self {
            Instr::LoadConst { .. } => IrOp::LoadConst,
            Instr::LoadVar { .. } => IrOp::LoadVar,
            Instr::Store { .. } => IrOp::Store,
            Instr::StoreConst { .. } => IrOp::StoreConst,
            Instr::Add { .. } => IrOp::Add,
            Instr::Sub { .. } => IrOp::Sub,
            Instr::IfLeq { .. } => IrOp::IfLeq,
            Instr::Goto { .. } => IrOp::Goto,
            Instr::Label { .. } => IrOp::Label,
            Instr::Halt => IrOp::Halt,
            Instr::Out { .. } => IrOp::Out,
            Instr::In { .. } => IrOp::In,
            Instr::ArrayDecl { .. } => IrOp::ArrayDecl,
            Instr::LoadIndexed { .. } => IrOp::LoadIndexed,
            Instr::StoreIndexed { .. } => IrOp::StoreIndexed,
        }
    }
}

impl std::fmt::Display for Instr {
    /// One-line listing form, e.g. `ADD a __temp__1 -> __temp__2`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.op().name();
        match self {
            Instr::LoadConst { value, dst } | Instr::StoreConst { value, dst } => {
                write!(f, "{} {} -> {}", name, value, dst)
            }
            Instr::LoadVar { src, dst } => write!(f, "{} {} -> {}", name, src, dst),
            Instr::Store { src, dst } => write!(f, "{} {} -> {}", name, src, dst),
            Instr::Add { lhs, rhs, dst } | Instr::Sub { lhs, rhs, dst } => {
                write!(f, "{} {} {} -> {}", name, lhs, rhs, dst)
            }
            Instr::IfLeq { lhs, rhs, target } => write!(f, "{} {} {} {}", name, lhs, rhs, target),
            Instr::Goto { target } => write!(f, "{} {}", name, target),
            Instr::Label { name: label } => write!(f, "{} {}", name, label),
            Instr::Halt => write!(f, "{}", name),
            Instr::Out { src } => write!(f, "{} {}", name, src),
            Instr::In { dst } => write!(f, "{} {}", name, dst),
            Instr::ArrayDecl { name: array, len } => write!(f, "{} {} {}", name, array, len),
            Instr::LoadIndexed { array, index, dst } => {
                write!(f, "{} {}[{}] -> {}", name, array, index, dst)
            }
            Instr::StoreIndexed { array, index, src } => {
                write!(f, "{} {} -> {}[{}]", name, src, array, index)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_tags() {
        assert_eq!(Instr::Halt.op(), IrOp::Halt);
        assert_eq!(
            Instr::Goto {
                target: "l".to_string()
            }
            .op(),
            IrOp::Goto
        );
        assert!(IrOp::IfLeq.is_control_flow());
        assert!(IrOp::Label.is_control_flow());
        assert!(!IrOp::Out.is_control_flow());
    }

    #[test]
    fn test_display_arithmetic() {
        let instr = Instr::Sub {
            lhs: Operand::var("a"),
            rhs: Operand::Literal(1),
            dst: "__temp__2".to_string(),
        };
        assert_eq!(instr.to_string(), "SUB a 1 -> __temp__2");
    }

    #[test]
    fn test_display_indexed() {
        let load = Instr::LoadIndexed {
            array: "arr".to_string(),
            index: Operand::Literal(0),
            dst: "__temp__0".to_string(),
        };
        let store = Instr::StoreIndexed {
            array: "arr".to_string(),
            index: Operand::var("i"),
            src: Operand::var("__temp__1"),
        };
        assert_eq!(load.to_string(), "LOAD_INDEXED arr[0] -> __temp__0");
        assert_eq!(store.to_string(), "STORE_INDEXED __temp__1 -> arr[i]");
    }
}
