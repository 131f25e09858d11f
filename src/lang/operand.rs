use serde::{Deserialize, Serialize};

/// Value-producing operand of an IR instruction.
///
/// The machine is 8 bits wide, so literals are already range-checked bytes
/// by the time they reach the IR.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operand {
    /// Immediate byte: `5`.
    Literal(u8),

    /// Named storage: a user variable or a `__temp__N` temporary.
    Variable(String),
}

impl Operand {
    pub fn var(name: impl Into<String>) -> Self {
        Operand::Variable(name.into())
    }
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Literal(v) => write!(f, "{}", v),
            Operand::Variable(name) => write!(f, "{}", name),
        }
    }
}
