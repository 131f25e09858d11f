use crate::runtime::console::InputError;

/// A fault raised by the CPU. Execution stops at the faulting instruction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VmFault {
    #[error("cpu fault at {pc:#06x}: unknown opcode {opcode:#04x}")]
    UnknownOpcode { pc: u16, opcode: u8 },

    #[error("cpu fault at {pc:#06x}: invalid register R{reg}")]
    InvalidRegister { pc: u16, reg: u8 },

    #[error("cpu fault: program counter ran past 0xffff")]
    PcOverflow,

    #[error("cpu fault at {pc:#06x}: array index out of bounds")]
    BoundsTrap { pc: u16 },

    #[error("cpu fault: step limit exceeded ({0})")]
    StepLimit(usize),

    #[error("cpu fault: {0}")]
    Input(#[from] InputError),

    #[error("cpu fault: image of {len} bytes at {origin:#06x} does not fit in memory")]
    ImageTooLarge { origin: u16, len: usize },
}

/// Errors raised by the IR interpreter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("runtime error: undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("runtime error: array '{0}' used before its declaration")]
    UndeclaredArray(String),

    #[error("runtime error: array '{0}' declared more than once")]
    DuplicateArray(String),

    #[error("runtime error: index {index} out of bounds for array '{array}' of length {len}")]
    IndexOutOfBounds { array: String, index: u8, len: u16 },

    #[error("runtime error: undefined label '{0}'")]
    UndefinedLabel(String),

    #[error("runtime error: label '{0}' defined more than once")]
    DuplicateLabel(String),

    #[error("runtime error: '{0}' needs a whole program and cannot run as a single statement")]
    ControlFlowUnsupported(&'static str),

    #[error("runtime error: step limit exceeded ({0})")]
    StepLimit(usize),

    #[error("runtime error: {0}")]
    Input(#[from] InputError),
}
