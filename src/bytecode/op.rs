// =============================================================================
// OPCODE - Machine instruction set
// =============================================================================

/// One-byte opcodes of the CPU.
///
/// Multi-byte addresses are big-endian (`hi`, `lo`). Register operands are
/// register numbers `0..=7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// `HALT`
    Halt = 0x00,

    /// `LOAD rd, [hi lo]` : rd := mem[addr]
    Load = 0x01,

    /// `LOAD_IMM rd, imm` : rd := imm
    LoadImm = 0x02,

    /// `STORE [hi lo], rs` : mem[addr] := rs
    Store = 0x03,

    /// `STORE_IMM [hi lo], imm` : mem[addr] := imm
    StoreImm = 0x04,

    /// `ADD rd, rs` : rd := rd + rs (wrapping)
    Add = 0x05,

    /// `SUB rd, rs` : rd := rd - rs (wrapping), R2 := borrow
    Sub = 0x06,

    /// `JNZ r, [hi lo]` : jump if r != 0
    Jnz = 0x07,

    /// `JZ r, [hi lo]` : jump if r == 0
    Jz = 0x08,

    /// `IN rd` : rd := input byte
    In = 0x09,

    /// `LOAD_INDEXED` : R4 := mem[(R0 << 8 | R1) + R2]
    LoadIndexed = 0x0A,

    /// `STORE_INDEXED` : mem[(R0 << 8 | R1) + R2] := R4
    StoreIndexed = 0x0B,

    /// `TRAP` : array index out of bounds
    Trap = 0x0C,
}

impl Opcode {
    pub const ALL: [Opcode; 13] = [
        Opcode::Halt,
        Opcode::Load,
        Opcode::LoadImm,
        Opcode::Store,
        Opcode::StoreImm,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Jnz,
        Opcode::Jz,
        Opcode::In,
        Opcode::LoadIndexed,
        Opcode::StoreIndexed,
        Opcode::Trap,
    ];

    pub fn byte(self) -> u8 {
        self as u8
    }

    /// Encoded size in bytes, opcode included.
    pub fn width(self) -> usize {
        match self {
            Opcode::Halt | Opcode::LoadIndexed | Opcode::StoreIndexed | Opcode::Trap => 1,
            Opcode::In => 2,
            Opcode::LoadImm | Opcode::Add | Opcode::Sub => 3,
            Opcode::Load | Opcode::Store | Opcode::StoreImm | Opcode::Jnz | Opcode::Jz => 4,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Halt => "HALT",
            Opcode::Load => "LOAD",
            Opcode::LoadImm => "LOAD_IMM",
            Opcode::Store => "STORE",
            Opcode::StoreImm => "STORE_IMM",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Jnz => "JNZ",
            Opcode::Jz => "JZ",
            Opcode::In => "IN",
            Opcode::LoadIndexed => "LOAD_INDEXED",
            Opcode::StoreIndexed => "STORE_INDEXED",
            Opcode::Trap => "TRAP",
        }
    }

    pub fn is_jump(self) -> bool {
        matches!(self, Opcode::Jnz | Opcode::Jz)
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    /// Decodes an opcode byte, handing back the byte itself when unknown.
    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Opcode::ALL
            .iter()
            .copied()
            .find(|op| op.byte() == byte)
            .ok_or(byte)
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

// =============================================================================
// Registers
// =============================================================================

pub const NUM_REGISTERS: usize = 8;

/// Borrow flag written by `SUB`.
pub const REG_BORROW: u8 = 2;

/// High byte of the indexed-addressing base.
pub const REG_BASE_HI: u8 = 0;

/// Low byte of the indexed-addressing base.
pub const REG_BASE_LO: u8 = 1;

/// Index register of indexed addressing.
pub const REG_INDEX: u8 = 2;

/// Data register of indexed addressing.
pub const REG_DATA: u8 = 4;
