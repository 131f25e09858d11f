// =============================================================================
// Memory map
// =============================================================================
//
//   0x0000 ..= 0x1FFF   unused (raw images load at 0x0000)
//   0x2000 ..= 0x7FFF   code
//   0x8000 ..= 0xFEFF   data (variables, temporaries, arrays)
//   0xFF00              output register
//   0xFF01              input register

pub const CODE_START: u16 = 0x2000;
pub const CODE_END: u16 = 0x7FFF;
pub const DATA_START: u16 = 0x8000;
pub const DATA_END: u16 = 0xFEFF;
pub const OUTPUT_PORT: u16 = 0xFF00;
pub const INPUT_PORT: u16 = 0xFF01;

/// Number of bytes available to variables and arrays.
pub const DATA_CAPACITY: usize = (DATA_END - DATA_START) as usize + 1;

/// Where the compiler places code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Address of the first code byte and the CPU's initial PC.
    pub origin: u16,
}

impl Default for Layout {
    fn default() -> Self {
        Self { origin: CODE_START }
    }
}

impl Layout {
    /// Largest code size that fits between `origin` and the end of the code region.
    pub fn code_capacity(&self) -> usize {
        (CODE_END as usize + 1).saturating_sub(self.origin as usize)
    }
}
