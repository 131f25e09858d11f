use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::bytecode::layout::CODE_START;

/// Placement of a declared array in data memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArraySlot {
    pub base: u16,
    pub len: u16,
}

impl ArraySlot {
    /// Address of the last element, or `None` for an empty slot or one
    /// running past 0xFFFF.
    pub fn end(&self) -> Option<u16> {
        self.base.checked_add(self.len.checked_sub(1)?)
    }

    pub fn contains(&self, addr: u16) -> bool {
        self.end().is_some_and(|end| addr >= self.base && addr <= end)
    }
}

/// A compiled program ready to be loaded into the CPU.
///
/// The symbol tables are not needed for execution; they are kept for the
/// disassembler and for inspecting variables after a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Load address of `code[0]` and the entry point.
    pub origin: u16,

    /// Machine code bytes.
    pub code: Vec<u8>,

    /// Label name -> absolute code address.
    pub labels: BTreeMap<String, u16>,

    /// Variable (and temporary) name -> data address.
    pub symbols: BTreeMap<String, u16>,

    /// Array name -> base address and length.
    pub arrays: BTreeMap<String, ArraySlot>,
}

#[derive(Debug, thiserror::Error)]
#[error("image error: {0}")]
pub struct ImageError(#[from] postcard::Error);

impl Image {
    /// Wraps raw machine code without symbol information.
    pub fn raw(origin: u16, code: Vec<u8>) -> Self {
        Self {
            origin,
            code,
            labels: BTreeMap::new(),
            symbols: BTreeMap::new(),
            arrays: BTreeMap::new(),
        }
    }

    /// Address one past the last code byte.
    pub fn end(&self) -> usize {
        self.origin as usize + self.code.len()
    }

    /// Reverse lookup used by the disassembler.
    pub fn label_at(&self, addr: u16) -> Option<&str> {
        self.labels
            .iter()
            .find(|(_, a)| **a == addr)
            .map(|(name, _)| name.as_str())
    }

    /// Name of the variable or array element stored at `addr`.
    pub fn symbol_at(&self, addr: u16) -> Option<String> {
        if let Some((name, _)) = self.symbols.iter().find(|(_, a)| **a == addr) {
            return Some(name.clone());
        }
        self.arrays
            .iter()
            .find(|(_, slot)| slot.contains(addr))
            .map(|(name, slot)| format!("{}[{}]", name, addr - slot.base))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ImageError> {
        Ok(postcard::to_allocvec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        Ok(postcard::from_bytes(bytes)?)
    }
}

impl Default for Image {
    fn default() -> Self {
        Self::raw(CODE_START, Vec::new())
    }
}
