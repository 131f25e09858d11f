use std::collections::BTreeMap;

use crate::{
    bytecode::{
        compile_error::CompileError,
        image::{ArraySlot, Image},
        layout::{DATA_CAPACITY, DATA_START, Layout, OUTPUT_PORT},
        op::{Opcode, REG_BASE_HI, REG_BASE_LO, REG_BORROW, REG_DATA, REG_INDEX},
    },
    lang::{Instr, Operand},
};

/// Scratch registers used by the lowering.
const R0: u8 = 0;
const R1: u8 = 1;

/// Holds the constant 1 for unconditional jumps (`JNZ R3`).
const REG_ONE: u8 = 3;

/// Jump destination awaiting resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
enum JumpTarget {
    Label(String),
    /// Shared out-of-bounds handler appended after the program.
    Trap,
}

/// A two-byte address hole in `code`.
#[derive(Debug, Clone)]
struct Patch {
    /// Offset of the high address byte.
    offset: usize,
    target: JumpTarget,
}

/// Single-pass IR to machine code translator.
///
/// Forward jumps are emitted with a zero placeholder and recorded as
/// patches; once the whole IR has been scanned every patch is filled with
/// the label's absolute address. All state lives in the `Codegen` value, so
/// each compilation starts from an empty symbol table and data cursor.
pub struct Codegen {
    layout: Layout,
    code: Vec<u8>,

    labels: BTreeMap<String, u16>,
    vars: BTreeMap<String, u16>,
    arrays: BTreeMap<String, ArraySlot>,

    patches: Vec<Patch>,

    /// Next free data byte, relative to `DATA_START`.
    data_cursor: usize,
}

impl Default for Codegen {
    fn default() -> Self {
        Self::new(Layout::default())
    }
}

/// Compiles with the default layout.
pub fn compile(ir: &[Instr]) -> Result<Image, CompileError> {
    Codegen::default().compile(ir)
}

impl Codegen {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            code: Vec::new(),
            labels: BTreeMap::new(),
            vars: BTreeMap::new(),
            arrays: BTreeMap::new(),
            patches: Vec::new(),
            data_cursor: 0,
        }
    }

    pub fn compile(mut self, ir: &[Instr]) -> Result<Image, CompileError> {
        // Prologue: R3 stays 1 so `JNZ R3` is an unconditional jump.
        self.emit_op(Opcode::LoadImm);
        self.emit(&[REG_ONE, 1]);

        for instr in ir {
            self.compile_instr(instr)?;
        }

        // The trap handler sits behind a HALT so falling off the end of the
        // program still halts cleanly.
        let needs_trap = self.patches.iter().any(|p| p.target == JumpTarget::Trap);
        let mut trap_addr = 0;
        if needs_trap {
            self.emit_op(Opcode::Halt);
            trap_addr = self.here();
            self.emit_op(Opcode::Trap);
        }

        let available = self.layout.code_capacity();
        if self.code.len() > available {
            return Err(CompileError::CodeOverflow {
                needed: self.code.len(),
                available,
            });
        }

        self.resolve_patches(trap_addr)?;

        Ok(Image {
            origin: self.layout.origin,
            code: self.code,
            labels: self.labels,
            symbols: self.vars,
            arrays: self.arrays,
        })
    }

    fn compile_instr(&mut self, instr: &Instr) -> Result<(), CompileError> {
        match instr {
            Instr::LoadConst { value, dst } | Instr::StoreConst { value, dst } => {
                let addr = self.var_addr(dst)?;
                self.emit_store_imm(addr, *value);
            }

            Instr::LoadVar { src, dst } => {
                self.emit_load(R0, &Operand::var(src.as_str()))?;
                let addr = self.var_addr(dst)?;
                self.emit_store(addr, R0);
            }

            Instr::Store { src, dst } => {
                let addr = self.var_addr(dst)?;
                match src {
                    Operand::Literal(value) => self.emit_store_imm(addr, *value),
                    Operand::Variable(_) => {
                        self.emit_load(R0, src)?;
                        self.emit_store(addr, R0);
                    }
                }
            }

            Instr::Add { lhs, rhs, dst } => self.compile_alu(Opcode::Add, lhs, rhs, dst)?,
            Instr::Sub { lhs, rhs, dst } => self.compile_alu(Opcode::Sub, lhs, rhs, dst)?,

            Instr::IfLeq { lhs, rhs, target } => {
                // R1 := rhs - lhs borrows exactly when rhs < lhs, so a clear
                // borrow flag means lhs <= rhs.
                self.emit_load(R0, lhs)?;
                self.emit_load(R1, rhs)?;
                self.emit_op(Opcode::Sub);
                self.emit(&[R1, R0]);
                self.emit_jump(Opcode::Jz, REG_BORROW, JumpTarget::Label(target.clone()));
            }

            Instr::Goto { target } => {
                self.emit_jump(Opcode::Jnz, REG_ONE, JumpTarget::Label(target.clone()));
            }

            Instr::Label { name } => {
                if self.labels.contains_key(name) {
                    return Err(CompileError::DuplicateLabel(name.clone()));
                }
                let addr = self.here();
                log::debug!("label {} = {:#06x}", name, addr);
                self.labels.insert(name.clone(), addr);
            }

            Instr::Halt => self.emit_op(Opcode::Halt),

            Instr::Out { src } => match src {
                Operand::Literal(value) => self.emit_store_imm(OUTPUT_PORT, *value),
                Operand::Variable(_) => {
                    self.emit_load(R0, src)?;
                    self.emit_store(OUTPUT_PORT, R0);
                }
            },

            Instr::In { dst } => {
                self.emit_op(Opcode::In);
                self.emit(&[R0]);
                let addr = self.var_addr(dst)?;
                self.emit_store(addr, R0);
            }

            Instr::ArrayDecl { name, len } => {
                if self.arrays.contains_key(name) {
                    return Err(CompileError::DuplicateArray(name.clone()));
                }
                let base = self.alloc_data(name, *len as usize)?;
                log::debug!("array {}[{}] at {:#06x}", name, len, base);
                self.arrays
                    .insert(name.clone(), ArraySlot { base, len: *len });
            }

            Instr::LoadIndexed { array, index, dst } => {
                let slot = self.array_slot(array)?;
                self.emit_bounds_check(array, slot, index)?;
                self.emit_indexed_address(slot, index)?;
                self.emit_op(Opcode::LoadIndexed);
                let addr = self.var_addr(dst)?;
                self.emit_store(addr, REG_DATA);
            }

            Instr::StoreIndexed { array, index, src } => {
                let slot = self.array_slot(array)?;
                // The value goes to R4 first; the guard and the address
                // setup only touch R0..R2.
                self.emit_load(REG_DATA, src)?;
                self.emit_bounds_check(array, slot, index)?;
                self.emit_indexed_address(slot, index)?;
                self.emit_op(Opcode::StoreIndexed);
            }
        }

        Ok(())
    }

    fn compile_alu(
        &mut self,
        op: Opcode,
        lhs: &Operand,
        rhs: &Operand,
        dst: &str,
    ) -> Result<(), CompileError> {
        self.emit_load(R0, lhs)?;
        self.emit_load(R1, rhs)?;
        self.emit_op(op);
        self.emit(&[R0, R1]);
        let addr = self.var_addr(dst)?;
        self.emit_store(addr, R0);
        Ok(())
    }

    // =========================================================================
    // Arrays
    // =========================================================================

    fn array_slot(&self, name: &str) -> Result<ArraySlot, CompileError> {
        self.arrays
            .get(name)
            .copied()
            .ok_or_else(|| CompileError::UndeclaredArray(name.to_string()))
    }

    /// Rejects literal indices statically and guards variable ones at run time.
    ///
    /// Arrays longer than 256 need no guard: an 8-bit index is always in range.
    fn emit_bounds_check(
        &mut self,
        array: &str,
        slot: ArraySlot,
        index: &Operand,
    ) -> Result<(), CompileError> {
        match index {
            Operand::Literal(i) => {
                if *i as u16 >= slot.len {
                    return Err(CompileError::IndexOutOfBounds {
                        array: array.to_string(),
                        index: *i as u16,
                        len: slot.len,
                    });
                }
            }
            Operand::Variable(_) if slot.len <= 256 => {
                let last = (slot.len - 1) as u8;
                self.emit_load(R0, index)?;
                self.emit_load(R1, &Operand::Literal(last))?;
                self.emit_op(Opcode::Sub);
                self.emit(&[R1, R0]);
                self.emit_jump(Opcode::Jnz, REG_BORROW, JumpTarget::Trap);
            }
            Operand::Variable(_) => {}
        }
        Ok(())
    }

    fn emit_indexed_address(&mut self, slot: ArraySlot, index: &Operand) -> Result<(), CompileError> {
        let [hi, lo] = slot.base.to_be_bytes();
        self.emit_load(REG_BASE_HI, &Operand::Literal(hi))?;
        self.emit_load(REG_BASE_LO, &Operand::Literal(lo))?;
        self.emit_load(REG_INDEX, index)
    }

    // =========================================================================
    // Data allocation
    // =========================================================================

    /// Address of a scalar, allocated on first reference.
    fn var_addr(&mut self, name: &str) -> Result<u16, CompileError> {
        if let Some(addr) = self.vars.get(name) {
            return Ok(*addr);
        }
        let addr = self.alloc_data(name, 1)?;
        log::debug!("var {} at {:#06x}", name, addr);
        self.vars.insert(name.to_string(), addr);
        Ok(addr)
    }

    fn alloc_data(&mut self, name: &str, len: usize) -> Result<u16, CompileError> {
        if self.data_cursor + len > DATA_CAPACITY {
            return Err(CompileError::DataOverflow(name.to_string()));
        }
        let addr = DATA_START + self.data_cursor as u16;
        self.data_cursor += len;
        Ok(addr)
    }

    // =========================================================================
    // Emission
    // =========================================================================

    /// Absolute address of the next emitted byte.
    ///
    /// Truncates past 0xFFFF; such programs fail the capacity check in `compile`.
    fn here(&self) -> u16 {
        (self.layout.origin as usize + self.code.len()) as u16
    }

    fn emit(&mut self, bytes: &[u8]) {
        self.code.extend_from_slice(bytes);
    }

    fn emit_op(&mut self, op: Opcode) {
        self.code.push(op.byte());
    }

    fn emit_addr(&mut self, addr: u16) {
        self.emit(&addr.to_be_bytes());
    }

    /// `LOAD_IMM` for literals, `LOAD` for variables.
    fn emit_load(&mut self, reg: u8, operand: &Operand) -> Result<(), CompileError> {
        match operand {
            Operand::Literal(value) => {
                self.emit_op(Opcode::LoadImm);
                self.emit(&[reg, *value]);
            }
            Operand::Variable(name) => {
                let addr = self.var_addr(name)?;
                self.emit_op(Opcode::Load);
                self.emit(&[reg]);
                self.emit_addr(addr);
            }
        }
        Ok(())
    }

    fn emit_store(&mut self, addr: u16, reg: u8) {
        self.emit_op(Opcode::Store);
        self.emit_addr(addr);
        self.emit(&[reg]);
    }

    fn emit_store_imm(&mut self, addr: u16, value: u8) {
        self.emit_op(Opcode::StoreImm);
        self.emit_addr(addr);
        self.emit(&[value]);
    }

    fn emit_jump(&mut self, op: Opcode, reg: u8, target: JumpTarget) {
        self.emit_op(op);
        self.emit(&[reg]);
        self.patches.push(Patch {
            offset: self.code.len(),
            target,
        });
        self.emit_addr(0);
    }

    /// Fills every recorded hole with its target's absolute address.
    fn resolve_patches(&mut self, trap_addr: u16) -> Result<(), CompileError> {
        for patch in &self.patches {
            let addr = match &patch.target {
                JumpTarget::Label(name) => *self
                    .labels
                    .get(name)
                    .ok_or_else(|| CompileError::UndefinedLabel(name.clone()))?,
                JumpTarget::Trap => trap_addr,
            };
            log::debug!(
                "patch {:#06x} -> {:?} = {:#06x}",
                self.layout.origin as usize + patch.offset,
                patch.target,
                addr
            );
            self.code[patch.offset..patch.offset + 2].copy_from_slice(&addr.to_be_bytes());
        }
        Ok(())
    }
}
